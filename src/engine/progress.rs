//! Progress extraction from transcoder diagnostics
//!
//! The transcoder reports how much output it has produced as a `time=`
//! marker on its status line, for example
//! `frame=  240 fps=0.0 q=-1.0 size=  1024kB time=00:00:08.00 bitrate=...`.
//! Grammar: `time=` followed by `H+:MM:SS[.frac]`; `time=N/A` carries no sample.

use crate::domain::rules::ProgressBand;
use crate::utils::time::parse_clock_seconds;

/// Extracts elapsed output time, in seconds, from one diagnostic line
pub trait ProgressSampler: Send + Sync {
    fn sample(&self, line: &str) -> Option<f64>;
}

/// Sampler for the `time=HH:MM:SS.ff` marker
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeMarkerSampler;

impl ProgressSampler for TimeMarkerSampler {
    fn sample(&self, line: &str) -> Option<f64> {
        parse_elapsed_marker(line)
    }
}

/// Last `time=` marker on the line, in seconds
pub fn parse_elapsed_marker(line: &str) -> Option<f64> {
    let (_, rest) = line.rsplit_once("time=")?;
    let token = rest.split_whitespace().next()?;
    parse_clock_seconds(token)
}

/// Maps elapsed samples onto a progress band and drops updates that do not
/// advance far enough to be worth publishing
#[derive(Debug, Clone)]
pub struct ProgressCoalescer {
    band: ProgressBand,
    duration_secs: f64,
    threshold: f64,
    last: f64,
}

impl ProgressCoalescer {
    pub fn new(band: ProgressBand, duration_secs: f64, threshold: f64) -> Self {
        Self {
            band,
            duration_secs,
            threshold,
            last: band.start,
        }
    }

    /// Percentage to publish for this sample, if it moved past the threshold
    pub fn offer(&mut self, elapsed_secs: f64) -> Option<u8> {
        if self.duration_secs <= 0.0 {
            return None;
        }

        let mapped = self.band.map(elapsed_secs / self.duration_secs);
        if mapped > self.last + self.threshold {
            self.last = mapped;
            Some(mapped.floor() as u8)
        } else {
            None
        }
    }
}
