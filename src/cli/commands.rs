//! Command implementations

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::app::SubmitInteractor;
use crate::cli::args::{MultiArgs, OutputArgs, TrimArgs};
use crate::domain::errors::DomainError;
use crate::domain::model::{ClipRequest, Interval, IntervalPolicy, OutputFormat, Quality, TaskState};

/// Split `START-END` into its two times
pub fn parse_interval_arg(text: &str, policy: &IntervalPolicy) -> Result<Interval, DomainError> {
    let (start, end) = text.split_once('-').ok_or_else(|| {
        DomainError::BadArgs(format!("interval '{}' must look like START-END", text))
    })?;
    Interval::parse(start.trim(), end.trim(), policy)
}

fn parse_output(args: &OutputArgs) -> Result<(OutputFormat, Quality), DomainError> {
    Ok((OutputFormat::parse(&args.format)?, Quality::parse(&args.quality)?))
}

/// Build a single-interval request from the trim command
pub fn build_trim_request(args: &TrimArgs, policy: &IntervalPolicy) -> Result<ClipRequest, DomainError> {
    let interval = Interval::parse(&args.start, &args.end, policy)?;
    let (format, quality) = parse_output(&args.output)?;
    Ok(ClipRequest::single(
        args.url.clone(),
        interval,
        format,
        quality,
        args.output.name.clone(),
    ))
}

/// Build a multi-interval request from the multi command
pub fn build_multi_request(args: &MultiArgs, policy: &IntervalPolicy) -> Result<ClipRequest, DomainError> {
    let intervals = args
        .intervals
        .iter()
        .map(|text| parse_interval_arg(text, policy))
        .collect::<Result<Vec<_>, _>>()?;
    let (format, quality) = parse_output(&args.output)?;
    Ok(ClipRequest::multi(
        args.url.clone(),
        intervals,
        format,
        quality,
        args.output.name.clone(),
        args.concat,
    ))
}

/// Submit a request and print its events as JSON lines until the terminal one.
///
/// Returns whether the task completed.
pub async fn run_request(submit: &SubmitInteractor, request: ClipRequest) -> Result<bool> {
    let task_id = submit.submit(request).context("Request rejected")?;
    info!("Submitted task {}", task_id);

    let mut subscription = submit.subscribe(&task_id)?;
    let mut stdout = std::io::stdout();
    let mut completed = false;

    while let Some(event) = subscription.next_event().await {
        let line = serde_json::to_string(&event)?;
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        if event.is_terminal() {
            completed = event.state == TaskState::Complete;
        }
    }

    submit.unsubscribe(subscription);
    Ok(completed)
}

/// Print engine availability as JSON; true when both engines answer
pub async fn doctor(submit: &SubmitInteractor) -> Result<bool> {
    let statuses = submit.check_engines().await;
    let mut stdout = std::io::stdout();
    for status in &statuses {
        writeln!(stdout, "{}", serde_json::to_string(status)?)?;
    }
    Ok(statuses.iter().all(|status| status.available()))
}

/// Print preview metadata of a source as one JSON object
pub async fn info(submit: &SubmitInteractor, url: &str) -> Result<bool> {
    let info = submit.video_info(url).await;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", serde_json::to_string(&info)?)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_arg() {
        let policy = IntervalPolicy::default();
        let interval = parse_interval_arg("00:01:00-00:02:30", &policy).unwrap();
        assert_eq!(interval.duration().to_seconds(), 90);

        assert!(matches!(
            parse_interval_arg("00:01:00", &policy),
            Err(DomainError::BadArgs(_))
        ));
        assert!(matches!(
            parse_interval_arg("00:02:00-00:01:00", &policy),
            Err(DomainError::InvalidTimeRange(_))
        ));
    }
}
