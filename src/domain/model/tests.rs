// Unit tests for domain models

use super::*;
use crate::domain::errors::DomainError;

fn policy() -> IntervalPolicy {
    IntervalPolicy {
        max_duration_secs: 600,
    }
}

#[test]
fn test_time_spec_parse_hh_mm_ss() {
    let time = TimeSpec::parse("01:02:03").unwrap();
    assert_eq!(time.to_seconds(), 3723);
    assert_eq!(time.as_millis(), 3_723_000);

    let time = TimeSpec::parse("1:02:03").unwrap();
    assert_eq!(time.to_seconds(), 3723);
}

#[test]
fn test_time_spec_parse_mm_ss() {
    assert_eq!(TimeSpec::parse("01:30").unwrap().to_seconds(), 90);
    assert_eq!(TimeSpec::parse("1:30").unwrap().to_seconds(), 90);
    assert_eq!(TimeSpec::parse("90:00").unwrap().to_seconds(), 5400);
}

#[test]
fn test_time_spec_parse_fraction() {
    assert_eq!(TimeSpec::parse("00:01:30.5").unwrap().as_millis(), 90_500);
    assert_eq!(TimeSpec::parse("01:30.250").unwrap().as_millis(), 90_250);
    // Precision beyond milliseconds is dropped
    assert_eq!(TimeSpec::parse("00:00:01.123456").unwrap().as_millis(), 1_123);
    assert_eq!(TimeSpec::parse("00:00:01.123456").unwrap().to_seconds(), 1);
}

#[test]
fn test_time_spec_parse_invalid() {
    for text in [
        "",
        "invalid",
        "90",
        "1:2:3",
        "00:60:00",
        "00:00:60",
        "00:61",
        "123:00:00",
        "00:01:30.",
        "00:01:30.x",
        "-1:00",
        "00:00:00:00",
        "00:01:30.12345678901234",
        " 00:01:30",
    ] {
        assert!(
            matches!(TimeSpec::parse(text), Err(DomainError::InvalidFormat(_))),
            "'{}' should be rejected",
            text
        );
    }
}

#[test]
fn test_time_spec_formatting() {
    let time = TimeSpec::from_millis(3_723_456);
    assert_eq!(time.format_hms(), "01:02:03.456");
    assert_eq!(format!("{}", time), "01:02:03.456");
    assert_eq!(TimeSpec::from_seconds(90).format_seconds(), "90.000");
    assert_eq!(TimeSpec::from_millis(1_005).format_seconds(), "1.005");
}

#[test]
fn test_interval_duration_is_exact_difference() {
    let interval = Interval::parse("00:01:00", "00:02:30", &policy()).unwrap();
    assert_eq!(interval.duration().to_seconds(), 90);
    assert_eq!(
        interval.end().to_seconds() - interval.start().to_seconds(),
        interval.duration().to_seconds()
    );
    assert_eq!(interval.duration().format_seconds(), "90.000");

    let interval = Interval::parse("00:00:10.250", "00:00:20.750", &policy()).unwrap();
    assert_eq!(interval.duration().as_millis(), 10_500);
}

#[test]
fn test_interval_rejects_empty_or_reversed_range() {
    assert!(matches!(
        Interval::parse("00:02:00", "00:02:00", &policy()),
        Err(DomainError::InvalidTimeRange(_))
    ));
    assert!(matches!(
        Interval::parse("00:02:00", "00:01:00", &policy()),
        Err(DomainError::InvalidTimeRange(_))
    ));
}

#[test]
fn test_interval_respects_duration_policy() {
    let tight = IntervalPolicy {
        max_duration_secs: 60,
    };
    assert!(Interval::parse("00:00:00", "00:01:00", &tight).is_ok());
    assert_eq!(
        Interval::parse("00:00:00", "00:01:00.5", &tight),
        Err(DomainError::DurationExceeded {
            seconds: 61,
            max_seconds: 60
        })
    );
}

#[test]
fn test_interval_new_from_times() {
    let interval = Interval::new(TimeSpec::from_seconds(5), TimeSpec::from_seconds(15), &policy()).unwrap();
    assert_eq!(interval.label(), "00:00:05.000 → 00:00:15.000");
}

#[test]
fn test_output_format_parsing() {
    assert_eq!(OutputFormat::parse("mp4").unwrap(), OutputFormat::Mp4);
    assert_eq!(OutputFormat::parse("MP3").unwrap(), OutputFormat::Mp3);
    assert!(OutputFormat::parse("mkv").is_err());
    assert_eq!(OutputFormat::Mp3.extension(), "mp3");
    assert!(OutputFormat::Mp3.is_audio_only());
    assert!(!OutputFormat::Mp4.is_audio_only());
}

#[test]
fn test_quality_parsing() {
    assert_eq!(Quality::parse("720").unwrap(), Quality::P720);
    assert_eq!(Quality::parse("1080p").unwrap(), Quality::P1080);
    assert_eq!(Quality::parse("360").unwrap().height(), 360);
    assert!(Quality::parse("480").is_err());
    assert_eq!(Quality::default(), Quality::P720);
}

#[test]
fn test_task_state_terminality() {
    assert!(TaskState::Complete.is_terminal());
    assert!(TaskState::Error.is_terminal());
    assert!(!TaskState::Starting.is_terminal());
    assert!(!TaskState::Cleaning.is_terminal());
}

#[test]
fn test_task_id_suffix() {
    let id = TaskId::new("task_1700000000000_ab12cd34e");
    assert_eq!(id.suffix(), "ab12cd34e");
    assert_eq!(id.to_string(), "task_1700000000000_ab12cd34e");
}

#[test]
fn test_progress_event_serialization() {
    let event = ProgressEvent::new(TaskId::new("task_1_x"), TaskState::Trimming, 42, "Trimming video...");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["taskId"], "task_1_x");
    assert_eq!(json["state"], "trimming");
    assert_eq!(json["percent"], 42);
    assert!(json.get("filename").is_none());
    assert!(json.get("files").is_none());

    let outcome = TaskOutcome {
        primary: "clip_part1.mp4".to_string(),
        files: vec!["clip_part1.mp4".to_string(), "clip_part2.mp4".to_string()],
    };
    let event = ProgressEvent::complete(TaskId::new("multi_1_x"), &outcome, "Done");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["state"], "complete");
    assert_eq!(json["percent"], 100);
    assert_eq!(json["filename"], "clip_part1.mp4");
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_progress_event_percent_is_capped() {
    let event = ProgressEvent::new(TaskId::new("t"), TaskState::Trimming, 250, "");
    assert_eq!(event.percent, 100);
}
