// Unit tests for business rules

use super::*;
use crate::domain::model::{ClipMode, ClipRequest, TaskId};

#[test]
fn test_single_band_covers_clip_range() {
    let band = ProgressBand::single();
    assert_eq!(band.map(0.0), 30.0);
    assert_eq!(band.map(0.5), 60.0);
    assert_eq!(band.map(1.0), 90.0);
    assert_eq!(band.map(7.0), 90.0);
    assert_eq!(band.map(-1.0), 30.0);
    assert_eq!(band.map(f64::NAN), 30.0);
}

#[test]
fn test_multi_slots_split_band_evenly() {
    let slots: Vec<ProgressBand> = (0..4).map(|i| ProgressBand::multi_slot(i, 4)).collect();
    assert_eq!(slots[0].start, 10.0);
    assert_eq!(slots[0].end, 30.0);
    assert_eq!(slots[3].start, 70.0);
    assert_eq!(slots[3].end, 90.0);

    for pair in slots.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
}

#[test]
fn test_output_names() {
    let id = TaskId::new("multi_1700000000000_abcdefghi");
    assert_eq!(single_output_name("clip", "mp4"), "clip.mp4");
    assert_eq!(part_output_name("clip", 2, "mp3"), "clip_part2.mp3");
    assert_eq!(
        intermediate_name(&id, 1, "mp4"),
        "temp_multi_1700000000000_abcdefghi_part1.mp4"
    );
    assert_eq!(manifest_name(&id), "concat_multi_1700000000000_abcdefghi.txt");
}

#[test]
fn test_intermediate_name_detection() {
    assert!(is_intermediate_name("temp_task_1_x_part1.mp4"));
    assert!(is_intermediate_name("temp_task_1_x_part1.mp3"));
    assert!(!is_intermediate_name("temp_notes.txt"));
    assert!(!is_intermediate_name("clip_part1.mp4"));
}

#[test]
fn test_sanitize_filename() {
    assert_eq!(sanitize_filename("my clip"), "my_clip");
    assert_eq!(sanitize_filename("../../etc/passwd"), "______etc_passwd");
    assert_eq!(sanitize_filename("ok-name_1"), "ok-name_1");
    assert_eq!(sanitize_filename(""), DEFAULT_BASE_FILENAME);
    assert_eq!(sanitize_filename(&"a".repeat(80)).len(), 50);
}

#[test]
fn test_generate_task_id_shape() {
    let single = generate_task_id(ClipMode::Single);
    let multi = generate_task_id(ClipMode::Multi);

    assert!(single.as_str().starts_with("task_"));
    assert!(multi.as_str().starts_with("multi_"));

    let parts: Vec<&str> = single.as_str().split('_').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[1].parse::<i64>().is_ok());
    assert_eq!(parts[2].len(), 9);

    assert_ne!(generate_task_id(ClipMode::Single), generate_task_id(ClipMode::Single));
}

#[test]
fn test_delivered_output_names_follow_mode() {
    use crate::domain::model::{Interval, IntervalPolicy, OutputFormat, Quality};

    let policy = IntervalPolicy::default();
    let interval = |s: &str, e: &str| Interval::parse(s, e, &policy).unwrap();
    let intervals = vec![interval("00:00:00", "00:00:10"), interval("00:01:00", "00:01:10")];

    let single = ClipRequest::single("src", interval("00:00:00", "00:00:10"), OutputFormat::Mp4, Quality::P720, "x");
    assert_eq!(delivered_output_names(&single, "clip_part1"), vec!["clip_part1.mp4"]);

    let split = ClipRequest::multi("src", intervals.clone(), OutputFormat::Mp3, Quality::P720, "x", false);
    assert_eq!(delivered_output_names(&split, "clip"), vec!["clip_part1.mp3", "clip_part2.mp3"]);

    let merged = ClipRequest::multi("src", intervals, OutputFormat::Mp4, Quality::P720, "x", true);
    assert_eq!(delivered_output_names(&merged, "clip"), vec!["clip.mp4"]);
}
