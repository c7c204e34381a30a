//! Output name reservations for tasks in flight

use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

use crate::domain::model::TaskId;

/// File names currently claimed by running tasks
#[derive(Debug, Clone, Default)]
pub struct OutputReservations {
    claimed: Arc<DashSet<String>>,
}

impl OutputReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every file name `names_for(base)` yields. When another running
    /// task holds any of them, the task suffix is appended to `base` and the
    /// derived names are claimed instead, so two tasks never share a path.
    pub fn reserve<F>(&self, base: &str, task_id: &TaskId, names_for: F) -> Reservation
    where
        F: Fn(&str) -> Vec<String>,
    {
        let mut candidate = base.to_string();
        let mut attempt = 0usize;
        loop {
            let names = names_for(&candidate);
            if self.claim_all(&names) {
                if candidate != base {
                    debug!(task_id = %task_id, "Output name '{}' in use, using '{}'", base, candidate);
                }
                return Reservation {
                    base: candidate,
                    names,
                    claimed: Arc::clone(&self.claimed),
                };
            }

            attempt += 1;
            candidate = match attempt {
                1 => format!("{}_{}", base, task_id.suffix()),
                n => format!("{}_{}_{}", base, task_id.suffix(), n),
            };
        }
    }

    /// All or nothing: a partial claim is rolled back
    fn claim_all(&self, names: &[String]) -> bool {
        for (index, name) in names.iter().enumerate() {
            if !self.claimed.insert(name.clone()) {
                for taken in &names[..index] {
                    self.claimed.remove(taken);
                }
                return false;
            }
        }
        true
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }
}

/// Claimed base name and the output names derived from it; released on drop
#[derive(Debug)]
pub struct Reservation {
    base: String,
    names: Vec<String>,
    claimed: Arc<DashSet<String>>,
}

impl Reservation {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        for name in &self.names {
            self.claimed.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::{part_output_name, single_output_name};

    fn single(extension: &'static str) -> impl Fn(&str) -> Vec<String> {
        move |base: &str| vec![single_output_name(base, extension)]
    }

    fn parts(count: usize) -> impl Fn(&str) -> Vec<String> {
        move |base: &str| (1..=count).map(|k| part_output_name(base, k, "mp4")).collect()
    }

    #[test]
    fn test_concurrent_tasks_get_distinct_names() {
        let reservations = OutputReservations::new();
        let first = reservations.reserve("clip", &TaskId::new("task_1_aaaaaaaaa"), single("mp4"));
        let second = reservations.reserve("clip", &TaskId::new("task_2_bbbbbbbbb"), single("mp4"));
        let audio = reservations.reserve("clip", &TaskId::new("task_3_ccccccccc"), single("mp3"));

        assert_eq!(first.base(), "clip");
        assert_eq!(second.base(), "clip_bbbbbbbbb");
        assert_eq!(second.names(), ["clip_bbbbbbbbb.mp4"]);
        assert_eq!(audio.base(), "clip");
    }

    #[test]
    fn test_part_names_collide_with_single_output() {
        let reservations = OutputReservations::new();
        let single_task = reservations.reserve("clip_part1", &TaskId::new("task_1_aaaaaaaaa"), single("mp4"));
        let multi_task = reservations.reserve("clip", &TaskId::new("multi_2_bbbbbbbbb"), parts(2));

        assert_eq!(single_task.names(), ["clip_part1.mp4"]);
        assert_eq!(multi_task.base(), "clip_bbbbbbbbb");
        assert_eq!(
            multi_task.names(),
            ["clip_bbbbbbbbb_part1.mp4", "clip_bbbbbbbbb_part2.mp4"]
        );
        // The rejected claim on clip_part2.mp4 was rolled back
        assert!(!reservations.is_reserved("clip_part2.mp4"));
    }

    #[test]
    fn test_reservation_released_on_drop() {
        let reservations = OutputReservations::new();
        let held = reservations.reserve("clip", &TaskId::new("multi_1_aaaaaaaaa"), parts(3));
        assert!(reservations.is_reserved("clip_part3.mp4"));
        drop(held);
        assert!(!reservations.is_reserved("clip_part1.mp4"));
        assert!(!reservations.is_reserved("clip_part3.mp4"));
        assert_eq!(
            reservations
                .reserve("clip", &TaskId::new("task_2_bbbbbbbbb"), single("mp4"))
                .base(),
            "clip"
        );
    }
}
