//! Task registry and progress bus
//!
//! Holds the last known state of every live task and forwards progress
//! events to at most one observer per task. Each task is a separate map
//! entry, so tasks never contend with each other beyond their own key.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::model::{ClipMode, ProgressEvent, TaskId, TaskState};
use crate::error::RegistryError;

pub mod reservations;

pub use reservations::{OutputReservations, Reservation};

struct Observer {
    generation: u64,
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

struct TaskRecord {
    mode: ClipMode,
    last_event: ProgressEvent,
    outputs: Vec<String>,
    observer: Option<Observer>,
    finished_at: Option<Instant>,
}

/// Point-in-time view of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub mode: ClipMode,
    pub last_event: ProgressEvent,
    /// Produced files; filled in once the task completes
    pub outputs: Vec<String>,
}

impl TaskSnapshot {
    pub fn state(&self) -> TaskState {
        self.last_event.state
    }

    pub fn percent(&self) -> u8 {
        self.last_event.percent
    }
}

/// Registry of live tasks and their observers
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, TaskRecord>,
    generations: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a task in the `starting` state
    pub fn register(&self, task_id: &TaskId, mode: ClipMode) -> Result<(), RegistryError> {
        match self.tasks.entry(task_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::DuplicateTask(task_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(TaskRecord {
                    mode,
                    last_event: ProgressEvent::new(task_id.clone(), TaskState::Starting, 0, "Queued"),
                    outputs: Vec::new(),
                    observer: None,
                    finished_at: None,
                });
                debug!(task_id = %task_id, ?mode, "Task registered");
                Ok(())
            }
        }
    }

    /// Attach the observer of a task, severing any previous one.
    ///
    /// The new stream starts with the last known event. For a task that has
    /// already finished it yields that terminal event and ends.
    pub fn subscribe(&self, task_id: &TaskId) -> Result<Subscription, RegistryError> {
        let mut record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| RegistryError::UnknownTask(task_id.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        // The receiver is alive, so this cannot fail
        let _ = sender.send(record.last_event.clone());

        if record.last_event.is_terminal() {
            record.observer = None;
        } else {
            if record.observer.is_some() {
                debug!(task_id = %task_id, "Replacing existing observer");
            }
            record.observer = Some(Observer { generation, sender });
        }

        Ok(Subscription {
            task_id: task_id.clone(),
            generation,
            receiver,
        })
    }

    /// Record an event and forward it to the observer, if any.
    ///
    /// Percentages never go backwards: a lower value is raised to the last
    /// one published. Nothing is accepted after a terminal event.
    pub fn publish(&self, mut event: ProgressEvent) -> Result<(), RegistryError> {
        let mut record = self
            .tasks
            .get_mut(&event.task_id)
            .ok_or_else(|| RegistryError::UnknownTask(event.task_id.to_string()))?;

        if record.last_event.is_terminal() {
            return Err(RegistryError::PublishAfterTerminal(event.task_id.to_string()));
        }

        event.percent = event.percent.max(record.last_event.percent).min(100);

        info!(
            task_id = %event.task_id,
            state = %event.state,
            percent = event.percent,
            "[task {}] {}",
            event.task_id,
            event.message
        );

        if event.state == TaskState::Complete {
            record.outputs = if event.files.is_empty() {
                event.filename.iter().cloned().collect()
            } else {
                event.files.clone()
            };
        }

        let delivered = record
            .observer
            .as_ref()
            .map(|observer| observer.sender.send(event.clone()).is_ok());
        if delivered == Some(false) {
            // Observer went away; the task carries on regardless
            debug!(task_id = %event.task_id, "Observer disconnected");
            record.observer = None;
        }

        if event.is_terminal() {
            record.finished_at = Some(Instant::now());
            record.observer = None;
        }
        record.last_event = event;
        Ok(())
    }

    /// Detach an observer. A finished task is forgotten right away.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let task_id = subscription.task_id;
        let removed = self
            .tasks
            .remove_if(&task_id, |_, record| record.last_event.is_terminal());
        if removed.is_some() {
            debug!(task_id = %task_id, "Finished task evicted on unsubscribe");
            return;
        }

        if let Some(mut record) = self.tasks.get_mut(&task_id) {
            let current = record
                .observer
                .as_ref()
                .is_some_and(|observer| observer.generation == subscription.generation);
            if current {
                record.observer = None;
            }
        }
    }

    pub fn snapshot(&self, task_id: &TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(task_id).map(|record| TaskSnapshot {
            mode: record.mode,
            last_event: record.last_event.clone(),
            outputs: record.outputs.clone(),
        })
    }

    /// Forget tasks that finished more than `retention` ago
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, record| {
            record
                .finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        let evicted = before.saturating_sub(self.tasks.len());
        if evicted > 0 {
            debug!(evicted, "Evicted finished tasks");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Live, finite sequence of events for one task.
///
/// Ends after the terminal event, or when another subscription replaces it.
#[derive(Debug)]
pub struct Subscription {
    task_id: TaskId,
    generation: u64,
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Subscription {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TaskOutcome;
    use futures::StreamExt;

    fn id() -> TaskId {
        TaskId::new("task_1_abcdefghi")
    }

    fn event(state: TaskState, percent: u8) -> ProgressEvent {
        ProgressEvent::new(id(), state, percent, format!("{} {}", state, percent))
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber_in_order() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        let mut subscription = registry.subscribe(&id()).unwrap();

        registry.publish(event(TaskState::Downloading, 5)).unwrap();
        registry.publish(event(TaskState::Trimming, 30)).unwrap();
        registry.publish(ProgressEvent::error(id(), "Error: boom")).unwrap();

        let events: Vec<ProgressEvent> = subscription.by_ref().collect().await;
        let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![0, 5, 30, 30]);
        assert_eq!(events.last().unwrap().state, TaskState::Error);
    }

    #[tokio::test]
    async fn test_publish_after_terminal_is_rejected() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        let outcome = TaskOutcome {
            primary: "a.mp4".to_string(),
            files: vec!["a.mp4".to_string()],
        };
        registry.publish(ProgressEvent::complete(id(), &outcome, "Done")).unwrap();

        assert_eq!(
            registry.publish(event(TaskState::Trimming, 50)),
            Err(RegistryError::PublishAfterTerminal(id().to_string()))
        );
        assert_eq!(registry.snapshot(&id()).unwrap().outputs, vec!["a.mp4"]);
    }

    #[test]
    fn test_unknown_and_duplicate_tasks() {
        let registry = TaskRegistry::new();
        assert!(matches!(registry.subscribe(&id()), Err(RegistryError::UnknownTask(_))));
        assert!(registry.publish(event(TaskState::Trimming, 1)).is_err());

        registry.register(&id(), ClipMode::Multi).unwrap();
        assert_eq!(
            registry.register(&id(), ClipMode::Multi),
            Err(RegistryError::DuplicateTask(id().to_string()))
        );
    }

    #[tokio::test]
    async fn test_new_subscription_severs_previous() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        let mut first = registry.subscribe(&id()).unwrap();
        let mut second = registry.subscribe(&id()).unwrap();

        registry.publish(event(TaskState::Downloading, 5)).unwrap();

        assert_eq!(first.next_event().await.unwrap().percent, 0);
        assert!(first.next_event().await.is_none());

        assert_eq!(second.next_event().await.unwrap().state, TaskState::Starting);
        assert_eq!(second.next_event().await.unwrap().percent, 5);

        // Dropping the stale handle must not detach the live observer
        registry.unsubscribe(first);
        registry.publish(event(TaskState::Trimming, 30)).unwrap();
        assert_eq!(second.next_event().await.unwrap().percent, 30);
    }

    #[test]
    fn test_disconnected_observer_does_not_fail_publish() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        drop(registry.subscribe(&id()).unwrap());

        assert!(registry.publish(event(TaskState::Downloading, 5)).is_ok());
        assert_eq!(registry.snapshot(&id()).unwrap().percent(), 5);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_snapshot_then_end() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        registry.publish(ProgressEvent::error(id(), "Error: late")).unwrap();

        let events: Vec<ProgressEvent> = registry.subscribe(&id()).unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Error: late");
    }

    #[test]
    fn test_unsubscribe_evicts_finished_task() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        let subscription = registry.subscribe(&id()).unwrap();

        registry.unsubscribe(subscription);
        assert_eq!(registry.len(), 1);

        let subscription = registry.subscribe(&id()).unwrap();
        registry.publish(ProgressEvent::error(id(), "Error: x")).unwrap();
        registry.unsubscribe(subscription);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_finished_respects_retention() {
        let registry = TaskRegistry::new();
        registry.register(&id(), ClipMode::Single).unwrap();
        registry.register(&TaskId::new("task_2_running"), ClipMode::Single).unwrap();
        registry.publish(ProgressEvent::error(id(), "Error: x")).unwrap();

        assert_eq!(registry.evict_finished(Duration::from_secs(60)), 0);
        assert_eq!(registry.evict_finished(Duration::ZERO), 1);
        assert!(registry.snapshot(&id()).is_none());
        assert_eq!(registry.len(), 1);
    }
}
