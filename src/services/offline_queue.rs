// File-backed FIFO of workout saves waiting to reach the server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::models::WorkoutSavePayload;

/// File name of the queue inside its directory
pub const QUEUE_FILE_NAME: &str = "offline-workout-queue.v1.json";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to access queue file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize queue: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to persist queue file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedWorkoutSave {
    pub id: Uuid,
    pub payload: WorkoutSavePayload,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Still queued; `attempts` failures so far
    Retry { attempts: u32 },
    /// Removed after reaching the attempt limit
    Dropped,
    /// The item was no longer in the queue
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub sent: usize,
    pub failed: usize,
    pub dropped: usize,
    pub remaining: usize,
}

#[derive(Clone)]
pub struct OfflineQueue {
    path: PathBuf,
    max_attempts: u32,
    // Serializes read-modify-write cycles on the file within this process
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("path", &self.path)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl OfflineQueue {
    /// Open (creating the directory if needed) the queue stored in `dir`
    pub fn open(dir: impl AsRef<Path>, max_attempts: u32) -> Result<Self, QueueError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| QueueError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(QUEUE_FILE_NAME);
        tracing::debug!("Using offline queue at {:?}", path);

        Ok(Self {
            path,
            max_attempts: max_attempts.max(1),
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Append a save to the tail of the queue
    pub fn enqueue(&self, payload: WorkoutSavePayload) -> Result<QueuedWorkoutSave, QueueError> {
        let item = QueuedWorkoutSave {
            id: Uuid::new_v4(),
            payload,
            attempts: 0,
            enqueued_at: Utc::now(),
            last_error: None,
        };

        self.update(|items| items.push(item.clone()))?;
        tracing::debug!(item_id = %item.id, session_id = %item.payload.session_id, "Queued workout save");

        Ok(item)
    }

    /// Pop the head of the queue
    pub fn dequeue(&self) -> Result<Option<QueuedWorkoutSave>, QueueError> {
        self.update(|items| (!items.is_empty()).then(|| items.remove(0)))
    }

    pub fn peek(&self) -> Result<Option<QueuedWorkoutSave>, QueueError> {
        Ok(self.items()?.into_iter().next())
    }

    /// Snapshot of all queued items in FIFO order
    pub fn items(&self) -> Result<Vec<QueuedWorkoutSave>, QueueError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load()
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        Ok(self.items()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }

    pub fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        self.update(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        })
    }

    pub fn clear(&self) -> Result<usize, QueueError> {
        self.update(|items| {
            let count = items.len();
            items.clear();
            count
        })
    }

    /// Count a failed delivery. The item is dropped once it has failed
    /// `max_attempts` times.
    pub fn record_failure(&self, id: Uuid, error: &str) -> Result<AttemptOutcome, QueueError> {
        let max_attempts = self.max_attempts;

        self.update(|items| {
            let Some(index) = items.iter().position(|item| item.id == id) else {
                return AttemptOutcome::Missing;
            };

            let item = &mut items[index];
            item.attempts += 1;
            item.last_error = Some(error.to_string());

            if item.attempts >= max_attempts {
                let dropped = items.remove(index);
                tracing::warn!(
                    item_id = %dropped.id,
                    session_id = %dropped.payload.session_id,
                    attempts = dropped.attempts,
                    error,
                    "Dropping workout save after too many attempts"
                );
                AttemptOutcome::Dropped
            } else {
                AttemptOutcome::Retry {
                    attempts: item.attempts,
                }
            }
        })
    }

    /// Replay queued saves from the head through `send`.
    ///
    /// A success removes the item. A failure is counted against the item and
    /// ends the flush so later saves never overtake earlier ones; an item that
    /// hits the attempt limit is dropped and the flush moves on. At most the
    /// number of items present at the start are attempted.
    pub async fn flush<F, Fut>(&self, mut send: F) -> Result<FlushSummary, QueueError>
    where
        F: FnMut(WorkoutSavePayload) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let mut summary = FlushSummary::default();
        let budget = self.len()?;

        for _ in 0..budget {
            let Some(head) = self.peek()? else {
                break;
            };

            match send(head.payload.clone()).await {
                Ok(()) => {
                    self.remove(head.id)?;
                    summary.sent += 1;
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    match self.record_failure(head.id, &message)? {
                        AttemptOutcome::Dropped => summary.dropped += 1,
                        AttemptOutcome::Retry { attempts } => {
                            tracing::info!(
                                item_id = %head.id,
                                attempts,
                                error = %message,
                                "Workout save failed, will retry on next flush"
                            );
                            summary.failed += 1;
                            break;
                        }
                        AttemptOutcome::Missing => {}
                    }
                }
            }
        }

        summary.remaining = self.len()?;
        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            dropped = summary.dropped,
            remaining = summary.remaining,
            "Offline queue flush finished"
        );

        Ok(summary)
    }

    fn update<T>(&self, f: impl FnOnce(&mut Vec<QueuedWorkoutSave>) -> T) -> Result<T, QueueError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.load()?;
        let result = f(&mut items);
        self.store(&items)?;
        Ok(result)
    }

    /// Read the queue. A missing file or corrupt JSON is an empty queue; any
    /// other read failure is an error so callers never write over saves they
    /// could not see.
    fn load(&self) -> Result<Vec<QueuedWorkoutSave>, QueueError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                tracing::error!(path = ?self.path, error = %source, "Failed to read offline queue");
                return Err(QueueError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str(&contents) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Offline queue is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Write the queue atomically (temp file in the same directory, then rename)
    fn store(&self, items: &[QueuedWorkoutSave]) -> Result<(), QueueError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| QueueError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        serde_json::to_writer_pretty(&mut file, items)?;
        file.flush().map_err(io_err)?;
        file.persist(&self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseEntry, SetEntry, WeightUnit};
    use tempfile::tempdir;

    fn payload(name: &str) -> WorkoutSavePayload {
        WorkoutSavePayload {
            session_id: Uuid::new_v4(),
            template_id: None,
            workout_date: Utc::now(),
            exercises: vec![ExerciseEntry {
                exercise_name: name.to_string(),
                sets: vec![SetEntry {
                    weight: Some(60.0),
                    reps: Some(8),
                    unit: WeightUnit::Kg,
                }],
            }],
        }
    }

    #[test]
    fn test_fifo_order() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let queue = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;

        let a = queue.enqueue(payload("A"))?;
        let b = queue.enqueue(payload("B"))?;

        assert_eq!(queue.dequeue()?.map(|i| i.id), Some(a.id));
        assert_eq!(queue.dequeue()?.map(|i| i.id), Some(b.id));
        assert_eq!(queue.dequeue()?, None);

        Ok(())
    }

    #[test]
    fn test_persists_across_instances() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let first = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;
        let queued = first.enqueue(payload("Squat"))?;

        let second = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;
        assert_eq!(second.items()?, vec![queued]);

        Ok(())
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join(QUEUE_FILE_NAME), "{ not json")?;

        let queue = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;
        assert!(queue.is_empty()?);

        // Writing replaces the corrupt contents
        queue.enqueue(payload("Row"))?;
        assert_eq!(queue.len()?, 1);

        Ok(())
    }

    #[test]
    fn test_record_failure_drops_at_limit() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let queue = OfflineQueue::open(dir.path(), 3)?;
        let item = queue.enqueue(payload("Press"))?;

        assert_eq!(
            queue.record_failure(item.id, "offline")?,
            AttemptOutcome::Retry { attempts: 1 }
        );
        assert_eq!(
            queue.record_failure(item.id, "offline")?,
            AttemptOutcome::Retry { attempts: 2 }
        );
        assert_eq!(queue.peek()?.and_then(|i| i.last_error), Some("offline".to_string()));
        assert_eq!(queue.record_failure(item.id, "offline")?, AttemptOutcome::Dropped);
        assert!(queue.is_empty()?);
        assert_eq!(queue.record_failure(item.id, "offline")?, AttemptOutcome::Missing);

        Ok(())
    }

    #[test]
    fn test_clear_and_remove() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let queue = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;
        let a = queue.enqueue(payload("A"))?;
        queue.enqueue(payload("B"))?;

        assert!(queue.remove(a.id)?);
        assert!(!queue.remove(a.id)?);
        assert_eq!(queue.clear()?, 1);
        assert!(queue.is_empty()?);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_not_overwritten() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(QUEUE_FILE_NAME);
        // A self-referencing symlink fails every read with ELOOP
        std::os::unix::fs::symlink(&path, &path)?;

        let queue = OfflineQueue::open(dir.path(), DEFAULT_MAX_ATTEMPTS)?;

        assert!(matches!(queue.enqueue(payload("A")), Err(QueueError::Io { .. })));
        assert!(matches!(queue.items(), Err(QueueError::Io { .. })));
        assert!(queue.clear().is_err());

        // Nothing was written in place of the file
        assert!(fs::symlink_metadata(&path)?.file_type().is_symlink());

        Ok(())
    }
}
