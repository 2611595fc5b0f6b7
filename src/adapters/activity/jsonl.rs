//! JSONL Activity Log - Durable Append-only Audit Trail
//!
//! Persists activity records to `activity.jsonl`, one JSON object per
//! line. `record()` only enqueues: a background writer task owns the
//! file and appends in arrival order.
//!
//! Backpressure policy: the queue is unbounded. Callers never block and
//! records are never dropped; under a sustained burst the queue grows
//! until the writer catches up.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, instrument, warn};

use crate::domain::activity::{Action, ActivityRecord};
use crate::ports::activity::ActivityLog;

const FILE_NAME: &str = "activity.jsonl";

enum Command {
    Append(ActivityRecord),
    /// Acknowledged once every previously queued record is on disk.
    Flush(oneshot::Sender<()>),
}

/// File-backed activity log with an asynchronous writer.
pub struct JsonlActivityLog {
    path: PathBuf,
    tx: mpsc::UnboundedSender<Command>,
}

impl JsonlActivityLog {
    /// Open (or create) `activity.jsonl` in `data_dir` and spawn the writer.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .context("Failed to create activity directory")?;

        let path = dir.join(FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let torn = has_torn_tail(&path)
            .await
            .with_context(|| format!("Failed to inspect {}", path.display()))?;
        if torn {
            warn!(
                path = %path.display(),
                "Activity log ends mid-line, next record starts a new line"
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(file, rx, torn));

        info!(path = %path.display(), "Activity log opened");
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every record queued so far has been written.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .map_err(|_| anyhow::anyhow!("Activity writer has stopped"))?;
        ack_rx.await.context("Activity writer dropped flush request")
    }
}

#[async_trait]
impl ActivityLog for JsonlActivityLog {
    fn record(&self, action: Action, params: Value, result: Value) {
        let record = ActivityRecord::new(action, params, result);
        if let Err(mpsc::error::SendError(Command::Append(record))) =
            self.tx.send(Command::Append(record))
        {
            // Writer is gone; leave the record in the process log so it is
            // recoverable.
            error!(
                record = %serde_json::to_string(&record).unwrap_or_default(),
                "Activity writer stopped, record not persisted"
            );
        }
    }

    #[instrument(skip(self))]
    async fn get_all_records(&self) -> Result<Vec<ActivityRecord>> {
        self.flush().await?;

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read activity log")?;

        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActivityRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        file = %self.path.display(),
                        error = %e,
                        "Skipping malformed activity record"
                    );
                }
            }
        }
        Ok(records)
    }
}

/// `torn` is true while the file may end in an unterminated line.
async fn run_writer(mut file: File, mut rx: mpsc::UnboundedReceiver<Command>, mut torn: bool) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Append(record) => {
                if let Err(e) = append(&mut file, &record, &mut torn).await {
                    error!(
                        error = %e,
                        record = %serde_json::to_string(&record).unwrap_or_default(),
                        "Failed to persist activity record"
                    );
                }
            }
            Command::Flush(ack) => {
                if let Err(e) = file.flush().await {
                    error!(error = %e, "Failed to flush activity log");
                }
                let _ = ack.send(());
            }
        }
    }
    info!("Activity writer stopped");
}

async fn append(file: &mut File, record: &ActivityRecord, torn: &mut bool) -> Result<()> {
    let json = serde_json::to_string(record).context("Failed to serialize activity record")?;
    let mut line = String::with_capacity(json.len() + 2);
    if *torn {
        line.push('\n');
    }
    line.push_str(&json);
    line.push('\n');

    // Cleared only once the whole line is down.
    *torn = true;
    file.write_all(line.as_bytes())
        .await
        .context("Failed to write activity record")?;
    file.flush().await.context("Failed to flush activity log")?;
    *torn = false;
    Ok(())
}

async fn has_torn_tail(path: &Path) -> Result<bool> {
    let mut file = File::open(path).await?;
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("reserve-activity-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_records_persist_in_order() {
        let dir = temp_dir();
        let log = JsonlActivityLog::open(&dir).await.unwrap();

        for i in 0..200 {
            log.record(Action::Trade, json!({ "i": i }), json!({ "error": null }));
        }

        let records = log.get_all_records().await.unwrap();
        assert_eq!(records.len(), 200);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.params["i"], i);
        }

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_history() {
        let dir = temp_dir();
        {
            let log = JsonlActivityLog::open(&dir).await.unwrap();
            log.record(Action::Deposit, json!({}), json!({ "error": "rejected" }));
            log.flush().await.unwrap();
        }

        let log = JsonlActivityLog::open(&dir).await.unwrap();
        log.record(Action::Withdraw, json!({}), json!({ "error": null }));
        let records = log.get_all_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, Action::Deposit);
        assert_eq!(records[0].error(), Some("rejected"));
        assert_eq!(records[1].action, Action::Withdraw);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_unterminated_tail_does_not_swallow_next_record() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).await.unwrap();
        let first = ActivityRecord::new(Action::Trade, json!({ "n": 1 }), json!({ "error": null }));
        let mut content = serde_json::to_string(&first).unwrap();
        content.push('\n');
        content.push_str(r#"{"id":"cut-off","act"#);
        fs::write(dir.join(FILE_NAME), content).await.unwrap();

        let log = JsonlActivityLog::open(&dir).await.unwrap();
        log.record(Action::Withdraw, json!({ "n": 2 }), json!({ "error": null }));
        log.record(Action::Deposit, json!({ "n": 3 }), json!({ "error": null }));

        let records = log.get_all_records().await.unwrap();
        let ns: Vec<_> = records.iter().map(|r| r.params["n"].clone()).collect();
        assert_eq!(ns, vec![json!(1), json!(2), json!(3)]);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_malformed_lines_skipped() {
        let dir = temp_dir();
        let log = JsonlActivityLog::open(&dir).await.unwrap();
        log.record(Action::SetRates, json!({}), json!({ "error": null }));
        log.flush().await.unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).await.unwrap();
        file.write_all(b"not json\n\n").await.unwrap();
        file.flush().await.unwrap();

        let records = log.get_all_records().await.unwrap();
        assert_eq!(records.len(), 1);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
