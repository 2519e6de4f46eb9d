//! Outgoing messages and the transport seam.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message has no recipients")]
    NoRecipients,
    #[error("attachment not found: {0}")]
    MissingAttachment(PathBuf),
}

/// A message ready to hand to a [`Mailer`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Mail transport.
pub trait Mailer {
    fn send(&self, message: &OutgoingMessage) -> impl Future<Output = Result<(), MailError>> + Send;
}

#[derive(Serialize)]
struct Envelope<'a> {
    queued_at: String,
    #[serde(flatten)]
    message: &'a OutgoingMessage,
}

/// Writes each message as a JSON envelope into an outbox directory, for a
/// separate transport process to pick up.
#[derive(Debug)]
pub struct OutboxMailer {
    dir: PathBuf,
    sequence: AtomicUsize,
}

impl OutboxMailer {
    /// Create the mailer, creating the outbox directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, MailError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            sequence: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.dir.join(format!("message_{}_{:04}.json", stamp, seq))
    }

    /// Write `contents` under a fresh file name. Names already taken, for
    /// example by another mailer sharing the directory, are skipped.
    async fn write_new(&self, contents: &[u8]) -> Result<PathBuf, MailError> {
        loop {
            let path = self.next_path();
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match file {
                Ok(mut file) => {
                    file.write_all(contents).await?;
                    file.flush().await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Mailer for OutboxMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        for attachment in &message.attachments {
            if !tokio::fs::try_exists(attachment).await? {
                return Err(MailError::MissingAttachment(attachment.clone()));
            }
        }

        let envelope = Envelope {
            queued_at: Utc::now().to_rfc3339(),
            message,
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        let path = self.write_new(json.as_bytes()).await?;

        info!(
            to = %message.to.join(", "),
            attachments = message.attachments.len(),
            path = %path.display(),
            "message queued in outbox"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &[&str], attachments: Vec<PathBuf>) -> OutgoingMessage {
        OutgoingMessage {
            to: to.iter().map(|s| s.to_string()).collect(),
            cc: vec!["cc@example.com".to_string()],
            subject: "Open invoices".to_string(),
            body: "See attached.".to_string(),
            attachments,
        }
    }

    #[tokio::test]
    async fn test_outbox_writes_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let attachment = tmp.path().join("doc.pdf");
        std::fs::write(&attachment, b"%PDF").unwrap();

        let mailer = OutboxMailer::new(tmp.path().join("outbox")).unwrap();
        mailer
            .send(&message(&["a@example.com"], vec![attachment.clone()]))
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(mailer.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files.into_iter().next().unwrap().unwrap().path();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["cc"][0], "cc@example.com");
        assert_eq!(json["subject"], "Open invoices");
        assert_eq!(json["attachments"][0], attachment.to_string_lossy().as_ref());
        assert!(json["queued_at"].is_string());
    }

    #[tokio::test]
    async fn test_outbox_sequence_keeps_files_apart() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(tmp.path()).unwrap();
        for _ in 0..3 {
            mailer.send(&message(&["a@example.com"], vec![])).await.unwrap();
        }
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_two_mailers_share_outbox_without_overwriting() {
        let tmp = tempfile::tempdir().unwrap();
        let first = OutboxMailer::new(tmp.path()).unwrap();
        let second = OutboxMailer::new(tmp.path()).unwrap();

        first.send(&message(&["a@example.com"], vec![])).await.unwrap();
        second.send(&message(&["b@example.com"], vec![])).await.unwrap();

        let mut recipients: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| {
                let text = std::fs::read_to_string(e.unwrap().path()).unwrap();
                let json: serde_json::Value = serde_json::from_str(&text).unwrap();
                json["to"][0].as_str().unwrap().to_string()
            })
            .collect();
        recipients.sort();
        assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_outbox_rejects_empty_recipients() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(tmp.path()).unwrap();
        let err = mailer.send(&message(&[], vec![])).await.unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }

    #[tokio::test]
    async fn test_outbox_rejects_missing_attachment() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(tmp.path().join("outbox")).unwrap();
        let missing = tmp.path().join("missing.pdf");
        let err = mailer
            .send(&message(&["a@example.com"], vec![missing.clone()]))
            .await
            .unwrap_err();
        match err {
            MailError::MissingAttachment(p) => assert_eq!(p, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
