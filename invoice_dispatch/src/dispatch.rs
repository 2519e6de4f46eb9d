//! The dispatch workflow: group documents by entity, resolve recipients,
//! send one message per entity and collect a status report.

use std::path::{Path, PathBuf};

use entity_matcher::{
    resolve, ContactDirectory, DirectoryEntry, DirectoryMatch, EntityCluster, EntityClusterer,
    MatchRules,
};
use tracing::{info, warn};

use crate::db::Db;
use crate::documents::Document;
use crate::error::DispatchError;
use crate::mailer::{Mailer, OutgoingMessage};
use crate::report::{DispatchStatus, ReportFormat, StatusEntry, StatusReport};

/// One entity cluster with the directory entry it resolved to, if any.
#[derive(Debug, Clone)]
pub struct PlannedDispatch<'d> {
    pub cluster: EntityCluster<Document>,
    pub resolution: Option<DirectoryMatch<'d>>,
}

impl PlannedDispatch<'_> {
    fn entry(&self, status: DispatchStatus, documents: &[&Document]) -> StatusEntry {
        let entry = self.resolution.as_ref().map(|m| m.entry);
        StatusEntry {
            entity: self.cluster.display_name.clone(),
            key: self.cluster.key.clone(),
            documents: documents.iter().map(|d| d.file_name()).collect(),
            matched_name: entry.map(|e| e.name.clone()),
            match_type: self.resolution.as_ref().map(|m| m.match_type),
            to: entry.map(|e| e.to.iter().cloned().collect()).unwrap_or_default(),
            cc: entry.map(|e| e.cc.iter().cloned().collect()).unwrap_or_default(),
            status,
        }
    }
}

/// Where a real run's status report goes.
#[derive(Debug, Clone, Copy)]
pub struct ReportDelivery<'r> {
    pub dir: &'r Path,
    pub format: ReportFormat,
    pub to: &'r str,
}

/// What [`Dispatcher::finish`] did with a report.
#[derive(Debug, Default)]
pub struct RunRecord {
    /// Saved report file, when the report was saved and mailed.
    pub report_path: Option<PathBuf>,
    /// Ledger row id, when a ledger was given.
    pub run_id: Option<i64>,
    /// Why the report could not be saved or mailed.
    pub report_error: Option<DispatchError>,
}

pub struct Dispatcher<'a, M> {
    rules: &'a MatchRules,
    clusterer: EntityClusterer<'a>,
    directory: &'a ContactDirectory,
    mailer: &'a M,
    subject: String,
    body: String,
}

impl<'a, M: Mailer> Dispatcher<'a, M> {
    pub fn new(
        rules: &'a MatchRules,
        directory: &'a ContactDirectory,
        mailer: &'a M,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        Ok(Self {
            rules,
            clusterer: EntityClusterer::new(rules)?,
            directory,
            mailer,
            subject: subject.into(),
            body: body.into(),
        })
    }

    /// Group the documents and resolve each group against the directory.
    pub fn plan(&self, documents: Vec<Document>) -> Vec<PlannedDispatch<'a>> {
        let directory: &'a ContactDirectory = self.directory;
        self.clusterer
            .group(documents)
            .into_iter()
            .map(|cluster| {
                let resolution = resolve(&cluster.display_name, directory, self.rules);
                PlannedDispatch { cluster, resolution }
            })
            .collect()
    }

    /// The message for one entity.
    pub fn message_for(&self, display_name: &str, entry: &DirectoryEntry, attachments: &[&Document]) -> OutgoingMessage {
        OutgoingMessage {
            to: entry.to.iter().cloned().collect(),
            cc: entry.cc.iter().cloned().collect(),
            subject: format!("{}: {}", self.subject, display_name),
            body: self.body.clone(),
            attachments: attachments.iter().map(|d| d.path.clone()).collect(),
        }
    }

    pub async fn run(&self, documents: Vec<Document>, dry_run: bool) -> StatusReport {
        self.run_with_progress(documents, dry_run, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, documents: Vec<Document>, dry_run: bool, on_entry: F) -> StatusReport
    where
        F: FnMut(&StatusEntry),
    {
        self.run_plan(self.plan(documents), dry_run, on_entry).await
    }

    /// Dispatch every planned entity in turn. Per-entity failures are recorded
    /// in the report and never stop the run. `on_entry` is called after each
    /// entity.
    pub async fn run_plan<F>(&self, plan: Vec<PlannedDispatch<'a>>, dry_run: bool, mut on_entry: F) -> StatusReport
    where
        F: FnMut(&StatusEntry),
    {
        let mut report = StatusReport::new(dry_run);

        for planned in plan {
            let entry = self.dispatch_one(&planned, dry_run).await;
            on_entry(&entry);
            report.push(entry);
        }

        let summary = report.summary();
        info!(
            total = summary.total,
            sent = summary.sent,
            planned = summary.planned,
            errors = summary.errors,
            dry_run,
            "dispatch finished"
        );
        report
    }

    async fn dispatch_one(&self, planned: &PlannedDispatch<'_>, dry_run: bool) -> StatusEntry {
        let name = planned.cluster.display_name.as_str();
        let present: Vec<&Document> = planned
            .cluster
            .members
            .iter()
            .filter(|d| d.path.is_file())
            .collect();

        if present.is_empty() {
            warn!(entity = name, "no documents left on disk");
            return planned.entry(DispatchStatus::NoDocuments, &present);
        }

        let Some(matched) = planned.resolution.as_ref() else {
            warn!(entity = name, "entity not found in directory, skipping");
            return planned.entry(DispatchStatus::NoRecipients, &present);
        };

        let message = self.message_for(name, matched.entry, &present);
        if dry_run {
            info!(entity = name, to = %message.to.join(", "), documents = present.len(), "would send");
            return planned.entry(DispatchStatus::Planned, &present);
        }

        match self.mailer.send(&message).await {
            Ok(()) => {
                info!(entity = name, documents = present.len(), "sent");
                planned.entry(DispatchStatus::Sent, &present)
            }
            Err(e) => {
                warn!(entity = name, error = %e, "send failed");
                planned.entry(DispatchStatus::failed(e), &present)
            }
        }
    }

    /// Save the report into `dir` and mail it to `to`. Returns the saved path.
    pub async fn send_report(
        &self,
        report: &StatusReport,
        dir: impl AsRef<Path>,
        format: ReportFormat,
        to: &str,
    ) -> Result<PathBuf, DispatchError> {
        let path = report.save(dir, format)?;
        let message = report.summary_message(to, path.clone());
        self.mailer.send(&message).await?;
        info!(path = %path.display(), to, "report sent");
        Ok(path)
    }

    /// Close a run: deliver the report (real runs only) and record the run in
    /// the ledger. A report that cannot be delivered is logged and returned in
    /// the record; the run is still recorded.
    pub async fn finish(
        &self,
        report: &StatusReport,
        delivery: Option<ReportDelivery<'_>>,
        db: Option<&mut Db>,
    ) -> Result<RunRecord, DispatchError> {
        let mut record = RunRecord::default();

        if let Some(delivery) = delivery.filter(|_| !report.dry_run) {
            match self
                .send_report(report, delivery.dir, delivery.format, delivery.to)
                .await
            {
                Ok(path) => record.report_path = Some(path),
                Err(e) => {
                    warn!(to = delivery.to, error = %e, "status report not delivered");
                    record.report_error = Some(e);
                }
            }
        }

        if let Some(db) = db {
            record.run_id = Some(db.record_run(report, record.report_path.as_deref())?);
        }

        Ok(record)
    }
}
