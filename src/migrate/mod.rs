//! Per-record migration pipeline.
//!
//! Records are migrated one at a time, in export order. Each record gets
//! exactly one create attempt; if that fails the record is abandoned and the
//! run moves on. Once an issue exists, the comment, every attachment and the
//! closing transition are attempted independently, and a failure in one never
//! stops the others. Nothing is rolled back: the tracker holds whatever was
//! created.

pub mod attachments;
pub mod payload;

use tracing::{error, info, info_span, warn, Instrument};

use crate::config::MigrationConfig;
use crate::error::TrackerError;
use crate::model::record::SourceRecord;
use crate::model::report::{MigrationReport, MigrationStep, RecordReport};
use crate::tracker::{ApiResponse, CreateIssueOutcome, IssueTracker};
use attachments::AttachmentStager;
use payload::{build_payload, is_padded_summary};

pub struct Migrator<'a> {
    tracker: &'a dyn IssueTracker,
    stager: &'a AttachmentStager,
    config: &'a MigrationConfig,
}

impl<'a> Migrator<'a> {
    pub fn new(
        tracker: &'a dyn IssueTracker,
        stager: &'a AttachmentStager,
        config: &'a MigrationConfig,
    ) -> Self {
        Self {
            tracker,
            stager,
            config,
        }
    }

    pub async fn run(&self, records: &[SourceRecord]) -> MigrationReport {
        let mut report = MigrationReport::new();
        info!("{} issues will be created", records.len());

        for (index, record) in records.iter().enumerate() {
            let span = info_span!("task", id = %record.source_id, n = index + 1);
            let record_report = self.migrate_record(record).instrument(span).await;
            report.records.push(record_report);
        }

        report.complete();
        report
    }

    pub async fn migrate_record(&self, record: &SourceRecord) -> RecordReport {
        let payload = build_payload(record, self.config);
        let mut report = RecordReport::new(
            &record.source_id,
            &payload.fields.summary,
            is_padded_summary(&record.description),
        );

        info!("Creating issue: {}", payload.fields.summary);
        let key = match self.tracker.create_issue(&payload).await {
            Ok(CreateIssueOutcome::Created { key }) => {
                info!("New issue created at {key}");
                key
            }
            Ok(CreateIssueOutcome::Rejected { status, errors }) => {
                error!(%status, "Error(s) occurred creating the issue");
                for (field, message) in &errors {
                    error!("{field}: {message}");
                }
                let detail = errors
                    .iter()
                    .map(|(field, message)| format!("{field}: {message}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                report.add_failure(MigrationStep::CreateIssue, format!("{status} ({detail})"));
                return report;
            }
            Err(e) => {
                error!("Creating the issue failed: {e}");
                report.add_failure(MigrationStep::CreateIssue, e.to_string());
                return report;
            }
        };
        report.issue_key = Some(key.clone());

        if let Some(comment) = &record.comment {
            info!("Adding comment to issue {key}");
            let result = self
                .tracker
                .add_comment(&key, comment, Some(self.config.reporter.as_str()))
                .await;
            check_step(&mut report, MigrationStep::Comment, result);
        }

        for url in record.attachment_urls() {
            let staged = match self.stager.stage(url).await {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping attachment: {e}");
                    report.add_failure(MigrationStep::Download, e.to_string());
                    continue;
                }
            };
            info!("Adding BugHerd attachment to {key}: {url}");
            let result = self.tracker.add_attachment(&key, &staged).await;
            if check_step(&mut report, MigrationStep::Attachment, result) {
                report.attachments_uploaded += 1;
            }
        }

        if record.status.is_closed() {
            info!("Updating issue {key} status to resolved");
            let result = self
                .tracker
                .transition_issue(&key, &self.config.transition_id, &self.config.resolution_id)
                .await;
            let transitioned = check_step(&mut report, MigrationStep::Transition, result);
            report.transitioned = transitioned;
        }

        report
    }
}

/// Log and record a failed follow-up call. Returns whether it succeeded.
fn check_step(
    report: &mut RecordReport,
    step: MigrationStep,
    result: Result<ApiResponse, TrackerError>,
) -> bool {
    match result {
        Ok(response) if response.is_success() => true,
        Ok(response) => {
            let detail = response.describe();
            warn!("{step} failed: {detail}");
            report.add_failure(step, detail);
            false
        }
        Err(e) => {
            warn!("{step} failed: {e}");
            report.add_failure(step, e.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests;
