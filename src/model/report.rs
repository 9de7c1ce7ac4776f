use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome {
    /// Issue created and every follow-up step succeeded.
    Migrated,
    /// Issue created but at least one follow-up step failed.
    Partial,
    /// Issue creation failed; nothing else was attempted.
    Failed,
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOutcome::Migrated => f.write_str("migrated"),
            RecordOutcome::Partial => f.write_str("partial"),
            RecordOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// Which part of a record's migration a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    CreateIssue,
    Comment,
    Download,
    Attachment,
    Transition,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::CreateIssue => f.write_str("create issue"),
            MigrationStep::Comment => f.write_str("comment"),
            MigrationStep::Download => f.write_str("download"),
            MigrationStep::Attachment => f.write_str("attachment"),
            MigrationStep::Transition => f.write_str("transition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: MigrationStep,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    pub source_id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
    pub outcome: RecordOutcome,
    #[serde(default)]
    pub attachments_uploaded: usize,
    #[serde(default)]
    pub transitioned: bool,
    /// The summary got an ellipsis although the description was not truncated.
    #[serde(default)]
    pub padded_summary: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StepFailure>,
}

impl RecordReport {
    pub fn new(source_id: &str, summary: &str, padded_summary: bool) -> Self {
        Self {
            source_id: source_id.to_string(),
            summary: summary.to_string(),
            issue_key: None,
            outcome: RecordOutcome::Migrated,
            attachments_uploaded: 0,
            transitioned: false,
            padded_summary,
            failures: Vec::new(),
        }
    }

    /// Record a failed step. Creation failures fail the record, anything
    /// later only downgrades it to partial.
    pub fn add_failure(&mut self, step: MigrationStep, message: impl Into<String>) {
        self.failures.push(StepFailure {
            step,
            message: message.into(),
        });
        let failed = step == MigrationStep::CreateIssue || self.outcome == RecordOutcome::Failed;
        self.outcome = if failed {
            RecordOutcome::Failed
        } else {
            RecordOutcome::Partial
        };
    }
}

/// Structured outcome of one migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records: Vec<RecordReport>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn count(&self, outcome: RecordOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn padded_summaries(&self) -> usize {
        self.records.iter().filter(|r| r.padded_summary).count()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n=== Migration Summary ===\n");
        println!("Records processed:  {}", self.records.len());
        println!("Migrated:           {}", self.count(RecordOutcome::Migrated));
        println!("Partial:            {}", self.count(RecordOutcome::Partial));
        println!("Failed:             {}", self.count(RecordOutcome::Failed));

        if let Some(duration) = self.duration() {
            println!("\nCompleted in {} seconds", duration.num_seconds());
        }

        let problems: Vec<&RecordReport> = self
            .records
            .iter()
            .filter(|r| r.outcome != RecordOutcome::Migrated)
            .collect();
        if !problems.is_empty() {
            println!("\nProblems ({}):", problems.len());
            for record in problems {
                let key = record.issue_key.as_deref().unwrap_or("-");
                println!("  [{}] task {} ({key})", record.outcome, record.source_id);
                for failure in &record.failures {
                    println!("      {}: {}", failure.step, failure.message);
                }
            }
        }

        let padded = self.padded_summaries();
        if padded > 0 {
            println!(
                "\nNote: {padded} summaries end in \"...\" although their description was not truncated"
            );
        }
    }
}
