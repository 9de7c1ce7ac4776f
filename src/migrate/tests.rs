use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::attachments::AttachmentStager;
use super::Migrator;
use crate::config::tests::test_config;
use crate::config::MigrationConfig;
use crate::model::record::{RecordStatus, SourcePriority, SourceRecord};
use crate::model::report::{MigrationStep, RecordOutcome};
use crate::tracker::tests::{Call, MockTracker};

fn make_record(id: &str, description: &str) -> SourceRecord {
    SourceRecord {
        source_id: id.to_string(),
        priority: SourcePriority::Normal,
        description: description.to_string(),
        requester_email: Some("jane@example.com".into()),
        site_path: Some("/".into()),
        os: None,
        resolution: None,
        browser: None,
        browser_size: None,
        tags: vec![],
        comment: None,
        attachments: vec![],
        screenshot: None,
        status: RecordStatus::Open,
    }
}

fn config_in(dir: &tempfile::TempDir) -> MigrationConfig {
    let mut config = test_config();
    config.scratch_dir = dir.path().join("scratch");
    config
}

fn stager_for(config: &MigrationConfig) -> AttachmentStager {
    AttachmentStager::new(config)
        .unwrap()
        .with_backoff(Duration::from_millis(1))
}

async fn serve(server: &MockServer, file: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{file}")))
        .respond_with(ResponseTemplate::new(status).set_body_string(file))
        .mount(server)
        .await;
}

#[tokio::test]
async fn failed_create_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new().rejecting("Second");

    let records = vec![
        make_record("1", "First bug"),
        make_record("2", "Second bug"),
        make_record("3", "Third bug"),
    ];
    let report = Migrator::new(&tracker, &stager, &config).run(&records).await;

    let outcomes: Vec<RecordOutcome> = report.records.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![RecordOutcome::Migrated, RecordOutcome::Failed, RecordOutcome::Migrated]
    );
    assert_eq!(
        tracker.calls(),
        vec![
            Call::Create { summary: "First bug...".into() },
            Call::Create { summary: "Second bug...".into() },
            Call::Create { summary: "Third bug...".into() },
        ]
    );
    assert_eq!(report.records[2].issue_key.as_deref(), Some("WEB-3"));
    assert!(report.records[1].issue_key.is_none());
    assert_eq!(report.records[1].failures[0].step, MigrationStep::CreateIssue);
    assert!(report.completed_at.is_some());
}

#[tokio::test]
async fn failed_create_skips_follow_up_steps() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new().rejecting("Doomed");

    let mut record = make_record("1", "Doomed bug");
    record.comment = Some("never posted".into());
    record.screenshot = Some("http://127.0.0.1:9/files/shot.png".into());
    record.status = RecordStatus::Closed;

    let report = Migrator::new(&tracker, &stager, &config).run(&[record]).await;

    assert_eq!(tracker.calls().len(), 1);
    assert_eq!(report.records[0].outcome, RecordOutcome::Failed);
}

#[tokio::test]
async fn closed_records_are_transitioned_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new();

    let mut closed = make_record("1", "Already fixed");
    closed.status = RecordStatus::Closed;
    let open = make_record("2", "Still broken");

    let report = Migrator::new(&tracker, &stager, &config)
        .run(&[closed, open])
        .await;

    let transitions: Vec<Call> = tracker
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Transition { .. }))
        .collect();
    assert_eq!(
        transitions,
        vec![Call::Transition {
            key: "WEB-1".into(),
            transition_id: "31".into(),
            resolution_id: "10001".into(),
        }]
    );
    assert!(report.records[0].transitioned);
    assert!(!report.records[1].transitioned);
}

#[tokio::test]
async fn comment_is_posted_as_reporter() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new();

    let mut record = make_record("1", "Has a comment");
    record.comment = Some("Customer called about this".into());

    Migrator::new(&tracker, &stager, &config).run(&[record]).await;

    assert_eq!(
        tracker.calls()[1],
        Call::Comment {
            key: "WEB-1".into(),
            body: "Customer called about this".into(),
            author: Some("migration-bot".into()),
        }
    );
}

#[tokio::test]
async fn attachments_then_screenshot_are_uploaded_in_order() {
    let server = MockServer::start().await;
    serve(&server, "a.png", 200).await;
    serve(&server, "b.log", 200).await;
    serve(&server, "shot.png", 200).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new();

    let mut record = make_record("1", "With files");
    record.attachments = vec![
        format!("{}/files/a.png", server.uri()),
        format!("{}/files/b.log", server.uri()),
    ];
    record.screenshot = Some(format!("{}/files/shot.png", server.uri()));

    let report = Migrator::new(&tracker, &stager, &config).run(&[record]).await;

    let uploads: Vec<String> = tracker
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Attachment { key, file_name } => {
                assert_eq!(key, "WEB-1");
                Some(file_name)
            }
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec!["a.png", "b.log", "shot.png"]);
    assert_eq!(report.records[0].attachments_uploaded, 3);
    assert_eq!(report.records[0].outcome, RecordOutcome::Migrated);
    assert!(config.scratch_dir.join("shot.png").exists());
}

#[tokio::test]
async fn failed_download_skips_only_that_attachment() {
    let server = MockServer::start().await;
    serve(&server, "missing.png", 404).await;
    serve(&server, "present.png", 200).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new();

    let mut record = make_record("1", "Half the files");
    record.attachments = vec![
        format!("{}/files/missing.png", server.uri()),
        format!("{}/files/present.png", server.uri()),
    ];
    record.status = RecordStatus::Closed;

    let report = Migrator::new(&tracker, &stager, &config).run(&[record]).await;
    let record_report = &report.records[0];

    assert_eq!(record_report.attachments_uploaded, 1);
    assert_eq!(record_report.outcome, RecordOutcome::Partial);
    assert_eq!(record_report.failures.len(), 1);
    assert_eq!(record_report.failures[0].step, MigrationStep::Download);
    assert!(record_report.transitioned);
}

#[tokio::test]
async fn failing_follow_up_calls_mark_record_partial() {
    let server = MockServer::start().await;
    serve(&server, "a.png", 200).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new()
        .with_failing_comments()
        .with_failing_attachments()
        .with_failing_transitions();

    let mut record = make_record("1", "Everything fails");
    record.comment = Some("hello".into());
    record.attachments = vec![format!("{}/files/a.png", server.uri())];
    record.status = RecordStatus::Closed;

    let report = Migrator::new(&tracker, &stager, &config).run(&[record]).await;
    let record_report = &report.records[0];

    assert_eq!(tracker.calls().len(), 4);
    assert_eq!(record_report.outcome, RecordOutcome::Partial);
    let steps: Vec<MigrationStep> = record_report.failures.iter().map(|f| f.step).collect();
    assert_eq!(
        steps,
        vec![MigrationStep::Comment, MigrationStep::Attachment, MigrationStep::Transition]
    );
    assert_eq!(record_report.attachments_uploaded, 0);
    assert!(!record_report.transitioned);
}

#[tokio::test]
async fn short_descriptions_are_flagged_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let stager = stager_for(&config);
    let tracker = MockTracker::new();

    let records = vec![
        make_record("1", "Typo"),
        make_record("2", &"x".repeat(80)),
    ];
    let report = Migrator::new(&tracker, &stager, &config).run(&records).await;

    assert_eq!(report.records[0].summary, "Typo...");
    assert!(report.records[0].padded_summary);
    assert!(!report.records[1].padded_summary);
    assert_eq!(report.padded_summaries(), 1);
}
