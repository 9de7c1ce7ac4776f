use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub jira: JiraConfig,
    #[serde(default)]
    pub migration: MigrationSettings,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    pub server: String,
    pub project_id: String,
    pub component_id: String,
    /// User shown as reporter of every migrated issue and author of its comment.
    pub reporter: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    /// Transition and resolution used to close issues that were closed in BugHerd.
    pub transition_id: String,
    pub resolution_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MigrationSettings {
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Hosts attachments may be downloaded from. Empty allows any host.
    #[serde(default)]
    pub allowed_attachment_hosts: Vec<String>,
    #[serde(default = "default_download_retries")]
    pub download_retries: u32,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            allowed_attachment_hosts: Vec::new(),
            download_retries: default_download_retries(),
        }
    }
}

fn default_issue_type() -> String {
    "Task".into()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("/tmp/bugherder")
}

/// Attachments are fetched one at a time, so every retry delays the whole run.
pub const MAX_DOWNLOAD_RETRIES: u32 = 10;

fn default_download_retries() -> u32 {
    2
}

/// Static settings for one run, shared read-only by every component.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub server: String,
    pub project_id: String,
    pub component_id: String,
    pub reporter: String,
    pub issue_type: String,
    pub transition_id: String,
    pub resolution_id: String,
    pub scratch_dir: PathBuf,
    pub allowed_attachment_hosts: Vec<String>,
    pub download_retries: u32,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig {
            server: self.jira.server.trim_end_matches('/').to_string(),
            project_id: self.jira.project_id.clone(),
            component_id: self.jira.component_id.clone(),
            reporter: self.jira.reporter.clone(),
            issue_type: self.jira.issue_type.clone(),
            transition_id: self.jira.transition_id.clone(),
            resolution_id: self.jira.resolution_id.clone(),
            scratch_dir: self.migration.scratch_dir.clone(),
            allowed_attachment_hosts: self
                .migration
                .allowed_attachment_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            download_retries: self.migration.download_retries,
        }
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("jira.server", &self.jira.server),
            ("jira.project_id", &self.jira.project_id),
            ("jira.component_id", &self.jira.component_id),
            ("jira.reporter", &self.jira.reporter),
            ("jira.transition_id", &self.jira.transition_id),
            ("jira.resolution_id", &self.jira.resolution_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        if !self.jira.server.starts_with("http://") && !self.jira.server.starts_with("https://") {
            bail!("jira.server must be an http(s) URL, got {}", self.jira.server);
        }
        if self.migration.download_retries > MAX_DOWNLOAD_RETRIES {
            bail!(
                "migration.download_retries must be at most {MAX_DOWNLOAD_RETRIES}, got {}",
                self.migration.download_retries
            );
        }
        Ok(())
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bugherder")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        bail!(
            "No configuration found at {}. Create it with a [jira] table",
            path.display()
        );
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config in {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("Failed to parse config.toml")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn test_config() -> MigrationConfig {
        MigrationConfig {
            server: "https://example.atlassian.net".into(),
            project_id: "10000".into(),
            component_id: "10100".into(),
            reporter: "migration-bot".into(),
            issue_type: "Task".into(),
            transition_id: "31".into(),
            resolution_id: "10001".into(),
            scratch_dir: std::env::temp_dir().join("bugherder-tests"),
            allowed_attachment_hosts: Vec::new(),
            download_retries: 0,
        }
    }

    const FULL: &str = r#"
[jira]
server = "https://example.atlassian.net/"
project_id = "10000"
component_id = "10100"
reporter = "migration-bot"
transition_id = "31"
resolution_id = "10001"
username = "admin"

[migration]
scratch_dir = "/var/tmp/bh"
allowed_attachment_hosts = ["Files.BugHerd.com"]
download_retries = 5
"#;

    #[test]
    fn parse_full_config() {
        let config = parse_config(FULL).unwrap();
        assert_eq!(config.jira.username.as_deref(), Some("admin"));
        assert!(config.jira.password.is_none());

        let migration = config.migration_config();
        assert_eq!(migration.server, "https://example.atlassian.net");
        assert_eq!(migration.issue_type, "Task");
        assert_eq!(migration.scratch_dir, PathBuf::from("/var/tmp/bh"));
        assert_eq!(migration.allowed_attachment_hosts, vec!["files.bugherd.com"]);
        assert_eq!(migration.download_retries, 5);
    }

    #[test]
    fn migration_table_is_optional() {
        let minimal = FULL.split("[migration]").next().unwrap();
        let config = parse_config(minimal).unwrap();
        assert_eq!(config.migration.scratch_dir, PathBuf::from("/tmp/bugherder"));
        assert!(config.migration.allowed_attachment_hosts.is_empty());
        assert_eq!(config.migration.download_retries, 2);
    }

    #[test]
    fn empty_required_value_fails() {
        let broken = FULL.replace("reporter = \"migration-bot\"", "reporter = \"\"");
        let err = parse_config(&broken).unwrap_err();
        assert!(err.to_string().contains("jira.reporter"));
    }

    #[test]
    fn server_must_be_http() {
        let broken = FULL.replace("https://example.atlassian.net/", "example.atlassian.net");
        assert!(parse_config(&broken).is_err());
    }

    #[test]
    fn download_retries_are_bounded() {
        let broken = FULL.replace("download_retries = 5", "download_retries = 12");
        let err = parse_config(&broken).unwrap_err();
        assert!(err.to_string().contains("migration.download_retries"));

        let edge = FULL.replace("download_retries = 5", "download_retries = 10");
        assert_eq!(parse_config(&edge).unwrap().migration.download_retries, 10);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Path::new("/nonexistent/bugherder.toml")).unwrap_err();
        assert!(err.to_string().contains("No configuration found"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.jira.project_id, "10000");
    }
}
