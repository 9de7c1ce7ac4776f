use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use std::path::PathBuf;

use crate::config::{Credentials, JiraConfig};

/// Create JIRA issues in bulk from a BugHerd XML export.
#[derive(Debug, Default, Parser)]
#[command(name = "bugherder", version)]
pub struct Cli {
    /// Input XML file path
    #[arg(value_name = "/path/to/export.xml")]
    pub input: Option<PathBuf>,

    /// Configuration file [default: ~/.bugherder/config.toml]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JIRA username, prompted for when absent
    #[arg(long, env = "JIRA_USERNAME")]
    pub username: Option<String>,

    /// JIRA password, prompted for when absent
    #[arg(long, env = "JIRA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Where to write the JSON migration report
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Delete the given issues instead of migrating (repeat or comma-separate)
    #[arg(long = "delete", value_name = "KEY", value_delimiter = ',')]
    pub delete: Vec<String>,

    /// Look up the configured reporter before creating any issue
    #[arg(long)]
    pub check_reporter: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Credentials from flags or environment, then the config file, then the
/// terminal.
pub fn resolve_credentials(cli: &Cli, jira: &JiraConfig) -> Result<Credentials> {
    let username = match cli.username.clone().or_else(|| jira.username.clone()) {
        Some(username) => username,
        None => Input::<String>::new()
            .with_prompt("JIRA Username")
            .interact_text()
            .context("Failed to read JIRA username")?,
    };
    let password = match cli.password.clone().or_else(|| jira.password.clone()) {
        Some(password) => password,
        None => Password::new()
            .with_prompt("JIRA Password")
            .interact()
            .context("Failed to read JIRA password")?,
    };
    Ok(Credentials { username, password })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bugherder").chain(args.iter().copied())).unwrap()
    }

    const CONFIG: &str = r#"
[jira]
server = "https://example.atlassian.net"
project_id = "1"
component_id = "2"
reporter = "bot"
transition_id = "3"
resolution_id = "4"
username = "from-config"
password = "config-secret"
"#;

    #[test]
    fn input_is_optional_positional() {
        let cli = parse(&[]);
        assert!(cli.input.is_none());

        let cli = parse(&["export.xml", "-v"]);
        assert_eq!(cli.input, Some(PathBuf::from("export.xml")));
        assert!(cli.verbose);
    }

    #[test]
    fn delete_takes_several_keys() {
        let cli = parse(&["--delete", "WEB-1,WEB-2", "--delete", "WEB-7"]);
        assert_eq!(cli.delete, vec!["WEB-1", "WEB-2", "WEB-7"]);
        assert!(cli.input.is_none());
    }

    #[test]
    fn delete_does_not_swallow_the_input_path() {
        let cli = parse(&["--delete", "WEB-1", "export.xml"]);
        assert_eq!(cli.delete, vec!["WEB-1"]);
        assert_eq!(cli.input, Some(PathBuf::from("export.xml")));
    }

    #[test]
    fn flags_override_config_credentials() {
        let config = parse_config(CONFIG).unwrap();
        let cli = Cli {
            username: Some("from-flag".into()),
            ..Default::default()
        };
        let creds = resolve_credentials(&cli, &config.jira).unwrap();
        assert_eq!(creds.username, "from-flag");
        assert_eq!(creds.password, "config-secret");
    }

    #[test]
    fn config_credentials_are_used_without_prompting() {
        let config = parse_config(CONFIG).unwrap();
        let creds = resolve_credentials(&Cli::default(), &config.jira).unwrap();
        assert_eq!(creds.username, "from-config");
    }
}
