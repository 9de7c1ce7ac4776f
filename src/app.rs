use std::path::PathBuf;
use std::process::ExitCode;

use clap::CommandFactory;
use tracing::{error, info, warn};

use crate::cli::{resolve_credentials, Cli};
use crate::config::{self, AppConfig, Credentials};
use crate::export::read_export;
use crate::migrate::attachments::AttachmentStager;
use crate::migrate::Migrator;
use crate::tracker::jira::JiraClient;
use crate::tracker::IssueTracker;

/// Process exit status. Per-record failures never change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    Usage = 1,
    NoWork = 2,
    Auth = 3,
    Config = 4,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

pub async fn run(cli: Cli) -> Exit {
    if !cli.delete.is_empty() {
        return delete_issues(&cli).await;
    }

    let Some(input) = cli.input.as_deref() else {
        // Help only fails if stdout is gone; there is nothing left to report then.
        let _ = Cli::command().print_help();
        return Exit::Usage;
    };

    // Parse before anything touches the network.
    let records = match read_export(input) {
        Ok(records) => records,
        Err(e) => {
            error!("{e}");
            return Exit::NoWork;
        }
    };

    let (app_config, credentials) = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e:#}");
            return Exit::Config;
        }
    };
    let config = app_config.migration_config();

    let client = match JiraClient::authenticate(&config.server, &credentials).await {
        Ok(client) => client,
        Err(e) => {
            error!("An error occurred authenticating to JIRA: {e}");
            return Exit::Auth;
        }
    };
    info!("Authenticated to {} as {}", config.server, client.user());
    if cli.check_reporter {
        check_reporter(&client, &config.reporter).await;
    }

    let stager = match AttachmentStager::new(&config) {
        Ok(stager) => stager,
        Err(e) => {
            error!("Failed to set up attachment downloads: {e}");
            return Exit::Config;
        }
    };
    info!(scratch_dir = %stager.scratch_dir().display(), "staging attachments");

    let report = Migrator::new(&client, &stager, &config).run(&records).await;
    report.print_summary();

    let report_path = cli.report.clone().unwrap_or_else(default_report_path);
    match report.save(&report_path) {
        Ok(()) => println!("\nReport written to {}", report_path.display()),
        Err(e) => warn!("{e:#}"),
    }

    Exit::Success
}

fn load_settings(cli: &Cli) -> anyhow::Result<(AppConfig, Credentials)> {
    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let app_config = config::load_config(&path)?;
    let credentials = resolve_credentials(cli, &app_config.jira)?;
    Ok((app_config, credentials))
}

/// Every create names the reporter; an unknown one fails all of them.
async fn check_reporter(client: &JiraClient, reporter: &str) {
    match client.find_user(reporter).await {
        Ok(response) if response.is_success() => {}
        Ok(response) => warn!(
            "Reporter {reporter} was not found, issue creation will likely fail: {}",
            response.describe()
        ),
        Err(e) => warn!("Could not look up reporter {reporter}: {e}"),
    }
}

fn default_report_path() -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    config::data_dir()
        .join("reports")
        .join(format!("migration-{stamp}.json"))
}

async fn delete_issues(cli: &Cli) -> Exit {
    let (app_config, credentials) = match load_settings(cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e:#}");
            return Exit::Config;
        }
    };
    let server = app_config.migration_config().server;
    let client = match JiraClient::authenticate(&server, &credentials).await {
        Ok(client) => client,
        Err(e) => {
            error!("An error occurred authenticating to JIRA: {e}");
            return Exit::Auth;
        }
    };

    for key in &cli.delete {
        match client.delete_issue(key).await {
            Ok(response) if response.is_success() => info!("Deleted {key}"),
            Ok(response) => warn!("Deleting {key} failed: {}", response.describe()),
            Err(e) => warn!("Deleting {key} failed: {e}"),
        }
    }
    Exit::Success
}
