pub mod jira_errors;
