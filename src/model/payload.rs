use serde::{Deserialize, Serialize};

use super::record::JiraPriority;

/// Body of `POST /rest/api/2/issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub fields: IssueFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    pub project: IdRef,
    pub issuetype: NameRef,
    pub priority: PriorityRef,
    /// Serialized as `{"name": null}` so the issue is left unassigned.
    pub assignee: UserRef,
    pub reporter: UserRef,
    pub components: Vec<IdRef>,
    pub summary: String,
    pub description: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRef {
    pub name: JiraPriority,
}

/// Body of `POST /rest/api/2/issue/{key}/comment`.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPayload {
    pub author: NameRef,
    pub body: String,
}

/// Body of `POST /rest/api/2/issue/{key}/transitions`.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionPayload {
    pub fields: TransitionFields,
    pub transition: IdRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionFields {
    pub resolution: IdRef,
}

impl TransitionPayload {
    pub fn new(transition_id: &str, resolution_id: &str) -> Self {
        Self {
            fields: TransitionFields {
                resolution: IdRef {
                    id: resolution_id.to_string(),
                },
            },
            transition: IdRef {
                id: transition_id.to_string(),
            },
        }
    }
}
