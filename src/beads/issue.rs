use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue type used for mail.
pub const MESSAGE_TYPE: &str = "message";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bead. Field order is the serialized order, which keeps exports stable.
///
/// `ephemeral` marks a wisp: it lives in the local store like any other issue
/// but is never written to the export. Older stores call the field `wisp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "default_issue_type", alias = "type")]
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "wisp", skip_serializing_if = "is_false")]
    pub ephemeral: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

fn default_issue_type() -> String {
    "task".into()
}

impl Issue {
    pub const fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Value of the first `key:value` label with the given key.
    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find_map(|l| l.strip_prefix(key).and_then(|rest| rest.strip_prefix(':')))
    }
}

/// Fields supplied by a producer; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub issue_type: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub ephemeral: bool,
}

impl NewIssue {
    pub fn task(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            issue_type: default_issue_type(),
            assignee: None,
            labels: Vec::new(),
            ephemeral: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }

    #[must_use]
    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    #[must_use]
    pub const fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}
