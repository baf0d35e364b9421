//! Publish target and status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named destination a bot can be published to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTarget {
    pub name: String,

    #[serde(rename = "type")]
    pub target_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published: Option<DateTime<Utc>>,
}

/// Status class of a publish snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishStatusKind {
    /// 202
    Pending,
    /// 200
    Success,
    /// 500, and any other code
    Failure,
}

impl PublishStatusKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => PublishStatusKind::Success,
            202 => PublishStatusKind::Pending,
            _ => PublishStatusKind::Failure,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            PublishStatusKind::Success => 200,
            PublishStatusKind::Pending => 202,
            PublishStatusKind::Failure => 500,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PublishStatusKind::Pending)
    }
}

/// One snapshot of a publish attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub status: u16,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub comment: String,

    pub time: DateTime<Utc>,
}

impl PublishStatus {
    pub fn new(kind: PublishStatusKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.code(),
            message: message.into(),
            comment: String::new(),
            time: Utc::now(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn kind(&self) -> PublishStatusKind {
        PublishStatusKind::from_code(self.status)
    }
}
