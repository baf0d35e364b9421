//! Progress reporting for provisioning and deployment

use std::sync::Mutex;

use colored::Colorize;
use serde::Serialize;
use tracing::{error, info, warn};

/// Kind of progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressKind {
    ProvisionInfo,
    ProvisionError,
    ProvisionErrorDetails,
    DeployInfo,
    DeployError,
    DeploySuccess,
}

impl ProgressKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ProgressKind::ProvisionError
                | ProgressKind::ProvisionErrorDetails
                | ProgressKind::DeployError
        )
    }
}

/// A structured progress event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub status: ProgressKind,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(status: ProgressKind, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Receives progress events
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, event: ProgressEvent) {
        match event.status {
            ProgressKind::ProvisionErrorDetails => warn!(status = ?event.status, "{}", event.message),
            kind if kind.is_error() => error!(status = ?event.status, "{}", event.message),
            _ => info!(status = ?event.status, "{}", event.message),
        }
    }
}

/// Prints events to stdout for interactive use
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn report(&self, event: ProgressEvent) {
        let label = match event.status {
            ProgressKind::ProvisionInfo | ProgressKind::DeployInfo => "info".cyan(),
            ProgressKind::DeploySuccess => "done".green().bold(),
            ProgressKind::ProvisionErrorDetails => "details".yellow(),
            ProgressKind::ProvisionError | ProgressKind::DeployError => "error".red().bold(),
        };
        println!("[{}] {}", label, event.message);
    }
}

/// Keeps every event, for tests and callers that render progress later
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, status: ProgressKind) -> usize {
        self.events().iter().filter(|e| e.status == status).count()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
