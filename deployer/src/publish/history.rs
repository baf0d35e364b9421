//! Publish history: append-only status snapshots per target

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::publish::PublishStatus;

/// Snapshots keyed by target name, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublishHistory(BTreeMap<String, Vec<PublishStatus>>);

impl PublishHistory {
    pub fn append(&mut self, target: &str, status: PublishStatus) {
        self.0.entry(target.to_string()).or_default().push(status);
    }

    /// The snapshot that determines the displayed status
    pub fn latest(&self, target: &str) -> Option<&PublishStatus> {
        self.0.get(target).and_then(|entries| entries.last())
    }

    pub fn entries(&self, target: &str) -> &[PublishStatus] {
        self.0.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// History persisted as JSON in the project
#[derive(Debug, Clone)]
pub struct PublishHistoryStore {
    file: File,
}

impl PublishHistoryStore {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// Load the history; a missing file is an empty history
    pub async fn load(&self) -> Result<PublishHistory, DeployError> {
        if !self.file.exists().await {
            return Ok(PublishHistory::default());
        }
        self.file.read_json().await
    }

    pub async fn save(&self, history: &PublishHistory) -> Result<(), DeployError> {
        self.file.write_json(history).await
    }

    /// Append one snapshot and persist
    pub async fn append(&self, target: &str, status: PublishStatus) -> Result<(), DeployError> {
        let mut history = self.load().await?;
        history.append(target, status);
        self.save(&history).await
    }

    pub async fn latest(&self, target: &str) -> Result<Option<PublishStatus>, DeployError> {
        Ok(self.load().await?.latest(target).cloned())
    }
}
