//! Submission providers
//!
//! `FileSubmissionStore` loads `*.txt` submissions from a directory,
//! deriving participant display names from the file stems;
//! `InMemorySubmissionStore` serves programmatic rosters and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use crate::traits::SubmissionProvider;
use shared::{Participant, Submission};

/// In-memory roster for programmatic use
#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    participants: Vec<Participant>,
    submissions: HashMap<Uuid, Submission>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant with their submission, returning the new id
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) -> Uuid {
        let participant = Participant::new(name);
        let id = participant.id;
        self.submissions.insert(id, Submission::new(id, content));
        self.participants.push(participant);
        id
    }
}

#[async_trait]
impl SubmissionProvider for InMemorySubmissionStore {
    async fn participants(&self) -> ArenaResult<Vec<Participant>> {
        Ok(self.participants.clone())
    }

    async fn submission(&self, participant: Uuid) -> ArenaResult<Submission> {
        self.submissions
            .get(&participant)
            .cloned()
            .ok_or_else(|| ArenaError::InvalidSubmission {
                participant,
                reason: "unknown participant".to_string(),
            })
    }
}

/// Loads submissions from a directory of `*.txt` files, one per
/// participant, eagerly at construction
#[derive(Debug)]
pub struct FileSubmissionStore {
    directory: PathBuf,
    participants: Vec<Participant>,
    submissions: HashMap<Uuid, Submission>,
}

impl FileSubmissionStore {
    pub async fn load(directory: impl AsRef<Path>) -> ArenaResult<Self> {
        let directory = directory.as_ref().to_path_buf();

        let mut paths = Vec::new();
        let mut dir = fs::read_dir(&directory).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                paths.push(path);
            }
        }
        // Stable roster order regardless of directory iteration order
        paths.sort();

        let mut participants = Vec::new();
        let mut submissions = HashMap::new();
        for path in paths {
            let content = fs::read_to_string(&path).await?;
            let content = content.trim();
            if content.is_empty() {
                warn!("⚠️ skipping empty submission file {}", path.display());
                continue;
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string();
            let participant = Participant::new(display_name(&stem));
            let submission = Submission::new(participant.id, content).with_source(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&stem)
                    .to_string(),
            );
            submissions.insert(participant.id, submission);
            participants.push(participant);
        }

        if participants.is_empty() {
            return Err(ArenaError::InvalidFormatInput {
                message: format!("no .txt submissions found in {}", directory.display()),
            });
        }

        info!(
            "📂 loaded {} submissions from {}",
            participants.len(),
            directory.display()
        );

        Ok(Self {
            directory,
            participants,
            submissions,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[async_trait]
impl SubmissionProvider for FileSubmissionStore {
    async fn participants(&self) -> ArenaResult<Vec<Participant>> {
        Ok(self.participants.clone())
    }

    async fn submission(&self, participant: Uuid) -> ArenaResult<Submission> {
        self.submissions
            .get(&participant)
            .cloned()
            .ok_or_else(|| ArenaError::InvalidSubmission {
                participant,
                reason: "unknown participant".to_string(),
            })
    }
}

/// Turn a file stem like `maya_magnificent` into `Maya Magnificent`
fn display_name(stem: &str) -> String {
    stem.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
