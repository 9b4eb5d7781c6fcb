//! # Artifact Store
//!
//! Naming, listing and lookup of rendered documents under one directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::RenderFailure;
use crate::state::Difficulty;

/// Safe filename stem for a topic
///
/// Keeps alphanumerics, space, `-`, `_` and `.`; collapses whitespace to a
/// single `_`; caps the length at 50 characters; falls back to `exam` when
/// fewer than 3 characters survive.
pub fn safe_filename(topic: &str) -> String {
    const MAX_LEN: usize = 50;

    let kept: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let mut safe = kept.split_whitespace().collect::<Vec<_>>().join("_");

    if safe.chars().count() > MAX_LEN {
        safe = safe.chars().take(MAX_LEN).collect::<String>();
        safe = safe.trim_end_matches('_').to_string();
    }
    if safe.chars().count() < 3 {
        return "exam".to_string();
    }
    safe
}

/// Which document of a run a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Exam,
    AnswerKey,
    Notes,
    Other,
}

impl ArtifactKind {
    fn from_filename(name: &str) -> Self {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        if stem.ends_with("_answer_key") {
            ArtifactKind::AnswerKey
        } else if stem.ends_with("_exam") {
            ArtifactKind::Exam
        } else if stem.ends_with("_notes") {
            ArtifactKind::Notes
        } else {
            ArtifactKind::Other
        }
    }
}

/// Paths reserved for the three documents of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub exam: PathBuf,
    pub answer_key: PathBuf,
    pub notes: PathBuf,
}

impl ArtifactSet {
    fn all(&self) -> [&PathBuf; 3] {
        [&self.exam, &self.answer_key, &self.notes]
    }

    /// Create all three files empty. `Ok(false)` when another run holds any
    /// of the names; files created by this attempt are removed again.
    fn reserve(&self) -> Result<bool, RenderFailure> {
        let mut created: Vec<&PathBuf> = Vec::with_capacity(3);
        for path in self.all() {
            let opened = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path);
            match opened {
                Ok(_) => created.push(path),
                Err(e) => {
                    for done in created {
                        let _ = std::fs::remove_file(done);
                    }
                    if e.kind() == std::io::ErrorKind::AlreadyExists {
                        return Ok(false);
                    }
                    return Err(RenderFailure::io(path, e));
                }
            }
        }
        Ok(true)
    }

    /// Remove whatever was already written (cancelled or failed renders)
    pub fn remove_partial(&self) {
        for path in self.all() {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Failed to remove partial artifact {:?}: {}", path, e);
                }
            }
        }
    }
}

/// A listed artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve unique paths for one run. The files are created empty so a
    /// concurrent run with the same stem moves on to the next `_N` suffix.
    /// Blocking; called from the render worker.
    pub fn allocate(
        &self,
        topic: &str,
        difficulty: Difficulty,
        now: DateTime<Local>,
        extension: &str,
    ) -> Result<ArtifactSet, RenderFailure> {
        std::fs::create_dir_all(&self.root).map_err(|e| RenderFailure::io(&self.root, e))?;

        let base = format!(
            "{}_{}_{}",
            safe_filename(topic),
            difficulty,
            now.format("%Y%m%d_%H%M%S")
        );

        let mut attempt = 1;
        loop {
            let stem = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let set = ArtifactSet {
                exam: self.root.join(format!("{}_exam.{}", stem, extension)),
                answer_key: self.root.join(format!("{}_answer_key.{}", stem, extension)),
                notes: self.root.join(format!("{}_notes.{}", stem, extension)),
            };
            if set.reserve()? {
                return Ok(set);
            }
            attempt += 1;
        }
    }

    /// Generated artifacts, newest first
    pub async fn list(&self) -> Result<Vec<ArtifactInfo>> {
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read directory: {:?}", self.root))?;

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            artifacts.push(ArtifactInfo {
                kind: ArtifactKind::from_filename(&filename),
                filename,
                size: metadata.len(),
                created,
            });
        }

        artifacts.sort_by(|a, b| b.created.cmp(&a.created).then(a.filename.cmp(&b.filename)));
        Ok(artifacts)
    }

    /// Path of an artifact by bare filename. Rejects anything that could
    /// leave the store directory.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let invalid = filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
            || filename.starts_with('.');
        if invalid {
            return None;
        }
        Some(self.root.join(filename))
    }
}
