//! Project persistence.
//!
//! One JSON document per project under `.sitecraft/projects/<id>.json`.
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written project. Every save bumps `revision`; a save whose expected
//! revision no longer matches the file is refused. The check and the rename
//! run under an exclusive lock on `.<id>.lock`, shared with other processes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sitecraft_common::{Message, Page, Transcript};
use uuid::Uuid;

use crate::errors::StoreError;

/// Opening line of every new conversation.
pub const GREETING: &str = "Olá! Como posso te ajudar a construir sua página hoje?";

/// The persistence unit: a page plus its conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub page: Page,
    #[serde(default)]
    pub transcript: Transcript,
    /// Number of successful saves. 0 means never saved.
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// A fresh project whose transcript starts with the greeting.
    pub fn new(name: impl Into<String>) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(Message::assistant(GREETING));
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            page: Page::new(),
            transcript,
            revision: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Summary row for project listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub fragments: usize,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            fragments: project.page.len(),
            revision: project.revision,
            updated_at: project.updated_at,
        }
    }
}

/// File-backed project store.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        // Ids come from URLs; refuse anything that could escape the directory
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::ProjectNotFound { id: id.to_string() });
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|p| p.exists())
    }

    pub fn load(&self, id: &str) -> Result<Project, StoreError> {
        let path = self.path_for(id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ProjectNotFound { id: id.to_string() });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Revision currently on disk, 0 when the project was never saved.
    fn stored_revision(&self, id: &str) -> Result<u64, StoreError> {
        match self.load(id) {
            Ok(project) => Ok(project.revision),
            Err(StoreError::ProjectNotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Save `project`, expecting the stored revision to equal
    /// `project.revision`. On success the revision and timestamp are bumped
    /// in place.
    ///
    /// Blocks while another writer, in this process or another, holds the
    /// project's lock file.
    pub fn save(&self, project: &mut Project) -> Result<(), StoreError> {
        let path = self.path_for(&project.id)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let _lock = self.lock_file(&project.id)?;

        let found = self.stored_revision(&project.id)?;
        if found != project.revision {
            tracing::warn!(
                project = %project.id,
                expected = project.revision,
                found,
                "refusing save over a newer revision"
            );
            return Err(StoreError::RevisionConflict {
                id: project.id.clone(),
                expected: project.revision,
                found,
            });
        }

        let mut next = project.clone();
        next.revision += 1;
        next.updated_at = Utc::now();
        let json = serde_json::to_string_pretty(&next)?;

        let tmp = self.dir.join(format!(".{}.json.tmp", project.id));
        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(project = %next.id, revision = next.revision, "saved project");
        *project = next;
        Ok(())
    }

    /// Exclusive advisory lock, released when the returned file is dropped.
    fn lock_file(&self, id: &str) -> Result<std::fs::File, StoreError> {
        let path = self.dir.join(format!(".{}.lock", id));
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_err)?;
        FileExt::lock_exclusive(&file).map_err(io_err)?;
        Ok(file)
    }

    /// All projects, most recently updated first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id) {
                Ok(project) => summaries.push(ProjectSummary::from(&project)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping project file"),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Create and persist a new project.
    pub fn create(&self, name: &str) -> Result<Project, StoreError> {
        let mut project = Project::new(name);
        self.save(&mut project)?;
        Ok(project)
    }
}
