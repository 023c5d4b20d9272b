use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A uniquely named output directory bound to one processing run.
#[derive(Debug, Clone)]
pub struct Session {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of one retention sweep. A failed deletion does not abort the
/// sweep; the remaining stale sessions are still attempted.
#[derive(Debug, Default)]
pub struct RetentionSweep {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

/// Allocates session directories under one base directory and prunes old
/// ones on request. Retention is never invoked implicitly by `create`.
#[derive(Debug, Clone)]
pub struct SessionManager {
    base_dir: PathBuf,
}

impl SessionManager {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Creates `{stem}_{YYYYMMDD_HHMMSS}` under the base directory. Two
    /// runs on the same source within one second must not silently merge,
    /// so a name collision is retried exactly once at millisecond
    /// resolution before failing.
    pub fn create(&self, source: &Path) -> Result<Session, SessionError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| SessionError::io(&self.base_dir, e))?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let now = Local::now();

        let name = format!("{stem}_{}", now.format("%Y%m%d_%H%M%S"));
        match self.try_create(&name) {
            Ok(session) => return Ok(session),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(SessionError::io(self.base_dir.join(&name), e)),
        }

        let fine = format!("{stem}_{}", now.format("%Y%m%d_%H%M%S_%3f"));
        self.try_create(&fine)
            .map_err(|e| SessionError::io(self.base_dir.join(&fine), e))
    }

    fn try_create(&self, name: &str) -> io::Result<Session> {
        let path = self.base_dir.join(name);
        fs::create_dir(&path)?;
        Ok(Session {
            name: name.to_string(),
            path,
        })
    }

    /// Existing session directories, most recently modified first.
    pub fn list(&self) -> Result<Vec<SessionEntry>, SessionError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.base_dir).map_err(|e| SessionError::io(&self.base_dir, e))?;
        for entry in dir {
            let entry = entry.map_err(|e| SessionError::io(&self.base_dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| SessionError::io(&path, e))?;
            entries.push(SessionEntry { path, modified });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Deletes every session beyond the `keep` most recently modified,
    /// oldest first. Individual failures are collected and reported, not
    /// fatal.
    pub fn enforce_retention(&self, keep: usize) -> Result<RetentionSweep, SessionError> {
        let entries = self.list()?;
        let mut sweep = RetentionSweep::default();

        let stale: Vec<&SessionEntry> = entries.iter().skip(keep).collect();
        for entry in stale.iter().rev() {
            match fs::remove_dir_all(&entry.path) {
                Ok(()) => sweep.deleted.push(entry.path.clone()),
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "failed to delete stale session");
                    sweep.failed.push((entry.path.clone(), e));
                }
            }
        }

        Ok(sweep)
    }
}
