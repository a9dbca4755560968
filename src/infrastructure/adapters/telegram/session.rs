//! Session file - remembers the update offset across restarts

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::BotError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionState {
    offset: i64,
}

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last saved offset; 0 when the file is missing or unreadable
    pub fn load_offset(&self) -> i64 {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!("Failed to read session {}: {}", self.path.display(), e);
                return 0;
            }
        };

        match serde_json::from_str::<SessionState>(&content) {
            Ok(state) => state.offset,
            Err(e) => {
                tracing::warn!("Ignoring corrupt session {}: {}", self.path.display(), e);
                0
            }
        }
    }

    pub fn save_offset(&self, offset: i64) -> Result<(), BotError> {
        let content = serde_json::to_string(&SessionState { offset })
            .map_err(|e| BotError::Internal(e.to_string()))?;

        // Readers only ever see a complete file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("none.session"));
        assert_eq!(session.load_offset(), 0);
    }

    #[test]
    fn saves_and_loads_offset() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("bot.session"));

        session.save_offset(1234).unwrap();
        assert_eq!(session.load_offset(), 1234);

        session.save_offset(1240).unwrap();
        assert_eq!(SessionFile::new(session.path()).load_offset(), 1240);
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.session");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(SessionFile::new(&path).load_offset(), 0);
    }
}
