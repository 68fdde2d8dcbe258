//! Flag store persisted as a TOML table of booleans.

use std::{collections::BTreeMap, fs, io::ErrorKind, path::PathBuf};

use spell_arena_core::{FlagStore, FlagStoreError};

/// Keeps persisted flags in a TOML file, re-reading it on every access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TomlFlagStore {
    path: PathBuf,
}

impl TomlFlagStore {
    /// Uses `path` as backing storage; the file is created on the first write.
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<BTreeMap<String, bool>, FlagStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(unavailable(&self.path, error)),
        };
        toml::from_str(&text).map_err(|error| unavailable(&self.path, error))
    }
}

impl FlagStore for TomlFlagStore {
    fn read_flag(&self, key: &str) -> Result<bool, FlagStoreError> {
        Ok(self.load()?.get(key).copied().unwrap_or(false))
    }

    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), FlagStoreError> {
        let mut flags = self.load()?;
        let _ = flags.insert(key.to_owned(), value);
        let text = toml::to_string(&flags).map_err(|error| unavailable(&self.path, error))?;
        fs::write(&self.path, text).map_err(|error| unavailable(&self.path, error))
    }
}

fn unavailable(path: &std::path::Path, error: impl std::fmt::Display) -> FlagStoreError {
    FlagStoreError::Unavailable(format!("{}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_arena_core::HARD_MODE_COMPLETED_FLAG;

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "spell-arena-flags-{}-{name}.toml",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_reads_as_unset() {
        let store = TomlFlagStore::new(scratch_file("missing"));

        assert!(!store
            .read_flag(HARD_MODE_COMPLETED_FLAG)
            .expect("absent files are empty"));
    }

    #[test]
    fn written_flags_survive_a_new_store() {
        let path = scratch_file("persist");
        let mut store = TomlFlagStore::new(path.clone());
        store
            .write_flag(HARD_MODE_COMPLETED_FLAG, true)
            .expect("temp dir is writable");

        let reopened = TomlFlagStore::new(path.clone());
        assert!(reopened
            .read_flag(HARD_MODE_COMPLETED_FLAG)
            .expect("file was just written"));
        assert!(!reopened.read_flag("other").expect("file was just written"));

        let text = fs::read_to_string(&path).expect("file was just written");
        assert!(text.contains("hard_mode_completed = true"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_file_is_reported() {
        let path = scratch_file("malformed");
        fs::write(&path, "hard_mode_completed = \"yes\"").expect("temp dir is writable");

        let store = TomlFlagStore::new(path.clone());
        assert!(matches!(
            store.read_flag(HARD_MODE_COMPLETED_FLAG),
            Err(FlagStoreError::Unavailable(_))
        ));
        let _ = fs::remove_file(path);
    }
}
