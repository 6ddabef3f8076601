use super::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Trait for types that can be persisted in a JsonStore.
pub trait Storable: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

/// One pretty-printed JSON file per record, named `<id>.json`.
pub struct JsonStore<T> {
    dir: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T: Storable> JsonStore<T> {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            _phantom: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `id`. Rejects ids that are not plain file names.
    fn file_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    pub fn save(&self, data: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_path(data.id())?;
        let json = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load a record by id. Returns None if not found.
    pub fn load(&self, id: &str) -> Result<Option<T>, StoreError> {
        let path = self.file_path(id)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Load every record, skipping files that cannot be read or parsed.
    pub fn load_all(&self) -> Result<Vec<T>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut items = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|contents| serde_json::from_str::<T>(&contents).map_err(StoreError::from));
            match parsed {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Skipping unreadable record {:?}: {}", path, e),
            }
        }

        Ok(items)
    }

    /// Delete a record by id. Deleting a missing record is not an error.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.file_path(id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Storable for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, text: &str) -> Note {
        Note {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().join("notes"));

        assert_eq!(store.load("a").unwrap(), None);
        store.save(&note("a", "first")).unwrap();
        store.save(&note("a", "second")).unwrap();
        assert_eq!(store.load("a").unwrap(), Some(note("a", "second")));

        store.delete("a").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
    }

    #[test]
    fn test_load_all_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().to_path_buf());
        store.save(&note("a", "ok")).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all, vec![note("a", "ok")]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().join("nope"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.save(&note("../escape", "x")),
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(store.load(""), Err(StoreError::InvalidId(_))));
        assert_eq!(store.dir(), dir.path());
    }
}
