//! Persistence façade: self-describing records, a content factory for
//! reconstituting live objects against a bus, and a storage backend
//! abstraction. See `SPEC_FULL.md` §4.12.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::combat::conditions::Ref;
use crate::error::{EngineError, EngineResult};

/// A concrete attribute value in a persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A self-describing persisted node: a stable `Ref`, its attributes, and
/// nested children (e.g. a character record's attached conditions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(rename = "ref")]
    pub reference: Ref,
    pub attrs: HashMap<String, PropertyValue>,
    pub children: Vec<PersistedRecord>,
}

impl PersistedRecord {
    #[must_use]
    pub fn new(reference: Ref) -> Self {
        Self {
            reference,
            attrs: HashMap::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: PersistedRecord) -> Self {
        self.children.push(child);
        self
    }
}

/// Reconstitutes a live, `Ref`-identified object from its persisted record
/// and subscribes it to the supplied bus. Implemented per condition/
/// resource kind by the content that registers it; out of scope here.
pub trait ContentFactory: Send + Sync + fmt::Debug {
    /// The `Ref.kind` this factory reconstitutes.
    fn kind(&self) -> &str;

    /// Validate that `record` is well-formed for this factory without
    /// constructing anything. Used by `LoadFromData` to fail fast.
    fn validate(&self, record: &PersistedRecord) -> EngineResult<()>;
}

/// Byte-level storage backend, mirroring this lineage's own storage-provider
/// abstraction. Object-safe, `Send + Sync`.
pub trait Storage: Send + Sync + fmt::Debug {
    fn save(&self, name: &str, record: &PersistedRecord) -> EngineResult<()>;
    fn load(&self, name: &str) -> EngineResult<PersistedRecord>;
    fn delete(&self, name: &str) -> EngineResult<()>;
    fn list(&self) -> EngineResult<Vec<String>>;
}

/// Default provider: reads/writes RON files under a configurable base
/// directory.
#[derive(Debug)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.ron"))
    }
}

impl Storage for FileStorage {
    fn save(&self, name: &str, record: &PersistedRecord) -> EngineResult<()> {
        fs::create_dir_all(&self.base_dir)?;
        let text = ron::ser::to_string_pretty(record, ron::ser::PrettyConfig::default())?;
        fs::write(self.path_for(name), text)?;
        Ok(())
    }

    fn load(&self, name: &str) -> EngineResult<PersistedRecord> {
        let text = fs::read_to_string(self.path_for(name))
            .map_err(|e| EngineError::not_found(format!("no saved record '{name}'")).with_meta("source", e.to_string()))?;
        Ok(ron::from_str(&text)?)
    }

    fn delete(&self, name: &str) -> EngineResult<()> {
        fs::remove_file(self.path_for(name))
            .map_err(|e| EngineError::not_found(format!("no saved record '{name}'")).with_meta("source", e.to_string()))
    }

    fn list(&self) -> EngineResult<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("ron") {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory provider backing tests, avoiding filesystem dependence.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: std::sync::Mutex<HashMap<String, PersistedRecord>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn save(&self, name: &str, record: &PersistedRecord) -> EngineResult<()> {
        self.records.lock().unwrap().insert(name.to_string(), record.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> EngineResult<PersistedRecord> {
        self.records
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("no saved record '{name}'")))
    }

    fn delete(&self, name: &str) -> EngineResult<()> {
        self.records
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(format!("no saved record '{name}'")))
    }

    fn list(&self) -> EngineResult<Vec<String>> {
        let mut names: Vec<String> = self.records.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// `SaveCharacter`: persist `record` (already walked from a combatant's
/// attached conditions/recoverable resources by the caller) under `name`.
pub fn save_character(storage: &dyn Storage, name: &str, record: &PersistedRecord) -> EngineResult<()> {
    storage.save(name, record)
}

/// `LoadCharacter`: retrieve the persisted record for `name`.
pub fn load_character(storage: &dyn Storage, name: &str) -> EngineResult<PersistedRecord> {
    storage.load(name)
}

/// `LoadFromData`: validate `record` and every child against the matching
/// registered factory (keyed by `record.reference.kind`), by construction
/// failing fast on any record with no matching factory.
pub fn load_from_data(record: &PersistedRecord, factories: &[&dyn ContentFactory]) -> EngineResult<()> {
    let factory = factories
        .iter()
        .find(|f| f.kind() == record.reference.kind)
        .ok_or_else(|| EngineError::not_found(format!("no content factory for kind '{}'", record.reference.kind)))?;
    factory.validate(record)?;
    for child in &record.children {
        load_from_data(child, factories)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PersistedRecord {
        PersistedRecord::new(Ref::new("dnd5e", "characters", "hero"))
            .with_attr("hp", PropertyValue::Int(20))
            .with_child(
                PersistedRecord::new(Ref::new("dnd5e", "conditions", "rage")).with_attr(
                    "rounds_remaining",
                    PropertyValue::Int(3),
                ),
            )
    }

    #[test]
    fn in_memory_storage_round_trips_a_record() {
        let storage = InMemoryStorage::new();
        let record = sample_record();
        save_character(&storage, "hero", &record).unwrap();
        let loaded = load_character(&storage, "hero").unwrap();
        assert_eq!(loaded.reference, record.reference);
        assert_eq!(loaded.children.len(), 1);
    }

    #[test]
    fn loading_an_absent_record_fails() {
        let storage = InMemoryStorage::new();
        assert!(load_character(&storage, "ghost").is_err());
    }

    #[test]
    fn file_storage_round_trips_through_a_temp_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let record = sample_record();
        save_character(&storage, "hero", &record).unwrap();
        let loaded = load_character(&storage, "hero").unwrap();
        assert_eq!(loaded.reference, record.reference);
        assert_eq!(loaded.attrs.get("hp"), Some(&PropertyValue::Int(20)));
    }

    #[test]
    fn file_storage_list_reflects_saved_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        save_character(&storage, "hero", &sample_record()).unwrap();
        save_character(&storage, "villain", &sample_record()).unwrap();
        assert_eq!(storage.list().unwrap(), vec!["hero".to_string(), "villain".to_string()]);
    }

    #[derive(Debug)]
    struct CharacterFactory;
    impl ContentFactory for CharacterFactory {
        fn kind(&self) -> &str {
            "characters"
        }
        fn validate(&self, record: &PersistedRecord) -> EngineResult<()> {
            if !record.attrs.contains_key("hp") {
                return Err(EngineError::invalid_argument("character record missing 'hp'"));
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct ConditionFactory;
    impl ContentFactory for ConditionFactory {
        fn kind(&self) -> &str {
            "conditions"
        }
        fn validate(&self, _record: &PersistedRecord) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn load_from_data_validates_record_and_children() {
        let factories: Vec<&dyn ContentFactory> = vec![&CharacterFactory, &ConditionFactory];
        assert!(load_from_data(&sample_record(), &factories).is_ok());
    }

    #[test]
    fn load_from_data_fails_without_a_matching_factory() {
        let factories: Vec<&dyn ContentFactory> = vec![&ConditionFactory];
        assert!(load_from_data(&sample_record(), &factories).is_err());
    }
}
