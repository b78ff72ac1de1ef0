//! Store Module - Flat-file JSON persistence for patient records
//!
//! The whole registry lives in one JSON object keyed by patient id. Every
//! call reads the file fresh; writes replace it through a temp file and a
//! rename, and are serialized by a single-writer lock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::healthcare::Patient;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt store file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Patient records in insertion order. Lookups are linear scans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    entries: Vec<(String, Patient)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.position(id).map(|i| &self.entries[i].1)
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn upsert(&mut self, id: String, patient: Patient) {
        match self.position(&id) {
            Some(i) => self.entries[i].1 = patient,
            None => self.entries.push((id, patient)),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Patient> {
        self.position(id).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Patient)> {
        self.entries.iter().map(|(id, p)| (id.as_str(), p))
    }

    /// Entries ordered by `field`. The sort is stable: ties keep store order
    /// in both directions.
    pub fn sorted_by(&self, field: SortField, order: SortOrder) -> Vec<(&str, &Patient)> {
        let mut sorted: Vec<(&str, &Patient)> = self.iter().collect();
        sorted.sort_by(|a, b| {
            let (ka, kb) = (field.key(a.1), field.key(b.1));
            match order {
                SortOrder::Asc => ka.total_cmp(&kb),
                SortOrder::Desc => kb.total_cmp(&ka),
            }
        });
        sorted
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == id)
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, patient) in &self.entries {
            map.serialize_entry(id, patient)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = Registry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of patient records keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Registry, A::Error> {
                let mut registry = Registry::new();
                while let Some((id, patient)) = access.next_entry::<String, Patient>()? {
                    registry.upsert(id, patient);
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

/// Numeric field a listing can be ordered by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Age,
    Height,
    Weight,
    Bmi,
}

impl SortField {
    pub const NAMES: [&'static str; 4] = ["age", "height", "weight", "bmi"];

    /// Sort key for a record. Non-finite values sort as 0, matching the
    /// historical "missing field counts as zero" rule.
    pub fn key(self, patient: &Patient) -> f64 {
        let value = match self {
            SortField::Age => f64::from(patient.age),
            SortField::Height => patient.height,
            SortField::Weight => patient.weight,
            SortField::Bmi => patient.bmi(),
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age" => Ok(SortField::Age),
            "height" => Ok(SortField::Height),
            "weight" => Ok(SortField::Weight),
            "bmi" => Ok(SortField::Bmi),
            _ => {
                let names: Vec<String> = Self::NAMES.iter().map(|n| format!("'{}'", n)).collect();
                Err(format!("Invalid field. Choose from [{}]", names.join(", ")))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err("Order must be asc or desc".to_string()),
        }
    }
}

/// File-backed patient store
pub struct PatientStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PatientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole registry. A missing file is an empty registry.
    pub async fn load(&self) -> Result<Registry, StoreError> {
        if !fs::try_exists(&self.path).await.map_err(|e| self.io_error(e))? {
            return Ok(Registry::new());
        }
        let data = fs::read_to_string(&self.path).await.map_err(|e| self.io_error(e))?;
        serde_json::from_str(&data).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `registry`, pretty-printed.
    pub async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }

        let data = serde_json::to_string_pretty(registry).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let temp_file = self.path.with_extension("tmp");
        fs::write(&temp_file, data).await.map_err(|e| self.io_error(e))?;
        fs::rename(&temp_file, &self.path).await.map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), records = registry.len(), "Saved patient store");
        Ok(())
    }

    /// Load, apply `f`, and save, all under the write lock. Nothing is saved
    /// when `f` fails.
    pub async fn modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Registry) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load().await?;
        let out = f(&mut registry)?;
        self.save(&registry).await?;
        Ok(out)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healthcare::Gender;

    fn patient(age: u32, height: f64, weight: f64) -> Patient {
        Patient {
            name: "Test".to_string(),
            city: "Pune".to_string(),
            age,
            gender: Gender::Others,
            height,
            weight,
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatientStore::new(dir.path().join("patients.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_order_and_strips_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatientStore::new(dir.path().join("nested/patients.json"));

        let mut registry = Registry::new();
        registry.upsert("P002".to_string(), patient(40, 1.7, 70.0));
        registry.upsert("P001".to_string(), patient(30, 1.6, 50.0));
        store.save(&registry).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw["P001"].get("id").is_none());
        assert!(raw["P001"].get("bmi").is_none());
        assert!(!store.path().with_extension("tmp").exists());

        let loaded = store.load().await.unwrap();
        let ids: Vec<&str> = loaded.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["P002", "P001"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = PatientStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_failed_modify_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatientStore::new(dir.path().join("patients.json"));

        let result: Result<(), StoreError> = store
            .modify(|registry| {
                registry.upsert("P001".to_string(), patient(30, 1.6, 50.0));
                Ok(())
            })
            .await;
        result.unwrap();

        #[derive(Debug)]
        struct Rejected;
        impl From<StoreError> for Rejected {
            fn from(_: StoreError) -> Self {
                Rejected
            }
        }

        let result: Result<(), Rejected> = store
            .modify(|registry| {
                registry.remove("P001");
                Err(Rejected)
            })
            .await;
        assert!(result.is_err());
        assert!(store.load().await.unwrap().contains("P001"));
    }

    #[test]
    fn test_sort_is_stable_both_ways() {
        let mut registry = Registry::new();
        registry.upsert("a".to_string(), patient(30, 1.6, 50.0));
        registry.upsert("b".to_string(), patient(20, 1.6, 50.0));
        registry.upsert("c".to_string(), patient(30, 1.6, 50.0));

        let asc: Vec<&str> = registry.sorted_by(SortField::Age, SortOrder::Asc)
            .into_iter().map(|(id, _)| id).collect();
        assert_eq!(asc, vec!["b", "a", "c"]);

        let desc: Vec<&str> = registry.sorted_by(SortField::Age, SortOrder::Desc)
            .into_iter().map(|(id, _)| id).collect();
        assert_eq!(desc, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_by_bmi_reverses() {
        let mut registry = Registry::new();
        registry.upsert("lean".to_string(), patient(30, 1.8, 55.0));
        registry.upsert("heavy".to_string(), patient(30, 1.6, 90.0));
        registry.upsert("mid".to_string(), patient(30, 1.7, 70.0));

        let asc: Vec<&str> = registry.sorted_by(SortField::Bmi, SortOrder::Asc)
            .into_iter().map(|(id, _)| id).collect();
        let mut desc: Vec<&str> = registry.sorted_by(SortField::Bmi, SortOrder::Desc)
            .into_iter().map(|(id, _)| id).collect();
        desc.reverse();
        assert_eq!(asc, desc);
        assert_eq!(asc, vec!["lean", "mid", "heavy"]);
    }

    #[test]
    fn test_parse_sort_params() {
        assert_eq!("bmi".parse::<SortField>(), Ok(SortField::Bmi));
        assert_eq!(
            "name".parse::<SortField>(),
            Err("Invalid field. Choose from ['age', 'height', 'weight', 'bmi']".to_string())
        );
        assert_eq!("desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("down".parse::<SortOrder>().is_err());
    }
}
