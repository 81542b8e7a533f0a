use super::io::loader::{LoadError, StructureLoader, StructureSource};
use super::keyed::KeyedMap;
use super::models::structure::StructureRecord;
use std::error::Error;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

type BoxedError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Key '{0}' is already present in the stack")]
    DuplicateKey(String),
    #[error("Cannot rename to '{0}': the key is already taken")]
    KeyCollision(String),
    #[error("Key '{0}' not found in the stack")]
    NotFound(String),
    #[error("Failed to load '{source_name}': {source}")]
    Load {
        source_name: String,
        #[source]
        source: LoadError,
    },
    #[error("Filter failed on entry '{key}': {source}")]
    Filter {
        key: String,
        #[source]
        source: BoxedError,
    },
    #[error("Calculation failed on entry '{key}': {source}")]
    Calculation {
        key: String,
        #[source]
        source: BoxedError,
    },
}

/// An ordered, keyed collection of structures.
///
/// Every key maps to exactly one [`StructureRecord`], and iteration follows
/// insertion order. Bulk operations never mutate the stack they run over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureStack {
    entries: KeyedMap<StructureRecord>,
}

impl StructureStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `source` and stores it under `key`, or under the source's default key.
    ///
    /// The key is checked before the loader runs, so a duplicate never
    /// triggers a load.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DuplicateKey`] if the key is taken and
    /// [`StackError::Load`] if the loader fails.
    pub fn add(
        &mut self,
        loader: &impl StructureLoader,
        source: &StructureSource,
        key: Option<&str>,
    ) -> Result<String, StackError> {
        let key = key.map_or_else(|| source.default_key(), str::to_string);
        if self.entries.contains_key(&key) {
            return Err(StackError::DuplicateKey(key));
        }
        let record = loader.load(source).map_err(|source_err| StackError::Load {
            source_name: source.to_string(),
            source: source_err,
        })?;
        debug!(%key, atoms = record.atom_count(), "Added structure to stack.");
        self.entries.insert(key.clone(), record);
        Ok(key)
    }

    /// Adds every source in order under its default key, stopping at the first failure.
    ///
    /// Entries added before the failure stay in the stack.
    pub fn add_all<'s>(
        &mut self,
        loader: &impl StructureLoader,
        sources: impl IntoIterator<Item = &'s StructureSource>,
    ) -> Result<Vec<String>, StackError> {
        sources
            .into_iter()
            .map(|source| self.add(loader, source, None))
            .collect()
    }

    /// Stores an already loaded record.
    pub fn insert(&mut self, key: impl Into<String>, record: StructureRecord) -> Result<(), StackError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(StackError::DuplicateKey(key));
        }
        self.entries.insert(key, record);
        Ok(())
    }

    /// Removes `key`, returning its record. Removing an absent key does nothing.
    pub fn delete(&mut self, key: &str) -> Option<StructureRecord> {
        self.entries.remove(key)
    }

    /// Renames `old_key` to `new_key`, keeping the record and its position.
    ///
    /// Renaming a key to itself is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `old_key` is absent and
    /// [`StackError::KeyCollision`] if `new_key` already names another entry.
    pub fn update(&mut self, old_key: &str, new_key: &str) -> Result<(), StackError> {
        if !self.entries.contains_key(old_key) {
            return Err(StackError::NotFound(old_key.to_string()));
        }
        if old_key == new_key {
            return Ok(());
        }
        if self.entries.contains_key(new_key) {
            return Err(StackError::KeyCollision(new_key.to_string()));
        }
        self.entries.rename(old_key, new_key);
        Ok(())
    }

    /// Builds a new stack by running `filter` on every entry.
    ///
    /// The filter signals null by returning `Ok(None)` or a record whose `ATOM`
    /// section is empty. Null entries keep their original record when
    /// `keep_null` is set and are left out otherwise.
    ///
    /// # Errors
    ///
    /// The first filter error aborts the operation as [`StackError::Filter`]
    /// naming the entry; no partial stack is returned.
    pub fn apply_filter<F, E>(&self, filter: F, keep_null: bool) -> Result<StructureStack, StackError>
    where
        F: Fn(&str, &StructureRecord) -> Result<Option<StructureRecord>, E>,
        E: Error + Send + Sync + 'static,
    {
        let mut filtered = StructureStack::new();
        let mut nulls = 0usize;

        for (key, record) in self.entries.iter() {
            let outcome = filter(key, record).map_err(|e| StackError::Filter {
                key: key.to_string(),
                source: Box::new(e),
            })?;
            match outcome {
                Some(narrowed) if !narrowed.atoms().is_empty() => {
                    filtered.entries.insert(key, narrowed);
                }
                _ => {
                    nulls += 1;
                    if keep_null {
                        filtered.entries.insert(key, record.clone());
                    }
                }
            }
        }

        info!(
            entries = self.len(),
            nulls,
            kept = filtered.len(),
            "Filter applied to stack."
        );
        Ok(filtered)
    }

    /// Computes a value for every entry, keyed like the stack.
    ///
    /// With the `parallel` feature, entries are processed on the rayon pool;
    /// the result still follows stack order.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Calculation`] naming an entry whose calculation failed.
    pub fn apply_calculation<F, T, E>(&self, calculation: F) -> Result<KeyedMap<T>, StackError>
    where
        F: Fn(&str, &StructureRecord) -> Result<T, E> + Sync,
        T: Send,
        E: Error + Send + Sync + 'static,
    {
        let run = |(key, record): (&str, &StructureRecord)| {
            calculation(key, record)
                .map(|value| (key.to_string(), value))
                .map_err(|e| StackError::Calculation {
                    key: key.to_string(),
                    source: Box::new(e),
                })
        };

        #[cfg(not(feature = "parallel"))]
        let results: Result<Vec<(String, T)>, StackError> = self.entries.iter().map(run).collect();

        #[cfg(feature = "parallel")]
        let results: Result<Vec<(String, T)>, StackError> = {
            let entries: Vec<(&str, &StructureRecord)> = self.entries.iter().collect();
            entries.into_par_iter().map(run).collect()
        };

        Ok(results?.into_iter().collect())
    }

    pub fn get(&self, key: &str) -> Option<&StructureRecord> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StructureRecord> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first_key()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructureRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, StructureRecord)> for StructureStack {
    fn from_iter<I: IntoIterator<Item = (String, StructureRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StructureStack {
    type Item = (String, StructureRecord);
    type IntoIter = std::vec::IntoIter<(String, StructureRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
