use std::collections::HashMap;

/// An insertion-ordered map from string keys to values.
///
/// This is the storage behind [`StructureStack`](crate::core::stack::StructureStack)
/// and the result type of every bulk operation, so that iteration over a stack
/// and over anything computed from it always follows the same key order.
#[derive(Debug, Clone)]
pub struct KeyedMap<V> {
    order: Vec<String>,
    values: HashMap<String, V>,
}

impl<V> Default for KeyedMap<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<V> KeyedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            values: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.values.get_mut(key)
    }

    /// Inserts a value, returning the previous value for the key if any.
    ///
    /// A new key is appended to the end of the order; replacing an existing
    /// key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.values.insert(key.clone(), value) {
            Some(previous) => Some(previous),
            None => {
                self.order.push(key);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.values.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    /// Moves the value stored under `old` to `new` in place.
    ///
    /// Returns `false` without touching the map if `old` is absent or `new`
    /// is already taken by a different key.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.contains_key(old);
        }
        if self.contains_key(new) {
            return false;
        }
        let Some(value) = self.values.remove(old) else {
            return false;
        };
        if let Some(slot) = self.order.iter_mut().find(|k| k.as_str() == old) {
            *slot = new.to_string();
        }
        self.values.insert(new.to_string(), value);
        true
    }

    pub fn first_key(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().map(move |k| &self.values[k])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order.iter().map(move |k| (k.as_str(), &self.values[k]))
    }
}

impl<V> FromIterator<(String, V)> for KeyedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = KeyedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for KeyedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(mut self) -> Self::IntoIter {
        let mut pairs = Vec::with_capacity(self.order.len());
        for key in self.order.drain(..) {
            if let Some(value) = self.values.remove(&key) {
                pairs.push((key, value));
            }
        }
        pairs.into_iter()
    }
}

/// Equality compares both the entries and their order.
impl<V: PartialEq> PartialEq for KeyedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.values == other.values
    }
}
