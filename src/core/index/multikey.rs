use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::core::error::{M3Error, M3Result};

/// An ordered tuple of equivalent keys that together identify one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultiKey<K>(Vec<K>);

impl<K> MultiKey<K> {
    pub fn new(keys: Vec<K>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[K] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The nth key of the tuple, if the tuple is long enough.
    pub fn nth(&self, index: usize) -> Option<&K> {
        self.0.get(index)
    }
}

impl<K: fmt::Display> fmt::Display for MultiKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}")?;
        }
        write!(f, ")")
    }
}

/// Associative collection where each record is addressed by a fixed number
/// of equivalent keys.
///
/// A record is added with its complete multikey; afterwards any single key
/// of that tuple finds it. No individual key may belong to two records at
/// once, and adding or removing a record links or unlinks all of its keys
/// together.
#[derive(Debug, Clone)]
pub struct MultiKeyIndex<K, V>
where
    K: Hash + Eq,
{
    arity: usize,
    key_to_multikey: HashMap<K, MultiKey<K>>,
    records: HashMap<MultiKey<K>, V>,
}

impl<K, V> MultiKeyIndex<K, V>
where
    K: Hash + Eq + Clone + fmt::Display,
{
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            key_to_multikey: HashMap::new(),
            records: HashMap::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_arity(&self, multikey: &MultiKey<K>) -> M3Result<()> {
        if multikey.len() != self.arity {
            return Err(M3Error::KeyArity {
                expected: self.arity,
                actual: multikey.len(),
            });
        }
        Ok(())
    }

    /// Link every key of `multikey` to `value`.
    ///
    /// Fails without touching the index if any key already belongs to a
    /// record, or appears twice in the tuple.
    pub fn add(&mut self, multikey: MultiKey<K>, value: V) -> M3Result<()> {
        self.check_arity(&multikey)?;

        let mut seen = HashSet::with_capacity(multikey.len());
        for key in multikey.keys() {
            if self.key_to_multikey.contains_key(key) || !seen.insert(key) {
                return Err(M3Error::DuplicateKey(key.to_string()));
            }
        }

        for key in multikey.keys() {
            self.key_to_multikey.insert(key.clone(), multikey.clone());
        }
        self.records.insert(multikey, value);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.key_to_multikey
            .get(key)
            .and_then(|multikey| self.records.get(multikey))
    }

    pub fn get_by_multikey(&self, multikey: &MultiKey<K>) -> Option<&V> {
        self.records.get(multikey)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.key_to_multikey.contains_key(key)
    }

    /// Unlink all keys of `multikey` and return its record.
    pub fn remove(&mut self, multikey: &MultiKey<K>) -> M3Result<V> {
        self.check_arity(multikey)?;
        let value = self
            .records
            .remove(multikey)
            .ok_or_else(|| M3Error::MultiKeyNotFound(multikey.to_string()))?;
        for key in multikey.keys() {
            self.key_to_multikey.remove(key);
        }
        Ok(value)
    }

    /// Multikeys present here but absent (by full-tuple equality) from `other`.
    pub fn difference<W>(&self, other: &MultiKeyIndex<K, W>) -> HashSet<MultiKey<K>> {
        self.records
            .keys()
            .filter(|multikey| !other.records.contains_key(*multikey))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MultiKey<K>, &V)> {
        self.records.iter()
    }
}
