use std::collections::{BTreeMap, HashMap};

/// A parsed `KEY=VALUE` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// 1-based line of the occurrence that supplied `value`.
    pub line: u32,
}

/// Ordered key/value mapping produced by the parser.
///
/// Iteration follows first-seen order. Re-inserting a key replaces its value
/// in place rather than moving it to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEnv {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
}

impl ParsedEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, entry: Entry) {
        if let Some(existing_idx) = self.by_key.get(&entry.key).copied() {
            self.entries[existing_idx] = entry;
        } else {
            self.by_key.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|entry| entry.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.by_key.get(key).map(|idx| &self.entries[*idx])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Snapshot as a sorted map, dropping line information.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}

impl IntoIterator for ParsedEnv {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParsedEnv {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
