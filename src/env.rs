use std::collections::BTreeMap;

use crate::model::ParsedEnv;

/// Key/value store that loaded entries are published into.
pub trait EnvStore {
    fn get(&self, key: &str) -> Option<String>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` under `key`. Returns `false` if the store cannot hold the
    /// pair.
    fn set(&mut self, key: &str, value: &str) -> bool;
}

/// The current process environment.
///
/// Writes go through [`std::env::set_var`], which mutates global process
/// state and is not thread-safe for concurrent environment access.
#[derive(Debug)]
pub struct ProcessEnv {
    _private: (),
}

impl ProcessEnv {
    /// Create a handle to the process environment.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment while this handle is used to write.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        if !is_portable_key(key) {
            return None;
        }
        std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
    }

    fn has(&self, key: &str) -> bool {
        is_portable_key(key) && std::env::var_os(key).is_some()
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        // set_var panics on these instead of reporting an error.
        if !is_portable_var(key, value) {
            tracing::warn!(key, "key or value cannot be stored in the process environment");
            return false;
        }
        // SAFETY: guaranteed by the caller of `ProcessEnv::new`.
        unsafe { std::env::set_var(key, value) };
        true
    }
}

/// Whether `key` can name a variable in a process environment: non-empty,
/// without `=` or NUL.
pub fn is_portable_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0'])
}

/// Whether `key=value` can be stored in a process environment, either ours
/// or a child's.
pub fn is_portable_var(key: &str, value: &str) -> bool {
    is_portable_key(key) && !value.contains('\0')
}

/// In-memory environment, used for tests and child-process environments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current process environment. Non-UTF-8 names and values
    /// are converted lossily.
    pub fn snapshot() -> Self {
        let vars = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self { vars }
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.vars
    }
}

impl From<BTreeMap<String, String>> for MemoryEnv {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn has(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        self.vars.insert(key.to_owned(), value.to_owned());
        true
    }
}

/// Write every entry of `env` into `store` unless the key is already present.
///
/// Returns `false` without touching `store` when `env` is empty, `true`
/// otherwise, however many entries were actually written.
pub fn publish<S: EnvStore + ?Sized>(env: &ParsedEnv, store: &mut S) -> bool {
    if env.is_empty() {
        return false;
    }

    let mut written = 0usize;
    let mut skipped_existing = 0usize;
    for entry in env {
        if store.has(&entry.key) {
            skipped_existing += 1;
            tracing::debug!(key = %entry.key, "skipping existing key");
            continue;
        }
        if store.set(&entry.key, &entry.value) {
            written += 1;
        }
    }

    tracing::debug!(
        considered = env.len(),
        written,
        skipped_existing,
        "published env entries"
    );
    true
}
