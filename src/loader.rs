use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::env::{EnvStore, ProcessEnv, publish};
use crate::error::Error;
use crate::model::ParsedEnv;
use crate::parser::parse_str;

/// File name used when no explicit path is given.
pub const DEFAULT_FILE: &str = ".env";

/// Load `.env` from the current working directory into the process
/// environment. Variables that are already set are left untouched.
///
/// # Safety
///
/// The caller must ensure no other threads concurrently read or write the
/// process environment.
pub unsafe fn dotenv() -> Result<(), Error> {
    let loader = DotEnv::default();
    unsafe { loader.set_as_environment_variables() }?;
    Ok(())
}

/// Load an env file into the process environment.
///
/// An empty path or `.` means `.env` in the current working directory.
///
/// # Safety
///
/// Same contract as [`dotenv`].
pub unsafe fn from_path(path: impl AsRef<Path>) -> Result<(), Error> {
    let loader = DotEnv::new(path);
    unsafe { loader.set_as_environment_variables() }?;
    Ok(())
}

/// Load an env file into `store` instead of the process environment.
pub fn from_path_into<S: EnvStore + ?Sized>(
    path: impl AsRef<Path>,
    store: &mut S,
) -> Result<bool, Error> {
    DotEnv::new(path).publish_to(store)
}

/// Resolve the file to read. `None`, an empty path and `.` all mean `.env`
/// in the current working directory; any other path is used as given.
pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf, Error> {
    match path {
        Some(path) if !path.as_os_str().is_empty() && path != Path::new(".") => {
            Ok(path.to_path_buf())
        }
        _ => Ok(std::env::current_dir()?.join(DEFAULT_FILE)),
    }
}

/// Read the whole file as UTF-8 text.
pub fn read_env_file(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(err),
    })?;
    let text = String::from_utf8(bytes).map_err(|err| err.utf8_error())?;
    Ok(text)
}

/// A single env file, read and parsed on first access.
///
/// The parsed mapping is cached for the lifetime of the instance. A failed
/// read is not cached, so a later call tries again.
#[derive(Debug, Clone, Default)]
pub struct DotEnv {
    path: Option<PathBuf>,
    parsed: OnceLock<ParsedEnv>,
}

impl DotEnv {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            parsed: OnceLock::new(),
        }
    }

    /// The path as requested, before resolution.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn resolved_path(&self) -> Result<PathBuf, Error> {
        resolve_path(self.path())
    }

    pub fn parsed(&self) -> Result<&ParsedEnv, Error> {
        if let Some(parsed) = self.parsed.get() {
            return Ok(parsed);
        }

        let path = self.resolved_path()?;
        let content = read_env_file(&path)?;
        let parsed = parse_str(&content);
        tracing::debug!(path = %path.display(), entries = parsed.len(), "parsed env file");

        Ok(self.parsed.get_or_init(|| parsed))
    }

    /// Look up a parsed value. Does not consult or modify any environment.
    pub fn get(&self, key: &str) -> Result<Option<&str>, Error> {
        Ok(self.parsed()?.get(key))
    }

    /// Publish the parsed entries into `store`, keeping values it already has.
    pub fn publish_to<S: EnvStore + ?Sized>(&self, store: &mut S) -> Result<bool, Error> {
        let parsed = self.parsed()?;
        Ok(publish(parsed, store))
    }

    /// Publish the parsed entries into the process environment.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment.
    pub unsafe fn set_as_environment_variables(&self) -> Result<bool, Error> {
        let mut store = unsafe { ProcessEnv::new() };
        self.publish_to(&mut store)
    }
}
