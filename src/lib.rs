//! Parse `.env` files and load them into an environment.
//!
//! [`parse_str`] turns text into an ordered [`ParsedEnv`]. It never fails:
//! blank lines, `#` comments and lines without `=` are skipped.
//!
//! [`DotEnv`] reads a file lazily and caches the result. Publishing writes
//! each entry into an [`EnvStore`] unless the key is already present, so
//! variables set by the operator always win over the file.
//!
//! Loaders that write to the process environment (`dotenv`, `from_path`,
//! [`DotEnv::set_as_environment_variables`]) are `unsafe`, because callers
//! must guarantee no concurrent process-environment access. Publishing is
//! not atomic across keys.

mod env;
mod error;
mod loader;
mod model;
mod parser;

pub use env::{EnvStore, MemoryEnv, ProcessEnv, is_portable_key, is_portable_var, publish};
pub use error::Error;
pub use loader::{
    DEFAULT_FILE, DotEnv, dotenv, from_path, from_path_into, read_env_file, resolve_path,
};
pub use model::{Entry, ParsedEnv};
pub use parser::{parse_bytes, parse_line, parse_reader, parse_str, strip_quotes};
