//! The CLI's own configuration-error class, distinct from a per-file [`refl_common::ParseError`]
//! (which never aborts the run -- it's reported per file and the run continues).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CliError {
    UnknownGenerator(String),
    Io(std::io::Error, PathBuf),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::UnknownGenerator(name) => write!(f, "unknown generator '{name}'"),
            CliError::Io(err, path) => write!(f, "{}: {err}", path.display()),
        }
    }
}

impl std::error::Error for CliError {}
