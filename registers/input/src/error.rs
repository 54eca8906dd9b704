// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use axion_registers_generator::{ResolutionError, ValidationError};
use thiserror::Error;

/// Decoding failure of a structured (TOML or JSON) description.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}:{line}: {msg}")]
    Syntax {
        file: String,
        line: usize,
        msg: String,
    },
    #[error("Invalid integer literal '{0}'")]
    InvalidInteger(String),
    #[error("{file}: {source}")]
    Schema {
        file: String,
        #[source]
        source: SchemaError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{file}: no module name given (expected 'module' or 'name')")]
    MissingEntity { file: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl InputError {
    /// A syntax error whose location is filled in later by [`located`].
    ///
    /// [`located`]: InputError::located
    pub fn syntax(msg: impl Into<String>) -> Self {
        InputError::Syntax {
            file: String::new(),
            line: 0,
            msg: msg.into(),
        }
    }

    /// Pins errors raised while reading one annotation to `file:line`.
    pub fn located(self, file: &str, line: usize) -> Self {
        let msg = match self {
            InputError::Syntax { msg, .. } => msg,
            InputError::InvalidInteger(_) | InputError::Validation(_) => self.to_string(),
            other => return other,
        };
        InputError::Syntax {
            file: file.to_string(),
            line,
            msg,
        }
    }
}
