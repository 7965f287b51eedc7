//! Persisted login token.
//!
//! After a successful login the server's ctrl parameters (`token`, `user`,
//! `expires`, ...) are written as one flat JSON object. The next run reads
//! `token` back to log in without credentials.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tinode_proto::Params;

use crate::error::CookieError;

/// Default cookie location, relative to the working directory.
pub const DEFAULT_COOKIE_PATH: &str = ".tn-cli-cookie";

/// Cookie file at a fixed path.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode every parameter and overwrite the file with the flat record.
    ///
    /// Returns the record that was written.
    ///
    /// # Errors
    ///
    /// - `CookieError::Json` if a parameter is not valid JSON
    /// - `CookieError::Io` if the file cannot be written
    pub fn save(&self, params: &Params) -> Result<Map<String, Value>, CookieError> {
        let mut record = Map::new();
        for (key, blob) in params {
            let value: Value = serde_json::from_slice(blob.as_bytes())?;
            record.insert(key.clone(), value);
        }

        fs::write(&self.path, serde_json::to_vec(&record)?)?;
        tracing::debug!(path = %self.path.display(), "cookie saved");
        Ok(record)
    }

    /// Read the stored token.
    ///
    /// # Errors
    ///
    /// - `CookieError::Io` if the file cannot be read
    /// - `CookieError::Json` if it is not JSON
    /// - `CookieError::MissingToken` if there is no `token` string
    pub fn try_load(&self) -> Result<String, CookieError> {
        let text = fs::read(&self.path)?;
        let record: Map<String, Value> = serde_json::from_slice(&text)?;
        match record.get("token") {
            Some(Value::String(token)) => Ok(token.clone()),
            _ => Err(CookieError::MissingToken),
        }
    }

    /// Read the stored token, treating any failure as "no session".
    pub fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "missing or invalid cookie file: {e}");
                None
            },
        }
    }
}

impl Default for CookieStore {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_PATH)
    }
}
