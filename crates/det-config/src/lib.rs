// SPDX-License-Identifier: MIT OR Apache-2.0
//! `.env` loading and typed accessors for the engine's optional
//! collaborators (the trace store, the idempotency cache). The engine core
//! never reads any of this — it exists only so a caller wiring up the HTTP
//! surface and persistence described in §6 has one place to look.
//!
//! There is no `dotenv`-style dependency here by design: the file format is
//! a handful of lines of `KEY=VALUE`, and the one rule that matters —
//! explicit process environment always wins over the file — is easiest to
//! get right, and to see is right, in a dozen lines of hand-rolled parsing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::path::Path;

use det_error::{DetError, DetResult, ErrorCode};

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::ConfigError, message)
}

/// Parse `.env`-style file content into a key/value map.
///
/// Blank lines and lines whose first non-whitespace character is `#` are
/// skipped. Every other line must be `KEY=VALUE`; `KEY` is trimmed, `VALUE`
/// is trimmed and then has one layer of surrounding `'` or `"` quotes
/// stripped if present. Lines without an `=` are ignored.
#[must_use]
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()));
    }
    vars
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// A loaded `.env` file's variables, layered under the real process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct DotEnv {
    file_vars: BTreeMap<String, String>,
}

impl DotEnv {
    /// Parse `content` directly, without touching the filesystem.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self { file_vars: parse_env_file(content) }
    }

    /// Load `.env` variables from `path`. A missing file yields an empty
    /// [`DotEnv`] rather than an error — the file is optional.
    ///
    /// # Errors
    /// [`ErrorCode::ConfigError`] if `path` exists but cannot be read.
    pub fn load(path: &Path) -> DetResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(err(format!("failed to read {}", path.display())).with_source(e)),
        }
    }

    /// `std::env::var(key)` if set, else the value from the loaded file.
    /// The process environment always wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.file_vars.get(key).cloned())
    }

    /// `DATABASE_URL`, if configured.
    #[must_use]
    pub fn database_url(&self) -> Option<String> {
        self.get("DATABASE_URL")
    }

    /// `REDIS_URL`, if configured.
    #[must_use]
    pub fn redis_url(&self) -> Option<String> {
        self.get("REDIS_URL")
    }

    /// `IDEMPOTENCY_TTL_SECONDS`, if configured. `None` if the variable is
    /// absent.
    ///
    /// # Errors
    /// [`ErrorCode::ConfigError`] if the variable is present but is not a
    /// positive integer.
    pub fn idempotency_ttl_seconds(&self) -> DetResult<Option<u64>> {
        let Some(raw) = self.get("IDEMPOTENCY_TTL_SECONDS") else {
            return Ok(None);
        };
        let value: u64 = raw.parse().map_err(|_| {
            err(format!("IDEMPOTENCY_TTL_SECONDS must be a positive integer, got {raw:?}"))
                .with_context("field", "IDEMPOTENCY_TTL_SECONDS")
        })?;
        if value == 0 {
            return Err(err("IDEMPOTENCY_TTL_SECONDS must be a positive integer, got 0")
                .with_context("field", "IDEMPOTENCY_TTL_SECONDS"));
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let vars = parse_env_file("DATABASE_URL=postgres://localhost/db\nREDIS_URL=redis://localhost\n");
        assert_eq!(vars.get("DATABASE_URL").unwrap(), "postgres://localhost/db");
        assert_eq!(vars.get("REDIS_URL").unwrap(), "redis://localhost");
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let vars = parse_env_file("\n# a comment\n  \nDATABASE_URL=x\n# another\n");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("DATABASE_URL").unwrap(), "x");
    }

    #[test]
    fn strips_one_layer_of_surrounding_quotes() {
        let vars = parse_env_file(r#"A="hello"
B='world'
C=bare
"#);
        assert_eq!(vars.get("A").unwrap(), "hello");
        assert_eq!(vars.get("B").unwrap(), "world");
        assert_eq!(vars.get("C").unwrap(), "bare");
    }

    #[test]
    fn ignores_lines_without_equals() {
        let vars = parse_env_file("not_a_var\nDATABASE_URL=x\n");
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn load_missing_file_is_not_an_error() {
        let dotenv = DotEnv::load(Path::new("/nonexistent/path/.env")).unwrap();
        assert!(dotenv.database_url().is_none());
    }

    #[test]
    fn load_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DATABASE_URL=postgres://x\n").unwrap();
        let dotenv = DotEnv::load(&path).unwrap();
        assert_eq!(dotenv.database_url().unwrap(), "postgres://x");
    }

    #[test]
    fn idempotency_ttl_rejects_non_positive_integers() {
        let dotenv = DotEnv::parse("IDEMPOTENCY_TTL_SECONDS=0\n");
        let err = dotenv.idempotency_ttl_seconds().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);

        let dotenv = DotEnv::parse("IDEMPOTENCY_TTL_SECONDS=not-a-number\n");
        assert!(dotenv.idempotency_ttl_seconds().is_err());
    }

    #[test]
    fn idempotency_ttl_accepts_positive_integer() {
        let dotenv = DotEnv::parse("IDEMPOTENCY_TTL_SECONDS=300\n");
        assert_eq!(dotenv.idempotency_ttl_seconds().unwrap(), Some(300));
    }

    #[test]
    fn idempotency_ttl_absent_is_none_not_an_error() {
        let dotenv = DotEnv::parse("");
        assert_eq!(dotenv.idempotency_ttl_seconds().unwrap(), None);
    }
}
