use std::{
    path::{Path, PathBuf},
    sync::Mutex,
    time::SystemTime,
};

use base64::Engine;
use subtle::ConstantTimeEq;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: malformed password entry")]
    MalformedEntry { path: PathBuf, line: usize },
    #[error("{path}:{line}: unknown password codec")]
    UnknownCodec { path: PathBuf, line: usize },
}

// ── Password entries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Plain,
}

impl Codec {
    /// Constant-time comparison of the stored material against the
    /// caller-provided password.
    fn verify(self, material: &str, provided: &str) -> bool {
        match self {
            // ct_eq on slices already rejects unequal lengths
            Codec::Plain => material.as_bytes().ct_eq(provided.as_bytes()).into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    username: String,
    codec: Codec,
    material: String,
}

/// Parse one `username:$<codec>$<material>` line.
fn parse_entry(line: &str, path: &Path, line_no: usize) -> Result<Entry, AuthError> {
    let malformed = || AuthError::MalformedEntry {
        path: path.to_path_buf(),
        line: line_no,
    };

    let (username, stored) = line.split_once(':').ok_or_else(malformed)?;
    let rest = stored.strip_prefix('$').ok_or_else(malformed)?;
    let (codec, material) = rest.split_once('$').ok_or_else(malformed)?;
    if codec.is_empty() {
        return Err(malformed());
    }

    let codec = if codec.eq_ignore_ascii_case("plain") {
        Codec::Plain
    } else {
        return Err(AuthError::UnknownCodec {
            path: path.to_path_buf(),
            line: line_no,
        });
    };

    Ok(Entry {
        username: username.to_string(),
        codec,
        material: material.to_string(),
    })
}

// ── Verifier ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LoadState {
    entries: Vec<Entry>,
    /// Modification time of the file at the last successful read.
    last_read: Option<SystemTime>,
}

/// Basic-auth verifier backed by a plaintext password file.
#[derive(Debug)]
pub struct PlaintextAuth {
    path: PathBuf,
    state: Mutex<LoadState>,
}

impl PlaintextAuth {
    /// Create a verifier for `path`. The file is read lazily on the first
    /// `verify`, so a missing file only surfaces as denied requests.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Verify an `Authorization` header value. Any failure — stale file
    /// that cannot be re-read for the first time, malformed header, bad
    /// base64, unknown user, wrong password — is a plain denial.
    pub fn verify(&self, header: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        if let Err(e) = reload_if_stale(&self.path, &mut state) {
            warn!(path = %self.path.display(), error = %e, "password file unavailable");
            return false;
        }

        let Some((username, password)) = decode_basic(header) else {
            return false;
        };

        state
            .entries
            .iter()
            .filter(|e| e.username.eq_ignore_ascii_case(&username))
            .any(|e| e.codec.verify(&e.material, &password))
    }
}

/// Re-read the password file when its mtime has advanced. A file that has
/// become unreadable after a successful load keeps the in-memory copy.
fn reload_if_stale(path: &Path, state: &mut LoadState) -> Result<(), AuthError> {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(source) => {
            if state.last_read.is_some() {
                return Ok(());
            }
            return Err(AuthError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if state.last_read.is_some_and(|last| modified <= last) {
        return Ok(());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        entries.push(parse_entry(line, path, i + 1)?);
    }

    state.entries = entries;
    state.last_read = Some(modified);
    Ok(())
}

/// Split a `Basic <base64>` header into `(username, password)`.
fn decode_basic(header: &str) -> Option<(String, String)> {
    let scheme = header.get(..6)?;
    if !scheme.eq_ignore_ascii_case("Basic ") {
        return None;
    }
    let rest = header[6..].trim_start();

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(rest)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
