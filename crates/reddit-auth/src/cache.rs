//! On-disk cache for the current access token
//!
//! A single JSON file holds the most recent token and its absolute expiry.
//! The record is versioned so older or newer layouts are refused instead of
//! misread. Writes go through a temp file + rename so a crash never leaves a
//! half-written token behind.
//!
//! One process owns the file at a time. There is no locking; running two
//! instances against the same cache path is unsupported, and if it happens
//! the last store wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::token::TokenResponse;

/// Layout version written into every cache file.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// A persisted access token.
///
/// `expires` is a unix timestamp in milliseconds (absolute, not a delta).
/// Computed at storage time from `TokenResponse.expires_in` plus the time
/// the exchange started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub version: u32,
    pub access_token: String,
    pub expires: u64,
    /// Remaining fields from the token endpoint, stored verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedToken {
    pub fn from_response(response: TokenResponse, now_millis: u64) -> Self {
        let mut extra = response.extra;
        extra.remove("version");
        extra.remove("expires");
        Self {
            version: CACHE_SCHEMA_VERSION,
            access_token: response.access_token,
            expires: now_millis.saturating_add(response.expires_in.saturating_mul(1000)),
            extra,
        }
    }

    /// Usable strictly before `expires`; at the expiry instant it is stale.
    pub fn is_valid_at(&self, now_millis: u64) -> bool {
        now_millis < self.expires
    }
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Handle to the token cache file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory that will hold the cache file.
    pub async fn ensure_parent_dir(&self) -> Result<()> {
        let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Io(format!("creating {}: {e}", dir.display())))?;
        debug!(dir = %dir.display(), "token cache directory ready");
        Ok(())
    }

    /// Read the cached token, or `None` if no cache file exists yet.
    pub async fn load(&self) -> Result<Option<CachedToken>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(format!("reading token cache: {e}"))),
        };

        let token: CachedToken = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing token cache: {e}")))?;

        if token.version != CACHE_SCHEMA_VERSION {
            return Err(Error::CredentialParse(format!(
                "token cache version {} is not supported (expected {CACHE_SCHEMA_VERSION})",
                token.version
            )));
        }

        Ok(Some(token))
    }

    /// Replace the cache file with `token`.
    pub async fn store(&self, token: &CachedToken) -> Result<()> {
        write_atomic(&self.path, token).await
    }
}

/// Write the token to a temp file beside `path`, then rename it over `path`.
/// Permissions are 0600 on unix since the file holds a live bearer token.
async fn write_atomic(path: &Path, token: &CachedToken) -> Result<()> {
    let json = serde_json::to_string_pretty(token)
        .map_err(|e| Error::CredentialParse(format!("serializing token cache: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io(format!("token cache path {} has no file name", path.display())))?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token cache: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token cache permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token cache: {e}")))?;

    debug!(path = %path.display(), "persisted token cache");
    Ok(())
}
