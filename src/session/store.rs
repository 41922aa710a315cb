//! JSON session file: last query, selection, active sources, ranges, theme.
//!
//! Default location is `$XDG_STATE_HOME/manga-fetcher/session.json`, falling
//! back to `$HOME/.local/state/manga-fetcher/` and then `%APPDATA%`. Loading
//! never fails: a missing or unreadable file yields defaults. Writes take an
//! advisory lock on a sibling `.lock` file, go to a temp file, and are
//! renamed into place.

use std::env;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::SessionError;
use super::range::RangeSelection;
use crate::source::SourceId;

const APP_DIR: &str = "manga-fetcher";
const SESSION_FILE: &str = "session.json";

/// Light or dark presentation preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Dark background.
    #[default]
    Dark,
    /// Light background.
    Light,
}

impl ThemeMode {
    /// Mode implied by a theme name: names containing `dark` are dark.
    #[must_use]
    pub fn from_theme_name(name: &str) -> Self {
        if name.to_ascii_lowercase().contains("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dark => "dark",
            Self::Light => "light",
        })
    }
}

/// Cached per-manga state, keyed by (source, slug).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaCacheEntry {
    /// Source identity.
    pub source: SourceId,
    /// Manga slug on that source.
    pub slug: String,
    /// Range start last chosen for this manga.
    #[serde(default)]
    pub range_start: Option<usize>,
    /// Range end last chosen for this manga.
    #[serde(default)]
    pub range_end: Option<usize>,
    /// Chapter cursor position last used for this manga.
    #[serde(default)]
    pub chapter_index: Option<usize>,
}

impl MangaCacheEntry {
    /// The cached range.
    #[must_use]
    pub fn range(&self) -> RangeSelection {
        RangeSelection::new(self.range_start, self.range_end)
    }
}

/// Persisted snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCache {
    /// Last search query.
    pub last_query: Option<String>,
    /// Source of the last selected manga.
    pub selected_source: Option<SourceId>,
    /// Slug of the last selected manga.
    pub selected_slug: Option<String>,
    /// Title of the last selected manga.
    pub selected_title: Option<String>,
    /// Range start of the last selected manga.
    pub range_start: Option<usize>,
    /// Range end of the last selected manga.
    pub range_end: Option<usize>,
    /// Active sources, in selection order.
    pub sources: Vec<SourceId>,
    /// Presentation mode.
    pub theme: ThemeMode,
    /// Theme name, when one was chosen explicitly.
    pub theme_name: Option<String>,
    /// Per-manga range cache.
    pub manga_cache: Vec<MangaCacheEntry>,
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the platform default location.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] when no state directory can be
    /// determined from the environment.
    pub fn at_default_location() -> Result<Self, SessionError> {
        default_session_path().map(Self::new).ok_or_else(|| {
            SessionError::persistence(
                SESSION_FILE,
                "unable to determine state directory (set XDG_STATE_HOME or HOME)",
            )
        })
    }

    /// Session file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the session, falling back to defaults when the file is missing
    /// or cannot be parsed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> SessionCache {
        if !self.path.exists() {
            debug!("No session file, using defaults");
            return SessionCache::default();
        }

        let contents = match self.read_locked() {
            Ok(contents) => contents,
            Err(error) => {
                warn!(error = %error, "Session file unreadable, using defaults");
                return SessionCache::default();
            }
        };

        match serde_json::from_str::<SessionCache>(&contents) {
            Ok(cache) => cache,
            Err(error) => {
                warn!(error = %error, "Session file corrupt, using defaults");
                SessionCache::default()
            }
        }
    }

    /// Writes `cache` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] on any filesystem or encoding
    /// failure.
    #[instrument(skip(self, cache), fields(path = %self.path.display()))]
    pub fn save(&self, cache: &SessionCache) -> Result<(), SessionError> {
        let payload = serde_json::to_vec_pretty(cache)
            .map_err(|e| SessionError::persistence(&self.path, e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(&e))?;
        }

        let lock = self.open_lock_file()?;
        lock.lock_exclusive().map_err(|e| self.persistence_error(&e))?;
        let result = self.write_replace(&payload);
        let _ = lock.unlock();
        result?;

        debug!(bytes = payload.len(), "Session saved");
        Ok(())
    }

    fn read_locked(&self) -> std::io::Result<String> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(&self.path));
        match lock {
            Ok(lock) => {
                lock.lock_shared()?;
                let contents = fs::read_to_string(&self.path);
                let _ = lock.unlock();
                contents
            }
            // Read-only locations still load.
            Err(_) => fs::read_to_string(&self.path),
        }
    }

    fn open_lock_file(&self) -> Result<File, SessionError> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(&self.path))
            .map_err(|e| self.persistence_error(&e))
    }

    fn write_replace(&self, payload: &[u8]) -> Result<(), SessionError> {
        let tmp = temp_path(&self.path);
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(payload)?;
            file.sync_all()?;
            set_owner_only_permissions(&tmp)?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.persistence_error(&e)
        })
    }

    fn persistence_error(&self, error: &std::io::Error) -> SessionError {
        SessionError::persistence(&self.path, error.to_string())
    }
}

/// Default session file path, if the environment allows one.
#[must_use]
pub fn default_session_path() -> Option<PathBuf> {
    resolve_state_dir(
        sanitize_env_path(env::var_os("XDG_STATE_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
    .map(|dir| dir.join(SESSION_FILE))
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_state_dir(
    xdg_state_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(xdg) = xdg_state_home {
        return Some(xdg.join(APP_DIR));
    }
    if let Some(home) = home {
        return Some(home.join(".local").join("state").join(APP_DIR));
    }
    app_data.map(|app_data| app_data.join(APP_DIR))
}

fn lock_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".lock")
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_else(|| OsString::from(SESSION_FILE));
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
