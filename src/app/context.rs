//! Shared runtime context built from CLI flags and the config file.

use std::path::PathBuf;

use anyhow::{Result, bail};
use manga_fetcher::download::ChapterDownloader;
use manga_fetcher::session::{Session, SessionStore};
use manga_fetcher::source::{
    CONNECT_TIMEOUT_SECS, HttpTimeouts, KissLoveClient, READ_TIMEOUT_SECS, SourceEndpoints,
    SourceRegistry, build_source_registry,
};
use tracing::debug;

use crate::app_config::FileConfig;
use crate::cli::Args;

const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Settings resolved once at startup; CLI flags override the config file.
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    pub(crate) output_root: PathBuf,
    pub(crate) cbz: bool,
    pub(crate) timeouts: HttpTimeouts,
    pub(crate) session_file: Option<PathBuf>,
    pub(crate) enabled_sources: Option<Vec<String>>,
    pub(crate) endpoints: SourceEndpoints,
}

impl RunContext {
    pub(crate) fn resolve(args: &Args, config: &FileConfig) -> Self {
        Self {
            output_root: args
                .output
                .clone()
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            cbz: config.cbz.unwrap_or(false),
            timeouts: HttpTimeouts {
                connect_timeout_secs: config.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
                read_timeout_secs: config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
            },
            session_file: args
                .session_file
                .clone()
                .or_else(|| config.session_file.clone()),
            enabled_sources: config.sources.clone(),
            endpoints: SourceEndpoints {
                kisslove: config.kisslove_url.clone(),
                mangakatana: config.mangakatana_url.clone(),
            },
        }
    }

    /// Builds the registry, restricted to the enabled sources if configured.
    pub(crate) fn registry(&self) -> Result<SourceRegistry> {
        let mut registry = build_source_registry(self.timeouts, &self.endpoints);
        if let Some(enabled) = &self.enabled_sources {
            for name in enabled {
                if !registry.contains(name) {
                    bail!(
                        "Unknown source '{name}' in config; available: {}",
                        registry.names().join(", ")
                    );
                }
            }
            registry.retain(|name| enabled.iter().any(|enabled| enabled == name));
        }
        if registry.is_empty() {
            bail!("No sources available");
        }
        Ok(registry)
    }

    /// Client for the kisslove-only listings.
    pub(crate) fn kisslove(&self) -> Result<KissLoveClient> {
        let client = match &self.endpoints.kisslove {
            Some(base_url) => KissLoveClient::with_base_url(base_url.clone(), self.timeouts)?,
            None => KissLoveClient::new(self.timeouts)?,
        };
        Ok(client)
    }

    pub(crate) fn store(&self) -> Result<SessionStore> {
        match &self.session_file {
            Some(path) => Ok(SessionStore::new(path)),
            None => Ok(SessionStore::at_default_location()?),
        }
    }

    /// Opens the session; `cbz` forces archive packaging on.
    pub(crate) fn open_session(&self, cbz: bool) -> Result<Session> {
        let store = self.store()?;
        debug!(path = %store.path().display(), "Using session file");
        Ok(Session::open(
            self.registry()?,
            store,
            self.output_root.clone(),
            ChapterDownloader::new(cbz || self.cbz),
        ))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_output_overrides_config() {
        let args = Args::try_parse_from(["manga-fetcher", "-o", "/cli", "sources"]).unwrap();
        let config = FileConfig {
            output_dir: Some(PathBuf::from("/config")),
            ..FileConfig::default()
        };
        assert_eq!(RunContext::resolve(&args, &config).output_root, PathBuf::from("/cli"));
    }

    #[test]
    fn test_defaults_without_config() {
        let args = Args::try_parse_from(["manga-fetcher", "sources"]).unwrap();
        let ctx = RunContext::resolve(&args, &FileConfig::default());
        assert_eq!(ctx.output_root, PathBuf::from("downloads"));
        assert!(!ctx.cbz);
        assert_eq!(ctx.timeouts, HttpTimeouts::default());
        assert!(ctx.session_file.is_none());
    }

    #[test]
    fn test_config_timeouts_and_session_file() {
        let args = Args::try_parse_from(["manga-fetcher", "sources"]).unwrap();
        let config = FileConfig {
            connect_timeout_secs: Some(3),
            read_timeout_secs: Some(7),
            session_file: Some(PathBuf::from("/s.json")),
            ..FileConfig::default()
        };
        let ctx = RunContext::resolve(&args, &config);
        assert_eq!(ctx.timeouts.connect_timeout_secs, 3);
        assert_eq!(ctx.timeouts.read_timeout_secs, 7);
        assert_eq!(ctx.session_file, Some(PathBuf::from("/s.json")));
    }

    #[test]
    fn test_registry_rejects_unknown_configured_source() {
        let args = Args::try_parse_from(["manga-fetcher", "sources"]).unwrap();
        let config = FileConfig {
            sources: Some(vec!["nope".to_string()]),
            ..FileConfig::default()
        };
        let err = RunContext::resolve(&args, &config).registry().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_registry_keeps_only_enabled_sources() {
        let args = Args::try_parse_from(["manga-fetcher", "sources"]).unwrap();
        let config = FileConfig {
            sources: Some(vec!["mangakatana".to_string()]),
            ..FileConfig::default()
        };
        let registry = RunContext::resolve(&args, &config).registry().unwrap();
        assert_eq!(registry.names(), vec!["mangakatana"]);
    }
}
