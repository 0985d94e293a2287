use std::{collections::HashMap, fs, sync::Arc};

use serde::Deserialize;

use crate::source::{FixedPathSource, RemoteSource, SourceResolver};

pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:4000/charon";

const SETTINGS_FILE: &str = "viewer.toml";

/// Startup configuration for the loader.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base address of the dataset catalog API.
    pub server_address: String,
    /// When set, the client serves a single pre-registered dataset from these
    /// static addresses instead of querying the remote catalog. Keys are
    /// fetch kinds ("main", "tip-frequencies", "tree").
    pub fixed_paths: Option<HashMap<String, String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.into(),
            fixed_paths: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_address: Option<String>,
    fixed_paths: Option<HashMap<String, String>>,
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) {
        if let Some(v) = file_cfg.server_address {
            settings.server_address = v;
        }
        if let Some(v) = file_cfg.fixed_paths {
            settings.fixed_paths = Some(v);
        }
    }
}

/// Layers defaults, then `viewer.toml`, then environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("VIEWER__SERVER_ADDRESS") {
        settings.server_address = v;
    }

    settings
}

/// Builds the one source resolver instance for this process. The choice
/// between the remote catalog and fixed local paths happens here, once, and
/// never again at call sites.
pub fn resolver_from_settings(settings: &Settings) -> Arc<dyn SourceResolver> {
    match &settings.fixed_paths {
        Some(paths) => Arc::new(FixedPathSource::new(paths.clone())),
        None => Arc::new(RemoteSource::new(&settings.server_address)),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
