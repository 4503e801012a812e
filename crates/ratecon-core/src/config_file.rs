use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub provider: Option<ProviderConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub telegram: Option<TelegramConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub validate_layout: Option<bool>,
}

/// Page bands the PDF backend drops, as fractions of the page height.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub header_exclusion: Option<f32>,
    pub footer_exclusion: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Public base URL the webhook is registered under.
    pub webhook_url: Option<String>,
    /// Render service name; yields `https://<name>.onrender.com` when no URL is set.
    pub render_service_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

/// Platform config directory path: `<config_dir>/ratecon/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ratecon").join("config.toml"))
}

/// Load config by cascading CWD `.ratecon.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".ratecon.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T: Clone>(
    base: &Option<S>,
    overlay: &Option<S>,
    field: impl Fn(&S) -> &Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(|o| field(o).clone())
        .or_else(|| base.as_ref().and_then(|b| field(b).clone()))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        provider: Some(ProviderConfig {
            api_key: pick(&base.provider, &overlay.provider, |p| &p.api_key),
            api_base: pick(&base.provider, &overlay.provider, |p| &p.api_base),
            model: pick(&base.provider, &overlay.provider, |p| &p.model),
            timeout_secs: pick(&base.provider, &overlay.provider, |p| &p.timeout_secs),
        }),
        pipeline: Some(PipelineConfig {
            validate_layout: pick(&base.pipeline, &overlay.pipeline, |p| &p.validate_layout),
        }),
        extraction: Some(ExtractionConfig {
            header_exclusion: pick(&base.extraction, &overlay.extraction, |e| {
                &e.header_exclusion
            }),
            footer_exclusion: pick(&base.extraction, &overlay.extraction, |e| {
                &e.footer_exclusion
            }),
        }),
        telegram: Some(TelegramConfig {
            bot_token: pick(&base.telegram, &overlay.telegram, |t| &t.bot_token),
            webhook_url: pick(&base.telegram, &overlay.telegram, |t| &t.webhook_url),
            render_service_name: pick(&base.telegram, &overlay.telegram, |t| {
                &t.render_service_name
            }),
        }),
        server: Some(ServerConfig {
            port: pick(&base.server, &overlay.server, |s| &s.port),
        }),
    }
}

impl ConfigFile {
    /// Apply file values over `config`, leaving unset fields untouched.
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(ref provider) = self.provider {
            if let Some(ref key) = provider.api_key {
                config.api_key = Some(key.clone());
            }
            if let Some(ref base) = provider.api_base {
                config.api_base = base.clone();
            }
            if let Some(ref model) = provider.model {
                config.model = model.clone();
            }
            if let Some(secs) = provider.timeout_secs {
                config.request_timeout_secs = secs;
            }
        }
        if let Some(validate) = self.pipeline.as_ref().and_then(|p| p.validate_layout) {
            config.validate_layout = validate;
        }
        config
    }
}
