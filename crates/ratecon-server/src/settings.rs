use ratecon_core::Config;
use ratecon_core::config_file::ConfigFile;

pub const DEFAULT_PORT: u16 = 10000;

/// Everything the service needs at startup.
#[derive(Clone)]
pub struct Settings {
    pub config: Config,
    pub bot_token: Option<String>,
    /// Public base URL; the webhook path is appended to it.
    pub public_url: Option<String>,
    pub port: u16,
}

impl Settings {
    /// Resolve settings: environment over config file over defaults.
    pub fn resolve(file: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = file.apply_to(Config::default());
        if let Some(key) = env("GROQ_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(base) = env("RATECON_API_BASE") {
            config.api_base = base;
        }
        if let Some(model) = env("RATECON_MODEL") {
            config.model = model;
        }

        let telegram = file.telegram.clone().unwrap_or_default();
        let bot_token = env("TELEGRAM_BOT_TOKEN").or(telegram.bot_token);

        let public_url = env("WEBHOOK_URL").or(telegram.webhook_url).or_else(|| {
            env("RENDER_SERVICE_NAME")
                .or(telegram.render_service_name)
                .map(|name| format!("https://{}.onrender.com", name))
        });

        let port = env("PORT")
            .and_then(|p| match p.parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(value = %p, "ignoring invalid PORT");
                    None
                }
            })
            .or(file.server.as_ref().and_then(|s| s.port))
            .unwrap_or(DEFAULT_PORT);

        Self {
            config,
            bot_token,
            public_url,
            port,
        }
    }

    /// Full webhook URL to register, when both a token and a public URL are known.
    pub fn webhook_url(&self) -> Option<String> {
        let token = self.bot_token.as_deref()?;
        let base = self.public_url.as_deref()?;
        Some(format!(
            "{}{}",
            base.trim_end_matches('/'),
            webhook_path(token)
        ))
    }
}

pub fn webhook_path(token: &str) -> String {
    format!("/telegram/{}", token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratecon_core::config_file::{ServerConfig, TelegramConfig};

    fn env_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults() {
        let settings = Settings::resolve(&ConfigFile::default(), env_from(&[]));
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(settings.bot_token.is_none());
        assert!(settings.webhook_url().is_none());
    }

    #[test]
    fn render_service_name_builds_webhook() {
        let settings = Settings::resolve(
            &ConfigFile::default(),
            env_from(&[
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("RENDER_SERVICE_NAME", "ratecon-bot"),
                ("PORT", "8080"),
            ]),
        );
        assert_eq!(
            settings.webhook_url().as_deref(),
            Some("https://ratecon-bot.onrender.com/telegram/123:abc")
        );
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn explicit_url_beats_render_name() {
        let file = ConfigFile {
            telegram: Some(TelegramConfig {
                bot_token: Some("file-token".into()),
                render_service_name: Some("from-file".into()),
                ..Default::default()
            }),
            server: Some(ServerConfig { port: Some(9000) }),
            ..Default::default()
        };
        let settings = Settings::resolve(
            &file,
            env_from(&[("WEBHOOK_URL", "https://bot.example.com/")]),
        );
        assert_eq!(
            settings.webhook_url().as_deref(),
            Some("https://bot.example.com/telegram/file-token")
        );
        assert_eq!(settings.port, 9000);
    }

    #[test]
    fn bad_port_falls_back() {
        let settings = Settings::resolve(&ConfigFile::default(), env_from(&[("PORT", "http")]));
        assert_eq!(settings.port, DEFAULT_PORT);
    }
}
