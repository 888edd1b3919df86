use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use crate::audio::SessionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Audio
    pub default_volume: u8,
    pub max_queue_size: usize,
    pub history_size: usize,

    // Tiempos
    pub inactivity_timeout: Duration,
    pub connect_timeout: Duration,
    pub search_timeout: Duration,

    // Límites
    pub max_song_duration: u64, // En segundos

    // yt-dlp
    pub ytdlp_path: String,
    pub cookies_file: Option<PathBuf>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Acepta "5m", "1h 30m" o segundos sueltos ("300")
fn parse_duration(name: &str, raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(raw).with_context(|| format!("{} inválido: {:?}", name, raw))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,

            default_volume: env_or("DEFAULT_VOLUME", "50")
                .parse()
                .context("DEFAULT_VOLUME debe ser un entero entre 0 y 100")?,
            max_queue_size: env_or("MAX_QUEUE_SIZE", "100").parse()?,
            history_size: env_or("HISTORY_SIZE", "10").parse()?,

            inactivity_timeout: parse_duration(
                "INACTIVITY_TIMEOUT",
                &env_or("INACTIVITY_TIMEOUT", "5m"),
            )?,
            connect_timeout: parse_duration("CONNECT_TIMEOUT", &env_or("CONNECT_TIMEOUT", "30s"))?,
            search_timeout: parse_duration("SEARCH_TIMEOUT", &env_or("SEARCH_TIMEOUT", "30s"))?,

            max_song_duration: env_or("MAX_SONG_DURATION", "7200").parse()?, // 2 horas

            ytdlp_path: env_or("YTDLP_PATH", "yt-dlp"),
            cookies_file: std::env::var("COOKIES_FILE")
                .ok()
                .map(PathBuf::from)
                .filter(|path| path.exists()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - Volume must be between 0 and 100
    /// - Queue and history sizes must be > 0
    /// - Timeouts and the max song duration must be non-zero
    pub fn validate(&self) -> Result<()> {
        if self.default_volume > 100 {
            anyhow::bail!("Default volume must be between 0 and 100, got: {}", self.default_volume);
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.history_size == 0 {
            anyhow::bail!("History size must be greater than 0");
        }

        for (name, timeout) in [
            ("Inactivity timeout", self.inactivity_timeout),
            ("Connect timeout", self.connect_timeout),
            ("Search timeout", self.search_timeout),
        ] {
            if timeout.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.max_song_duration == 0 {
            anyhow::bail!("Max song duration must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Never includes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Audio: {}% vol, {} queue, {} history\n  \
            Timeouts: idle {}, connect {}, search {}\n  \
            Limits: {}s max duration\n  \
            yt-dlp: {} (cookies: {})",
            self.default_volume,
            self.max_queue_size,
            self.history_size,
            humantime::format_duration(self.inactivity_timeout),
            humantime::format_duration(self.connect_timeout),
            humantime::format_duration(self.search_timeout),
            self.max_song_duration,
            self.ytdlp_path,
            self.cookies_file
                .as_ref()
                .map_or("no".to_string(), |path| path.display().to_string()),
        )
    }

    /// Parámetros que comparte cada sesión de guild
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_queue_size: self.max_queue_size,
            history_size: self.history_size,
            inactivity_timeout: self.inactivity_timeout,
            connect_timeout: self.connect_timeout,
            default_volume: self.default_volume,
        }
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),

            default_volume: 50,
            max_queue_size: 100,
            history_size: 10,

            inactivity_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(30),

            max_song_duration: 7200, // 2 hours

            ytdlp_path: "yt-dlp".to_string(),
            cookies_file: None,
        }
    }
}
