//! Configuration management for Parley
//!
//! Precedence is environment > TOML file > defaults. The two service secrets
//! come from the environment only (a `.env` file is loaded first) and are
//! required: startup stops before any service is contacted when one is absent.

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, GenerationParams};
use crate::voice::AudioFormat;
use crate::voice::stt::{DEFAULT_STT_BASE_URL, DEFAULT_STT_MODEL};
use crate::voice::tts::{DEFAULT_TTS_BASE_URL, DEFAULT_TTS_MODEL, DEFAULT_VOICE_ID, VoiceSettings};
use crate::Result;

pub use file::{ConfigFile, config_file_path, load_config_file};

/// Environment variable holding the Groq key (chat completion and Whisper)
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";

/// Environment variable holding the ElevenLabs key
pub const ELEVENLABS_API_KEY: &str = "ELEVENLABS_API_KEY";

/// Default web server port
pub const DEFAULT_PORT: u16 = 8501;

/// Default push-to-talk listening window
pub const DEFAULT_LISTEN_TIMEOUT_SECS: u64 = 5;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Parley configuration
#[derive(Debug)]
pub struct Config {
    /// Service credentials
    pub secrets: ApiKeys,

    /// Chat completion settings
    pub llm: LlmConfig,

    /// Speech recognition settings
    pub stt: SttConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// HTTP API server configuration
    pub server: ApiServerConfig,

    /// Outbound HTTP limits
    pub http: HttpConfig,

    /// Capture format negotiated with the transcriber
    pub audio_format: AudioFormat,
}

/// API keys for external services
///
/// `Debug` output redacts both values.
#[derive(Debug)]
pub struct ApiKeys {
    /// Groq key, used for chat completion and transcription
    pub groq: SecretString,

    /// `ElevenLabs` key
    pub elevenlabs: SecretString,
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub params: GenerationParams,
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub model: String,
    pub base_url: String,
    /// How long push-to-talk waits for speech to start
    pub listen_timeout_secs: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub voice_id: String,
    pub model: String,
    pub base_url: String,
    pub voice: VoiceSettings,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `.env`, the process environment and the
    /// TOML config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` if a required key is absent, or
    /// `ConfigError::Invalid` for unusable values
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        let fc = load_config_file();
        let config = Self::from_lookup(|name| std::env::var(name).ok(), fc)?;

        tracing::info!(
            llm_model = %config.llm.model,
            stt_model = %config.stt.model,
            tts_voice = %config.tts.voice_id,
            port = config.server.port,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Build configuration from an environment lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` if a required key is absent or
    /// blank, or `ConfigError::Invalid` for unusable values
    pub fn from_lookup<F>(lookup: F, fc: ConfigFile) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or(ConfigError::MissingSecret { name })
        };

        let secrets = ApiKeys {
            groq: secret(GROQ_API_KEY)?,
            elevenlabs: secret(ELEVENLABS_API_KEY)?,
        };

        // LLM config (env > toml > default)
        let params = GenerationParams {
            temperature: fc.llm.temperature.unwrap_or(0.7),
            max_tokens: fc.llm.max_tokens.unwrap_or(2048),
        };
        params.validate().map_err(|e| ConfigError::Invalid {
            name: "llm",
            reason: e.to_string(),
        })?;
        let llm = LlmConfig {
            model: lookup("PARLEY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: fc
                .llm
                .base_url
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            params,
        };

        let stt = SttConfig {
            model: lookup("PARLEY_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            base_url: fc
                .stt
                .base_url
                .unwrap_or_else(|| DEFAULT_STT_BASE_URL.to_string()),
            listen_timeout_secs: fc
                .stt
                .listen_timeout_secs
                .unwrap_or(DEFAULT_LISTEN_TIMEOUT_SECS),
        };
        if stt.listen_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "stt.listen_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        let defaults = VoiceSettings::default();
        let voice = VoiceSettings {
            stability: fc.tts.stability.unwrap_or(defaults.stability),
            similarity_boost: fc.tts.similarity_boost.unwrap_or(defaults.similarity_boost),
        };
        voice.validate().map_err(|e| ConfigError::Invalid {
            name: "tts",
            reason: e.to_string(),
        })?;
        let tts = TtsConfig {
            voice_id: lookup("PARLEY_TTS_VOICE")
                .or(fc.tts.voice_id)
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model: fc
                .tts
                .model
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            base_url: fc
                .tts
                .base_url
                .unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string()),
            voice,
        };

        // API server config (env > toml > default)
        let port = match lookup("PARLEY_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PARLEY_PORT",
                reason: format!("not a port number: {raw}"),
            })?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ApiServerConfig {
            port,
            static_dir: lookup("PARLEY_STATIC_DIR")
                .map(PathBuf::from)
                .or(fc.server.static_dir),
        };

        let http = HttpConfig {
            timeout_secs: fc.http.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        Ok(Self {
            secrets,
            llm,
            stt,
            tts,
            server,
            http,
            audio_format: AudioFormat::default(),
        })
    }
}
