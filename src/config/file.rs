//! TOML configuration file loading
//!
//! Supports `~/.config/parley/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.
//! Secrets are never read from this file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Chat completion settings
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech recognition settings
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Web server settings
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpFileConfig,
}

/// Chat completion configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "mixtral-8x7b-32768")
    pub model: Option<String>,

    /// OpenAI-compatible API base
    pub base_url: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// Whisper model (e.g. "whisper-large-v3")
    pub model: Option<String>,

    pub base_url: Option<String>,

    /// How long push-to-talk waits for speech to start
    pub listen_timeout_secs: Option<u64>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub voice_id: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
}

/// Web server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Static web UI directory
    pub static_dir: Option<PathBuf>,
}

/// Outbound HTTP configuration
#[derive(Debug, Default, Deserialize)]
pub struct HttpFileConfig {
    /// Per-request timeout for remote services
    pub timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_at(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_at(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/parley/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parley").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [llm]
            model = "llama3-70b-8192"
            temperature = 0.2

            [tts]
            voice_id = "EXAVITQu4vr4xnSDxMaL"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(fc.llm.model.as_deref(), Some("llama3-70b-8192"));
        assert_eq!(fc.llm.temperature, Some(0.2));
        assert!(fc.llm.max_tokens.is_none());
        assert_eq!(fc.tts.voice_id.as_deref(), Some("EXAVITQu4vr4xnSDxMaL"));
        assert_eq!(fc.server.port, Some(9000));
        assert!(fc.stt.model.is_none());
        assert!(fc.http.timeout_secs.is_none());
    }

    #[test]
    fn empty_file_is_default() {
        let fc: ConfigFile = toml::from_str("").unwrap();
        assert!(fc.llm.model.is_none());
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let fc = load_config_file_at(Path::new("/nonexistent/parley/config.toml"));
        assert!(fc.llm.model.is_none());
    }

    #[test]
    fn malformed_file_is_default() {
        let path =
            std::env::temp_dir().join(format!("parley-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[llm\nmodel = ").unwrap();

        let fc = load_config_file_at(&path);
        assert!(fc.llm.model.is_none());

        let _ = std::fs::remove_file(path);
    }
}
