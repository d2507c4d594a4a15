//! Configuration for Sitecraft.
//!
//! Settings are read from `.sitecraft/sitecraft.toml` and layered
//! file → environment → CLI. Every field has a default, so an empty or
//! missing file yields a working configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! [provider]
//! kind = "openai"            # openai | gemini
//! api_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "SITECRAFT_API_KEY"
//! timeout_secs = 30
//!
//! [chat]
//! approve_keywords = ["aprovar", "pode gerar"]
//! change_keywords = ["alterar", "mudar"]
//! generation_verbs = ["gerar", "implementar", "inserir", "adicionar"]
//!
//! [preview]
//! lang = "pt-BR"
//!
//! [video]
//! ytdlp_cmd = "yt-dlp"
//! timeout_secs = 300
//! storage_dir = ".sitecraft/media"
//! public_base_url = "file://"
//!
//! [server]
//! port = 3141
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project state directory.
pub const STATE_DIR: &str = ".sitecraft";

/// Config file name inside [`STATE_DIR`].
pub const CONFIG_FILE: &str = "sitecraft.toml";

/// Which chat API the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions`
    #[default]
    Openai,
    /// Google Gemini `generateContent`
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::Openai),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => anyhow::bail!("Invalid provider kind '{}'. Valid values: openai, gemini", s),
        }
    }
}

/// AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "SITECRAFT_API_KEY".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl ProviderSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Keyword lists driving the plan/approve routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_approve_keywords")]
    pub approve_keywords: Vec<String>,
    #[serde(default = "default_change_keywords")]
    pub change_keywords: Vec<String>,
    /// Leading verbs that skip planning and go straight to generation
    #[serde(default = "default_generation_verbs")]
    pub generation_verbs: Vec<String>,
}

fn default_approve_keywords() -> Vec<String> {
    [
        "aprovar",
        "aprovado",
        "gerar agora",
        "pode gerar",
        "estou pronto",
        "pronto",
        "pode implementar",
        "implementar",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_change_keywords() -> Vec<String> {
    ["alterar", "mudar", "trocar", "rever seções"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_generation_verbs() -> Vec<String> {
    ["gerar", "implementar", "inserir", "adicionar"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            approve_keywords: default_approve_keywords(),
            change_keywords: default_change_keywords(),
            generation_verbs: default_generation_verbs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSection {
    /// `lang` attribute of the rendered document
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "pt-BR".to_string()
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            lang: default_lang(),
        }
    }
}

/// yt-dlp and media storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSection {
    /// yt-dlp command (default: "yt-dlp")
    #[serde(default)]
    pub ytdlp_cmd: Option<String>,
    #[serde(default = "default_video_timeout")]
    pub timeout_secs: u64,
    /// Root of the local media store, relative to the project dir
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Prefix used to build public URLs of stored media
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_video_timeout() -> u64 {
    300
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(STATE_DIR).join("media")
}

fn default_public_base_url() -> String {
    "file://".to_string()
}

impl Default for VideoSection {
    fn default() -> Self {
        Self {
            ytdlp_cmd: None,
            timeout_secs: default_video_timeout(),
            storage_dir: default_storage_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl VideoSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// The complete sitecraft.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SitecraftToml {
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub preview: PreviewSection,
    #[serde(default)]
    pub video: VideoSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl SitecraftToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse sitecraft.toml")
    }

    /// Load `sitecraft.toml` from `state_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize sitecraft.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SITECRAFT_PROVIDER_URL") {
            self.provider.api_url = url;
        }
        if let Some(model) = lookup("SITECRAFT_MODEL") {
            self.provider.model = model;
        }
        if let Some(kind) = lookup("SITECRAFT_PROVIDER")
            && let Ok(kind) = kind.parse()
        {
            self.provider.kind = kind;
        }
        if self.video.ytdlp_cmd.is_none()
            && let Some(cmd) = lookup("YTDLP_CMD")
        {
            self.video.ytdlp_cmd = Some(cmd);
        }
    }

    /// Get the yt-dlp command (file → env → default).
    pub fn ytdlp_cmd(&self) -> String {
        self.video
            .ytdlp_cmd
            .clone()
            .unwrap_or_else(|| "yt-dlp".to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.provider.api_url.starts_with("http://")
            && !self.provider.api_url.starts_with("https://")
        {
            warnings.push(format!(
                "Invalid provider api_url '{}': should start with http:// or https://",
                self.provider.api_url
            ));
        }
        if self.provider.model.trim().is_empty() {
            warnings.push("provider model is empty".to_string());
        }
        if self.provider.timeout_secs == 0 {
            warnings.push("provider timeout_secs is 0: every AI call would time out".to_string());
        }
        if self.video.timeout_secs == 0 {
            warnings.push("video timeout_secs is 0: every yt-dlp run would time out".to_string());
        }
        if self.chat.approve_keywords.iter().all(|k| k.trim().is_empty()) {
            warnings.push("chat approve_keywords is empty: plans can never be approved".to_string());
        }
        for verb in &self.chat.generation_verbs {
            if verb.trim().is_empty() || verb.contains(char::is_whitespace) {
                warnings.push(format!(
                    "Invalid generation verb '{}': must be a single word",
                    verb
                ));
            }
        }
        if self.server.port == 0 {
            warnings.push("server port is 0: a random port will be used".to_string());
        }

        warnings
    }
}

/// Resolved configuration.
///
/// It merges settings from:
/// 1. sitecraft.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct SitecraftConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .sitecraft directory
    pub state_dir: PathBuf,
    /// Parsed and env-overlaid sitecraft.toml
    pub toml: SitecraftToml,
    /// CLI override for the server port
    pub cli_port: Option<u16>,
}

impl SitecraftConfig {
    /// Load configuration for `project_dir`, applying environment overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let state_dir = project_dir.join(STATE_DIR);
        let mut toml = SitecraftToml::load_or_default(&state_dir)?;
        toml.apply_env_from(|key| std::env::var(key).ok());

        Ok(Self {
            project_dir,
            state_dir,
            toml,
            cli_port: None,
        })
    }

    /// Create SitecraftConfig with CLI overrides.
    pub fn with_cli_args(project_dir: PathBuf, port: Option<u16>) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.cli_port = port;
        Ok(config)
    }

    /// Server port (CLI → file → default).
    pub fn port(&self) -> u16 {
        self.cli_port.unwrap_or(self.toml.server.port)
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.state_dir.join("projects")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Media store root, resolved against the project dir when relative.
    pub fn media_dir(&self) -> PathBuf {
        let dir = &self.toml.video.storage_dir;
        if dir.is_absolute() {
            dir.clone()
        } else {
            self.project_dir.join(dir)
        }
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if self.toml.provider.api_key().is_none() {
            warnings.push(format!(
                "API key not set: export {} before chatting",
                self.toml.provider.api_key_env
            ));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::Openai);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        let err = "claude".parse::<ProviderKind>().unwrap_err();
        assert!(err.to_string().contains("Invalid provider kind"));
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = SitecraftToml::parse("").unwrap();
        assert_eq!(toml.provider.kind, ProviderKind::Openai);
        assert_eq!(toml.provider.timeout_secs, 30);
        assert_eq!(toml.chat.approve_keywords.len(), 8);
        assert!(toml.chat.change_keywords.contains(&"rever seções".to_string()));
        assert_eq!(toml.preview.lang, "pt-BR");
        assert_eq!(toml.video.timeout_secs, 300);
        assert_eq!(toml.server.port, 3141);
        assert_eq!(toml.ytdlp_cmd(), "yt-dlp");
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[provider]
kind = "gemini"
api_url = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-2.0-flash"
timeout_secs = 45

[chat]
approve_keywords = ["ok"]

[video]
ytdlp_cmd = "/opt/yt-dlp"
"#;
        let toml = SitecraftToml::parse(content).unwrap();
        assert_eq!(toml.provider.kind, ProviderKind::Gemini);
        assert_eq!(toml.provider.model, "gemini-2.0-flash");
        assert_eq!(toml.provider.timeout(), Duration::from_secs(45));
        assert_eq!(toml.chat.approve_keywords, vec!["ok"]);
        // Unset lists keep their defaults
        assert_eq!(toml.chat.change_keywords.len(), 4);
        assert_eq!(toml.ytdlp_cmd(), "/opt/yt-dlp");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = SitecraftToml::parse("[provider\nkind=").unwrap_err();
        assert!(err.to_string().contains("Failed to parse sitecraft.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SITECRAFT_PROVIDER_URL", "http://localhost:11434/v1"),
            ("SITECRAFT_MODEL", "llama3"),
            ("YTDLP_CMD", "/usr/local/bin/yt-dlp"),
        ]
        .into_iter()
        .collect();
        let mut toml = SitecraftToml::default();
        toml.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(toml.provider.api_url, "http://localhost:11434/v1");
        assert_eq!(toml.provider.model, "llama3");
        assert_eq!(toml.ytdlp_cmd(), "/usr/local/bin/yt-dlp");
    }

    #[test]
    fn test_file_ytdlp_cmd_beats_env() {
        let mut toml = SitecraftToml::parse("[video]\nytdlp_cmd = \"from-file\"").unwrap();
        toml.apply_env_from(|k| (k == "YTDLP_CMD").then(|| "from-env".to_string()));
        assert_eq!(toml.ytdlp_cmd(), "from-file");
    }

    #[test]
    fn test_validate() {
        assert!(SitecraftToml::default().validate().is_empty());

        let content = r#"
[provider]
api_url = "localhost"
timeout_secs = 0

[chat]
generation_verbs = ["gerar agora"]
"#;
        let warnings = SitecraftToml::parse(content).unwrap().validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("api_url"));
        assert!(warnings[2].contains("gerar agora"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = SitecraftToml::default();
        toml.server.port = 8080;
        toml.save(&path).unwrap();

        let loaded = SitecraftToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.server.port, 8080);
    }

    #[test]
    fn test_sitecraft_config_paths() {
        let dir = tempdir().unwrap();
        let config = SitecraftConfig::with_cli_args(dir.path().to_path_buf(), Some(9000)).unwrap();
        assert_eq!(config.port(), 9000);
        assert!(config.projects_dir().ends_with(".sitecraft/projects"));
        assert!(config.media_dir().ends_with(".sitecraft/media"));
        assert!(config.media_dir().is_absolute());
    }
}
