use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Top-level configuration for Metron.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetronConfig {
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub backends: BackendsConfig,
    pub roles: RolesConfig,
}

/// Configuration for the result cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a backend reply stays fresh, in seconds.
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 25 * 60,
        }
    }
}

/// Configuration for the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on any single stage, including cache waits.
    pub stage_timeout_ms: u64,
    /// Run the validator cross-check when the validator role resolves.
    pub validator_enabled: bool,
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: 30_000,
            validator_enabled: true,
        }
    }
}

/// Connection settings for one model provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub enabled: bool,
    /// Environment variable holding the API key. Missing or blank = backend not live.
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn gemini() -> Self {
        Self {
            enabled: true,
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            request_timeout_seconds: 30,
        }
    }

    pub fn deepseek() -> Self {
        Self {
            enabled: true,
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            request_timeout_seconds: 45,
        }
    }
}

/// Provider settings. Each table is merged key by key over its preset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "BackendsOverrides")]
pub struct BackendsConfig {
    pub gemini: BackendConfig,
    pub deepseek: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            gemini: BackendConfig::gemini(),
            deepseek: BackendConfig::deepseek(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendsOverrides {
    gemini: BackendOverrides,
    deepseek: BackendOverrides,
}

impl From<BackendsOverrides> for BackendsConfig {
    fn from(raw: BackendsOverrides) -> Self {
        Self {
            gemini: raw.gemini.apply_to(BackendConfig::gemini()),
            deepseek: raw.deepseek.apply_to(BackendConfig::deepseek()),
        }
    }
}

/// The keys present in one `[backends.*]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendOverrides {
    enabled: Option<bool>,
    api_key_env: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

impl BackendOverrides {
    fn apply_to(self, preset: BackendConfig) -> BackendConfig {
        BackendConfig {
            enabled: self.enabled.unwrap_or(preset.enabled),
            api_key_env: self.api_key_env.unwrap_or(preset.api_key_env),
            model: self.model.unwrap_or(preset.model),
            base_url: self.base_url.unwrap_or(preset.base_url),
            request_timeout_seconds: self
                .request_timeout_seconds
                .unwrap_or(preset.request_timeout_seconds),
        }
    }
}

/// Ordered backend ids per role. First live backend wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RolesConfig {
    pub scout: Vec<String>,
    pub strategist: Vec<String>,
    pub validator: Vec<String>,
    pub risk_officer: Vec<String>,
    pub backup: Vec<String>,
}

impl RolesConfig {
    pub fn candidates(&self, role: Role) -> &[String] {
        match role {
            Role::Scout => &self.scout,
            Role::Strategist => &self.strategist,
            Role::Validator => &self.validator,
            Role::RiskOfficer => &self.risk_officer,
            Role::Backup => &self.backup,
        }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            scout: vec!["gemini".to_string()],
            strategist: vec!["deepseek".to_string(), "gemini".to_string()],
            validator: vec![],
            risk_officer: vec!["gemini".to_string()],
            backup: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_metron_config() {
        let config = MetronConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: MetronConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn default_ttl_is_twenty_five_minutes() {
        assert_eq!(CacheConfig::default().ttl(), Duration::from_secs(1500));
    }

    #[test]
    fn default_roles_prefer_deepseek_for_strategy() {
        let roles = RolesConfig::default();
        assert_eq!(roles.candidates(Role::Strategist), ["deepseek", "gemini"]);
        assert_eq!(roles.candidates(Role::Scout), ["gemini"]);
        assert!(roles.candidates(Role::Validator).is_empty());
        assert!(roles.candidates(Role::Backup).is_empty());
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[cache]
ttl_seconds = 600

[pipeline]
stage_timeout_ms = 5000
validator_enabled = false

[backends.gemini]
enabled = true
api_key_env = "MY_GEMINI_KEY"
model = "gemini-2.0-flash"
base_url = "http://localhost:9000"
request_timeout_seconds = 10

[roles]
scout = ["gemini"]
strategist = ["gemini"]
validator = ["deepseek"]
"#;

        let config: MetronConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(600));
        assert_eq!(config.pipeline.stage_timeout(), Duration::from_millis(5000));
        assert!(!config.pipeline.validator_enabled);
        assert_eq!(config.backends.gemini.api_key_env, "MY_GEMINI_KEY");
        // Unlisted sections keep their defaults.
        assert_eq!(config.backends.deepseek, BackendConfig::deepseek());
        assert_eq!(config.roles.validator, vec!["deepseek".to_string()]);
        // Unlisted roles keep their default candidates too.
        assert_eq!(config.roles.risk_officer, vec!["gemini".to_string()]);
    }

    #[test]
    fn partial_backend_table_keeps_preset_keys() {
        let toml_str = r#"
[backends.gemini]
model = "gemini-2.5-pro"

[backends.deepseek]
enabled = false
request_timeout_seconds = 90
"#;

        let config: MetronConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.backends.gemini,
            BackendConfig {
                model: "gemini-2.5-pro".to_string(),
                ..BackendConfig::gemini()
            }
        );
        assert_eq!(
            config.backends.deepseek,
            BackendConfig {
                enabled: false,
                request_timeout_seconds: 90,
                ..BackendConfig::deepseek()
            }
        );
    }

    #[test]
    fn empty_backends_table_is_presets() {
        let config: MetronConfig = toml::from_str("[backends]\n[backends.gemini]\n").unwrap();
        assert_eq!(config.backends, BackendsConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config: MetronConfig = toml::from_str("").unwrap();
        assert_eq!(config, MetronConfig::default());
    }
}
