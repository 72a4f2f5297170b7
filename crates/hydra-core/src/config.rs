//! Configuration: defaults overlaid by environment variables (spec §6
//! "Configuration"), plus the persisted user-preferences file (spec §5
//! "Preferences file").
//!
//! Grounded on the original `core/config_loader.py` (defaults dict
//! overlaid by `HYDRA_*` environment variables) and the teacher's
//! provider-configuration builders in `dashflow-factories`.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::request::RoutingMode;

fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.95
}
fn default_repeat_penalty() -> f64 {
    1.1
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_thinking_tokens() -> u32 {
    8000
}
fn default_max_critique_iterations() -> u32 {
    2
}
fn default_deep_thinking_tokens() -> u32 {
    32000
}
fn default_deep_thinking_iterations() -> u32 {
    3
}
fn default_deep_thinking_threshold() -> f64 {
    8.0
}
fn default_probe_interval_secs() -> u64 {
    120
}
fn default_light_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_heavy_model() -> String {
    "llama3.1:70b".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_json_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_max_concurrent_per_node() -> u32 {
    3
}
fn default_n_max_agent_iterations() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

/// All recognized configuration options (spec §6), each carrying the
/// stated default via `#[serde(default = ...)]` so a partial TOML file
/// (or no file at all) still produces a fully populated config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraConfig {
    // Orchestration models
    #[serde(default = "default_light_model")]
    pub light_model: String,
    #[serde(default = "default_heavy_model")]
    pub heavy_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // Code model lists
    pub code_models: Vec<String>,
    pub general_models: Vec<String>,
    pub math_models: Vec<String>,
    pub reasoning_models: Vec<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_json_model")]
    pub json_model: String,

    // Sampling
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f64,

    // Reasoning
    pub mode: String,
    pub style: String,
    #[serde(default = "default_max_thinking_tokens")]
    pub max_thinking_tokens: u32,
    #[serde(default = "default_max_critique_iterations")]
    pub max_critique_iterations: u32,
    pub use_reasoning_model: bool,
    pub show_thinking: bool,
    #[serde(default = "default_deep_thinking_tokens")]
    pub deep_thinking_tokens: u32,
    #[serde(default = "default_deep_thinking_iterations")]
    pub deep_thinking_iterations: u32,
    #[serde(default = "default_deep_thinking_threshold")]
    pub deep_thinking_threshold: f64,

    // Discovery
    #[serde(default = "default_true")]
    pub discovery_enabled: bool,
    pub manual_nodes: Vec<String>,
    pub network_scan: bool,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    pub vram_monitoring: bool,

    // Pool
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_concurrent_per_node")]
    pub max_concurrent_per_node: u32,

    // Agent
    #[serde(default = "default_n_max_agent_iterations")]
    pub n_max_agent_iterations: u32,

    /// Open Question resolved (spec §9): leave model autopull behind a
    /// flag, default `false`, and never block requests on a pull.
    pub auto_pull: bool,

    /// Per-model weights for weighted-voting synthesis (spec §4.7.1).
    /// A model absent from this map votes with weight `1.0`.
    pub model_weights: HashMap<String, f64>,
}

impl Default for HydraConfig {
    fn default() -> Self {
        Self {
            light_model: default_light_model(),
            heavy_model: default_heavy_model(),
            max_tokens: default_max_tokens(),
            code_models: vec!["qwen2.5-coder:7b".to_string(), "qwen2.5-coder:32b".to_string()],
            general_models: vec!["llama3.2:3b".to_string(), "llama3.1:70b".to_string()],
            math_models: vec!["qwen2.5-math:7b".to_string()],
            reasoning_models: vec!["deepseek-r1:7b".to_string()],
            embedding_model: default_embedding_model(),
            json_model: default_json_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            mode: "auto".to_string(),
            style: "chain_of_thought".to_string(),
            max_thinking_tokens: default_max_thinking_tokens(),
            max_critique_iterations: default_max_critique_iterations(),
            use_reasoning_model: false,
            show_thinking: true,
            deep_thinking_tokens: default_deep_thinking_tokens(),
            deep_thinking_iterations: default_deep_thinking_iterations(),
            deep_thinking_threshold: default_deep_thinking_threshold(),
            discovery_enabled: true,
            manual_nodes: Vec::new(),
            network_scan: false,
            probe_interval_secs: default_probe_interval_secs(),
            vram_monitoring: true,
            max_attempts: default_max_attempts(),
            max_concurrent_per_node: default_max_concurrent_per_node(),
            n_max_agent_iterations: default_n_max_agent_iterations(),
            auto_pull: false,
            model_weights: HashMap::new(),
        }
    }
}

impl HydraConfig {
    /// Loads defaults, overlays an optional TOML file (`./hydra.toml` or
    /// `$HYDRA_CONFIG`), then overlays `HYDRA_*` environment variables.
    /// Environment always wins, per spec §6.
    pub fn load() -> Result<Self, Error> {
        let mut config = Self::default();

        let path = std::env::var("HYDRA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("hydra.toml"));
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::configuration(format!("reading {}: {e}", path.display())))?;
            config = toml::from_str(&contents)
                .map_err(|e| Error::configuration(format!("parsing {}: {e}", path.display())))?;
        }

        config.apply_env_overlay();
        Ok(config)
    }

    fn apply_env_overlay(&mut self) {
        macro_rules! overlay_str {
            ($field:expr, $var:literal) => {
                if let Ok(v) = std::env::var($var) {
                    $field = v;
                }
            };
        }
        macro_rules! overlay_parse {
            ($field:expr, $var:literal) => {
                if let Ok(v) = std::env::var($var) {
                    if let Ok(parsed) = v.parse() {
                        $field = parsed;
                    }
                }
            };
        }
        macro_rules! overlay_list {
            ($field:expr, $var:literal) => {
                if let Ok(v) = std::env::var($var) {
                    $field = v.split(',').map(|s| s.trim().to_string()).collect();
                }
            };
        }

        overlay_str!(self.light_model, "HYDRA_LIGHT_MODEL");
        overlay_str!(self.heavy_model, "HYDRA_HEAVY_MODEL");
        overlay_parse!(self.max_tokens, "HYDRA_MAX_TOKENS");
        overlay_list!(self.code_models, "HYDRA_CODE_MODELS");
        overlay_list!(self.general_models, "HYDRA_GENERAL_MODELS");
        overlay_list!(self.math_models, "HYDRA_MATH_MODELS");
        overlay_list!(self.reasoning_models, "HYDRA_REASONING_MODELS");
        overlay_str!(self.embedding_model, "HYDRA_EMBEDDING_MODEL");
        overlay_str!(self.json_model, "HYDRA_JSON_MODEL");
        overlay_parse!(self.temperature, "HYDRA_TEMPERATURE");
        overlay_parse!(self.top_p, "HYDRA_TOP_P");
        overlay_parse!(self.repeat_penalty, "HYDRA_REPEAT_PENALTY");
        overlay_str!(self.mode, "HYDRA_MODE");
        overlay_str!(self.style, "HYDRA_STYLE");
        overlay_parse!(self.max_thinking_tokens, "HYDRA_MAX_THINKING_TOKENS");
        overlay_parse!(self.max_critique_iterations, "HYDRA_MAX_CRITIQUE_ITERATIONS");
        overlay_parse!(self.use_reasoning_model, "HYDRA_USE_REASONING_MODEL");
        overlay_parse!(self.show_thinking, "HYDRA_SHOW_THINKING");
        overlay_parse!(self.deep_thinking_tokens, "HYDRA_DEEP_THINKING_TOKENS");
        overlay_parse!(self.deep_thinking_iterations, "HYDRA_DEEP_THINKING_ITERATIONS");
        overlay_parse!(self.deep_thinking_threshold, "HYDRA_DEEP_THINKING_THRESHOLD");
        overlay_parse!(self.discovery_enabled, "HYDRA_DISCOVERY_ENABLED");
        overlay_list!(self.manual_nodes, "HYDRA_MANUAL_NODES");
        overlay_parse!(self.network_scan, "HYDRA_NETWORK_SCAN");
        overlay_parse!(self.probe_interval_secs, "HYDRA_PROBE_INTERVAL_SECS");
        overlay_parse!(self.vram_monitoring, "HYDRA_VRAM_MONITORING");
        overlay_parse!(self.max_attempts, "HYDRA_MAX_ATTEMPTS");
        overlay_parse!(self.max_concurrent_per_node, "HYDRA_MAX_CONCURRENT_PER_NODE");
        overlay_parse!(self.n_max_agent_iterations, "HYDRA_N_MAX_AGENT_ITERATIONS");
        overlay_parse!(self.auto_pull, "HYDRA_AUTO_PULL");
    }
}

/// Routing and UI preferences persisted at `~/.hydra/user_preferences.json`
/// (spec §5, §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub mode: Option<RoutingMode>,
    pub priority: Option<u8>,
    pub min_success_rate: Option<f64>,
    pub prefer_cpu: bool,
    pub show_thinking_ui: bool,
    pub show_tool_calls_ui: bool,
}

impl UserPreferences {
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hydra")
            .join("user_preferences.json")
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&contents).map_err(Into::into)
    }

    /// Writes the preferences file with an advisory exclusive lock, so
    /// concurrent writers serialize and the last writer wins (spec §5
    /// "writes are serialized by a file lock and are last-write-wins").
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::configuration(format!("creating {}: {e}", parent.display())))?;
        }
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::configuration(format!("opening {}: {e}", path.display())))?;
        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| Error::configuration(format!("locking {}: {e}", path.display())))?;
        let mut file = file;
        let json = serde_json::to_string_pretty(self)?;
        file.write_all(json.as_bytes())
            .map_err(|e| Error::configuration(format!("writing {}: {e}", path.display())))?;
        fs2::FileExt::unlock(&file).ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_spec() {
        let cfg = HydraConfig::default();
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.top_p, 0.95);
        assert_eq!(cfg.repeat_penalty, 1.1);
        assert_eq!(cfg.max_thinking_tokens, 8000);
        assert_eq!(cfg.max_critique_iterations, 2);
        assert_eq!(cfg.deep_thinking_tokens, 32000);
        assert_eq!(cfg.deep_thinking_iterations, 3);
        assert!((cfg.deep_thinking_threshold - 8.0).abs() < 1e-9);
        assert_eq!(cfg.probe_interval_secs, 120);
        assert!(!cfg.auto_pull);
    }

    #[test]
    fn env_overlay_wins_over_default() {
        std::env::set_var("HYDRA_TEMPERATURE", "0.2");
        let mut cfg = HydraConfig::default();
        cfg.apply_env_overlay();
        assert!((cfg.temperature - 0.2).abs() < 1e-9);
        std::env::remove_var("HYDRA_TEMPERATURE");
    }

    #[test]
    fn preferences_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let prefs = UserPreferences {
            mode: Some(RoutingMode::Reliable),
            priority: Some(7),
            min_success_rate: Some(0.9),
            prefer_cpu: true,
            show_thinking_ui: true,
            show_tool_calls_ui: false,
        };
        prefs.save(&path).unwrap();
        let loaded = UserPreferences::load(&path).unwrap();
        assert_eq!(prefs, loaded);
    }

    #[test]
    fn missing_preferences_file_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded = UserPreferences::load(&path).unwrap();
        assert_eq!(loaded, UserPreferences::default());
    }
}
