// src/insights/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PATH: &str = "INSIGHTS_CONFIG_PATH";

pub const DEFAULT_CHUNK_SIZE: usize = 25;
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
pub use super::cache::DEFAULT_CACHE_CAPACITY;

/// Scheduler and cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw data points processed between two yield points.
    pub chunk_size: usize,
    /// Memoization cache ceiling.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Live-preview tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub debounce_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub pipeline: PipelineConfig,
    pub preview: PreviewConfig,
}

impl InsightsConfig {
    /// Zero sizes would stall the scheduler or make the cache useless; reset them.
    fn sanitized(mut self) -> Self {
        if self.pipeline.chunk_size == 0 {
            self.pipeline.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.pipeline.cache_capacity == 0 {
            self.pipeline.cache_capacity = DEFAULT_CACHE_CAPACITY;
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<InsightsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading insights config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing insights config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $INSIGHTS_CONFIG_PATH
/// 2) config/insights.toml
/// 3) config/insights.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<InsightsConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("INSIGHTS_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/insights.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/insights.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(InsightsConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<InsightsConfig> {
    // JSON only when hinted or when the content clearly is an object.
    let try_json = hint_ext == "json" || s.trim_start().starts_with('{');
    if try_json {
        if let Ok(v) = serde_json::from_str::<InsightsConfig>(s) {
            return Ok(v.sanitized());
        }
    }
    let v: InsightsConfig = toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))?;
    Ok(v.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn toml_and_json_parse_with_defaults() {
        let toml = r#"
[pipeline]
chunk_size = 10
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.pipeline.chunk_size, 10);
        assert_eq!(cfg.pipeline.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(cfg.preview.debounce_ms, DEFAULT_DEBOUNCE_MS);

        let json = r#"{"preview": {"debounce_ms": 500}, "pipeline": {"cache_capacity": 0}}"#;
        let cfg = parse_config(json, "json").unwrap();
        assert_eq!(cfg.preview.debounce(), Duration::from_millis(500));
        assert_eq!(cfg.pipeline.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_config("pipeline = [", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so the repo's own config/ is not read.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files → defaults
        let v = load_config_default().unwrap();
        assert_eq!(v, InsightsConfig::default());

        // Env wins
        let p_json = tmp.path().join("insights.json");
        fs::write(&p_json, r#"{"pipeline": {"chunk_size": 7}}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_config_default().unwrap();
        assert_eq!(v2.pipeline.chunk_size, 7);
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
