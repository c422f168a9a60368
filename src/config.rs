use crate::types::*;
use std::{
  env,
  fs,
  path::PathBuf,
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("RAFFLE_CONFIG_PATH") {
    return resolve_repo_path(&raw);
  }
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_u64(key: &str) -> Option<u64> {
  env_default(key).and_then(|raw| raw.parse::<u64>().ok())
}

/// Environment variables win over the file so a show can be re-pointed at
/// another export without editing config.json.
pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if let Some(value) = env_default("RAFFLE_ENTRY_SOURCE") {
    config.entry_source = value;
  }
  if let Some(value) = env_default("RAFFLE_BIND_ADDR") {
    config.bind_addr = value;
  }
  if let Some(value) = env_default("RAFFLE_STATIC_DIR") {
    config.static_dir = value;
  }
  if let Some(seed) = env_u64("RAFFLE_DRAW_SEED") {
    config.draw_seed = Some(seed);
  }
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn save_config_inner(config: AppConfig) -> Result<AppConfig, String> {
  let path = config_path();
  let payload = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
  fs::write(&path, payload).map_err(|e| format!("write config {}: {e}", path.display()))?;
  Ok(config)
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn resolve_static_dir(config: &AppConfig) -> PathBuf {
  let trimmed = config.static_dir.trim();
  if trimmed.is_empty() {
    return repo_root().join(DEFAULT_STATIC_DIR);
  }
  resolve_repo_path(trimmed)
}

pub fn log_env_warnings(config: &AppConfig) {
  let mut warnings = Vec::new();

  if config.entry_source.trim().is_empty() {
    warnings.push("RAFFLE_ENTRY_SOURCE not set and no entry source in config; the draw will run on an empty roster".to_string());
  }
  if config.winner_count == 0 {
    warnings.push("winnerCount is 0; the results view will be empty".to_string());
  }
  let static_dir = resolve_static_dir(config);
  if !static_dir.is_dir() {
    warnings.push(format!("static dir {} not found; only the JSON endpoints will be served", static_dir.display()));
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
