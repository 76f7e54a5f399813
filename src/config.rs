use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::history::HistoryMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` picks `# ` for root and `$ ` for everyone else.
    pub prompt: Option<String>,
    pub history_max: usize,
    pub history_mode: HistoryMode,
    pub job_control: JobControlMode,
    pub log: String,
    pub env_vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobControlMode {
    /// Enabled when standard input is a terminal.
    Auto,
    On,
    Off,
}

impl JobControlMode {
    pub fn resolve(self, stdin_is_tty: bool) -> bool {
        match self {
            JobControlMode::Auto => stdin_is_tty,
            JobControlMode::On => true,
            JobControlMode::Off => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("config parse error: {0}")]
    Parse(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: None,
            history_max: 1000,
            history_mode: HistoryMode::DisallowDuplicates,
            job_control: JobControlMode::Auto,
            log: "warn".to_string(),
            env_vars: BTreeMap::new(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&src)
    }

    /// `--config` wins; otherwise `$HOME/.jobshrc` is used if present.
    pub fn discover(explicit: Option<&Path>, home: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match home.map(|h| h.join(".jobshrc")) {
            Some(rc) if rc.is_file() => Self::load_from_file(rc),
            _ => Ok(Self::default_config()),
        }
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let lineno = lineno + 1;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno, line)));
            };
            let key = key.trim();
            // The prompt keeps its spaces; everything else is trimmed.
            let trimmed = value.trim();

            match key {
                "prompt" => config.prompt = Some(value.to_string()),
                "history_max" => {
                    config.history_max = trimmed.parse::<usize>().map_err(|_| {
                        ConfigError::Parse(format!("Line {}: Invalid usize: {}", lineno, line))
                    })?
                }
                "history_duplicates" => {
                    config.history_mode = match trimmed {
                        "allow" => HistoryMode::AllowDuplicates,
                        "ignore" => HistoryMode::DisallowDuplicates,
                        _ => {
                            return Err(ConfigError::Parse(format!(
                                "Line {}: Expected allow or ignore: {}",
                                lineno, line
                            )))
                        }
                    }
                }
                "job_control" => {
                    config.job_control = match trimmed {
                        "auto" => JobControlMode::Auto,
                        "on" => JobControlMode::On,
                        "off" => JobControlMode::Off,
                        _ => {
                            return Err(ConfigError::Parse(format!(
                                "Line {}: Expected auto, on or off: {}",
                                lineno, line
                            )))
                        }
                    }
                }
                "log" => config.log = trimmed.to_string(),
                k if k.starts_with("env.") => {
                    let var = k.trim_start_matches("env.");
                    if var.is_empty() {
                        let msg = format!("Line {}: Empty variable name", lineno);
                        return Err(ConfigError::Parse(msg));
                    }
                    config.env_vars.insert(var.to_string(), value.to_string());
                }
                _ => {
                    let msg = format!("Line {}: Unknown key: {}", lineno, key);
                    return Err(ConfigError::Parse(msg));
                }
            }
        }

        Ok(config)
    }
}
