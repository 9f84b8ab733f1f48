use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::OutputMode;

/// CLI configuration file name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "infra-forge.toml";

/// CLI configuration loaded from `infra-forge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// How results are rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: default_color(),
        }
    }
}

/// Log filter used when neither `-v` nor `INFRA_FORGE_LOG` is given.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Directory emitted documents are written to.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

fn default_format() -> String {
    "human".to_string()
}

fn default_color() -> bool {
    true
}

/// Settings after merging the config file with CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub format: OutputMode,
    pub color: bool,
    pub log_filter: String,
    pub out_dir: Option<PathBuf>,
}

/// Discovery order for the config file:
/// 1. `--config <path>` or `INFRA_FORGE_CONFIG` (both arrive through clap)
/// 2. `./infra-forge.toml` (project-local)
/// 3. `$XDG_CONFIG_HOME/infra-forge/config.toml`
/// 4. `~/.config/infra-forge/config.toml`
///
/// An explicit path must exist; the others are skipped when absent.
pub fn load_config(explicit_path: Option<&Path>) -> Result<CliConfig, CliError> {
    if let Some(path) = explicit_path {
        return load_config_from_path(path);
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return load_config_from_path(&local);
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg).join("infra-forge/config.toml");
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config/infra-forge/config.toml");
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Ok(CliConfig::default())
}

fn load_config_from_path(path: &Path) -> Result<CliConfig, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = parse_config(&contents).map_err(|message| CliError::Config {
        message: format!("failed to parse {}: {message}", path.display()),
    })?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn parse_config(contents: &str) -> Result<CliConfig, String> {
    toml::from_str(contents).map_err(|e| e.to_string())
}

/// Resolve effective settings from config + CLI overrides.
///
/// CLI flags take precedence over config file values.
pub fn resolve_settings(config: &CliConfig, global: &GlobalOpts) -> Result<Settings, CliError> {
    let format_name = global.format.as_deref().unwrap_or(&config.output.format);
    let format = OutputMode::from_name(format_name).ok_or_else(|| CliError::Config {
        message: format!(
            "unknown output format '{format_name}'; expected human, rich, json or plain"
        ),
    })?;

    Ok(Settings {
        format,
        color: config.output.color && !global.no_color,
        log_filter: log_filter(config, global),
        out_dir: config.build.out_dir.clone(),
    })
}

/// `-q` and `-v` counts override the configured filter.
fn log_filter(config: &CliConfig, global: &GlobalOpts) -> String {
    if global.quiet {
        return "error".to_string();
    }
    match global.verbose {
        0 => config
            .log
            .filter
            .clone()
            .unwrap_or_else(|| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
