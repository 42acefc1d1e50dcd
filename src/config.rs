use crate::invoke::CommandRunner;
use crate::naming::NamingRules;
use crate::params::Params;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "avsp-menu.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the macros tree
    pub macros_dir: PathBuf,
    pub naming: NamingRules,
    /// Interpreter per script extension, e.g. `[runners.py]`; defaults to python for `.py`
    pub runners: HashMap<String, CommandRunner>,
    /// Per-macro parameters keyed by path relative to `macros_dir`
    pub params: HashMap<String, Params>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            macros_dir: PathBuf::from("macros"),
            naming: NamingRules::default(),
            runners: HashMap::from([("py".to_string(), CommandRunner::new("python"))]),
            params: HashMap::new(),
        }
    }
}

/// Load and parse the config file
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Like [`load_config`], but a missing file yields the defaults
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents).context("Failed to parse TOML config")?;

    // Accept ".py" as well as "py"
    for extension in &mut config.naming.extensions {
        *extension = extension.trim().trim_start_matches('.').to_string();
    }
    config.naming.extensions.retain(|e| !e.is_empty());
    if config.naming.extensions.is_empty() {
        bail!("naming.extensions must list at least one script extension");
    }

    for (extension, runner) in &config.runners {
        if runner.program.trim().is_empty() {
            bail!("Runner for .{} has an empty program", extension);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::KeySeparator;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.macros_dir, PathBuf::from("macros"));
        assert_eq!(config.naming, NamingRules::default());
        assert_eq!(config.runners["py"], CommandRunner::new("python"));
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            macros_dir = "C:/AvsPmod/macros"

            [naming]
            extensions = [".py", "PYW"]
            key_separator = "punctuation"
            natural_sort = false

            [runners.py]
            program = "python"
            args = ["-u"]

            [params."Encode/Encode with x264.py"]
            crf = 18
            "#,
        )
        .unwrap();

        assert_eq!(config.macros_dir, PathBuf::from("C:/AvsPmod/macros"));
        assert_eq!(config.naming.extensions, vec!["py", "PYW"]);
        assert!(config.naming.is_recognized("pyw"));
        assert_eq!(config.naming.key_separator, KeySeparator::Punctuation);
        assert!(!config.naming.natural_sort);
        assert_eq!(config.runners["py"].args, vec!["-u"]);
        assert_eq!(
            config.params["Encode/Encode with x264.py"].get_int("crf", 0),
            18
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(parse_config("[naming]\nextensions = []").is_err());
        assert!(parse_config("[naming]\nkey_separator = \"tabs\"").is_err());
        assert!(parse_config("[runners.py]\nprogram = \" \"").is_err());
        assert!(parse_config("macros_dir = ").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.macros_dir, PathBuf::from("macros"));
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }
}
