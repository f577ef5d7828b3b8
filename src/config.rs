use crate::dispatch::rules::{calculator_rules, OverrideRule};
use crate::sandbox::{ProcessRunner, DEFAULT_INTERPRETER, DEFAULT_TIMEOUT_SECS};
use crate::tools::read_file::MAX_CHARACTERS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub runner: RunnerConfig,
    pub limits: LimitsConfig,
    /// Working-directory overrides. Omitted in a config file means none.
    #[serde(default)]
    pub rules: Vec<OverrideRule>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SandboxConfig {
    pub root: String,
    pub project_root: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunnerConfig {
    pub interpreter: String,
    pub extension: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_characters: usize,
}

impl RunnerConfig {
    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new(&self.interpreter, Duration::from_secs(self.timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig {
                root: "calculator".to_string(),
                project_root: ".".to_string(),
            },
            runner: RunnerConfig {
                interpreter: DEFAULT_INTERPRETER.to_string(),
                extension: "py".to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            limits: LimitsConfig {
                max_characters: MAX_CHARACTERS,
            },
            rules: calculator_rules(),
        }
    }
}

impl Config {
    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load config from ~/.corral/config.toml, falling back to defaults.
    pub fn load() -> Self {
        match dirs::home_dir() {
            Some(home) => Self::load_from(&home.join(".corral").join("config.toml")),
            None => Self::default(),
        }
    }

    /// Load config from `path`, falling back to defaults if it is missing or broken.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::rules::{Root, RuleEffect};

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.sandbox.root, "calculator");
        assert_eq!(config.sandbox.project_root, ".");
        assert_eq!(config.runner.interpreter, "python3");
        assert_eq!(config.runner.extension, "py");
        assert_eq!(config.runner.timeout_secs, 30);
        assert_eq!(config.limits.max_characters, 10_000);
        assert_eq!(config.rules.len(), 4);
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();

        assert_eq!(parsed.sandbox.root, config.sandbox.root);
        assert_eq!(parsed.runner.interpreter, config.runner.interpreter);
        assert_eq!(parsed.limits.max_characters, config.limits.max_characters);
        assert_eq!(parsed.rules, config.rules);
    }

    #[test]
    fn test_config_parse_custom_values() {
        let toml_str = r#"
[sandbox]
root = "workspace"
project_root = "/srv/project"

[runner]
interpreter = "/opt/python/bin/python3.12"
extension = "py"
timeout_secs = 5

[limits]
max_characters = 2000

[[rules]]
tool = "run_script"
argument = "file_path"
values = ["main.py"]
effect = { kind = "use_root", root = "project" }

[[rules]]
tool = "read_file"
argument = "file_path"
values = ["render.py"]
effect = { kind = "prefix", prefix = "pkg/" }
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.sandbox.root, "workspace");
        assert_eq!(config.runner.timeout_secs, 5);
        assert_eq!(config.limits.max_characters, 2000);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(
            config.rules[0].effect,
            RuleEffect::UseRoot { root: Root::Project }
        );
        assert_eq!(
            config.rules[1].effect,
            RuleEffect::Prefix { prefix: "pkg/".to_string() }
        );

        let runner = config.runner.process_runner();
        assert_eq!(runner.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_rules_default_to_empty() {
        let toml_str = r#"
[sandbox]
root = "."
project_root = "."

[runner]
interpreter = "python3"
extension = "py"
timeout_secs = 30

[limits]
max_characters = 10000
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_config_parse_invalid_toml() {
        assert!(Config::from_toml("this is not valid toml {{{").is_err());
    }

    #[test]
    fn test_config_parse_missing_section() {
        let toml_str = r#"
[sandbox]
root = "."
project_root = "."
"#;
        assert!(Config::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_config_parse_wrong_type() {
        let toml_str = r#"
[sandbox]
root = "."
project_root = "."

[runner]
interpreter = "python3"
extension = "py"
timeout_secs = "thirty"

[limits]
max_characters = 10000
"#;
        assert!(Config::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_load_from_missing_file_returns_defaults() {
        let config = Config::load_from(Path::new("/nonexistent_corral/config.toml"));
        assert_eq!(config.sandbox.root, "calculator");
    }

    #[test]
    fn test_load_from_broken_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.runner.timeout_secs, 30);
    }
}
