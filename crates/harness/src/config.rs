//! Harness configuration, loaded from JSON.

use std::path::{Path, PathBuf};

use citadel_parser::{AllowPolicy, AllowPreset, Sanitizer};
use citadel_security::{Policy, PolicyPreset};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};
use crate::input::PayloadShape;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "CITADEL_AUDIT_CONFIG";

pub const DEFAULT_MAX_INPUT_LEN: usize = 50_000;

/// Parser-failure inputs kept under the artifacts directory
pub const DEFAULT_MAX_PARSER_ARTIFACTS: usize = 100;

/// Settings shared by the driver, the sinks and the CLI.
///
/// Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Classifier policy applied to cleaned output
    pub classifier_preset: PolicyPreset,
    /// Allow-list handed to the sanitizer
    pub allow_preset: AllowPreset,
    pub preserve_relative_links: bool,
    /// Base URL for resolving relative links when they are not preserved
    pub base_url: Option<String>,
    /// Wrapping for inputs that are not markup
    pub payload_shape: PayloadShape,
    /// Inputs longer than this many bytes are skipped
    pub max_input_len: usize,
    pub findings_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub max_parser_artifacts: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            classifier_preset: PolicyPreset::Strict,
            allow_preset: AllowPreset::Relaxed,
            preserve_relative_links: false,
            base_url: None,
            payload_shape: PayloadShape::ImgSrc,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            findings_dir: PathBuf::from("findings"),
            artifacts_dir: PathBuf::from("artifacts"),
            max_parser_artifacts: DEFAULT_MAX_PARSER_ARTIFACTS,
        }
    }
}

impl HarnessConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded harness configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the file named by `CITADEL_AUDIT_CONFIG`, or use defaults
    pub fn from_env() -> HarnessResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.max_input_len == 0 {
            return Err(HarnessError::Config(
                "max_input_len must be at least 1".to_string(),
            ));
        }
        if self.findings_dir.as_os_str().is_empty() || self.artifacts_dir.as_os_str().is_empty() {
            return Err(HarnessError::Config(
                "findings_dir and artifacts_dir must be set".to_string(),
            ));
        }
        if matches!(self.base_url.as_deref(), Some(base) if base.trim().is_empty()) {
            return Err(HarnessError::Config("base_url must not be blank".to_string()));
        }
        Ok(())
    }

    /// The classifier policy for the configured preset
    pub fn policy(&self) -> Policy {
        self.classifier_preset.policy()
    }

    /// The allow-list for the configured preset and link handling
    pub fn allow_policy(&self) -> AllowPolicy {
        AllowPolicy::from_preset(self.allow_preset)
            .preserve_relative_links(self.preserve_relative_links)
            .base_url(self.base_url.as_deref())
    }

    pub fn sanitizer(&self) -> HarnessResult<Sanitizer> {
        Ok(Sanitizer::new(self.allow_policy())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.classifier_preset, PolicyPreset::Strict);
        assert_eq!(config.allow_preset, AllowPreset::Relaxed);
        assert_eq!(config.max_input_len, 50_000);
        assert_eq!(config.max_parser_artifacts, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HarnessConfig = serde_json::from_str(
            r#"{"classifier_preset": "wide-net", "allow_preset": "basic", "preserve_relative_links": true}"#,
        )
        .unwrap();
        assert_eq!(config.classifier_preset, PolicyPreset::WideNet);
        assert_eq!(config.allow_preset, AllowPreset::Basic);
        assert!(config.allow_policy().preserves_relative_links());
        assert_eq!(config.findings_dir, PathBuf::from("findings"));
        assert!(config.policy().wide_text_scan());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = HarnessConfig {
            max_input_len: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));

        let config = HarnessConfig {
            base_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_base_url_fails_sanitizer() {
        let config = HarnessConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.sanitizer(), Err(HarnessError::Parser(_))));
    }
}
