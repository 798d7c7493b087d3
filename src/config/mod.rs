mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

// Embedded default prompts
const LANGUAGE_PROMPT: &str = include_str!("../../prompts/language.md");
const ANALYSIS_PROMPT: &str = include_str!("../../prompts/analysis.md");
const CLARITY_PROMPT: &str = include_str!("../../prompts/clarity.md");
const GENERIC_PROMPT: &str = include_str!("../../prompts/generic.md");
const SUMMARY_PROMPT: &str = include_str!("../../prompts/summary.md");

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            provider: Provider::default(),
            concurrency: default_concurrency(),
            launch_delay_ms: default_launch_delay_ms(),
            timeout_sec: default_timeout_sec(),
            run_timeout_sec: None,
            report_dir: default_report_dir(),
            max_document_bytes: default_max_document_bytes(),
            pdftotext: default_pdftotext_binary(),
            providers: ProvidersConfig::default(),
            summary: SummaryConfig::default(),
            criteria: default_criteria(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config, using built-in defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("Config {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.id.as_str()) {
                return Err(ConfigError::DuplicateCriterion(criterion.id.clone()));
            }
        }

        if self.enabled_criteria().next().is_none() {
            return Err(ConfigError::NoCriteriaEnabled);
        }

        let uses_chat_api = self.summary.provider == Some(Provider::ChatApi)
            || self
                .enabled_criteria()
                .any(|c| self.provider_for(c) == Provider::ChatApi);
        if uses_chat_api && self.providers.chat_api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        Ok(())
    }

    pub fn enabled_criteria(&self) -> impl Iterator<Item = &CriterionConfig> {
        self.criteria.iter().filter(|c| c.enabled)
    }

    /// Keep only the listed criteria enabled; every id must name a configured criterion
    pub fn retain_criteria(&mut self, ids: &[String]) -> Result<(), ConfigError> {
        if let Some(unknown) = ids
            .iter()
            .find(|id| !self.criteria.iter().any(|c| &c.id == *id))
        {
            return Err(ConfigError::UnknownCriterion(unknown.clone()));
        }

        for criterion in &mut self.criteria {
            if !ids.contains(&criterion.id) {
                criterion.enabled = false;
            }
        }
        Ok(())
    }

    pub fn provider_for(&self, criterion: &CriterionConfig) -> Provider {
        criterion.provider.unwrap_or(self.provider)
    }

    pub fn summary_provider(&self) -> Provider {
        self.summary.provider.unwrap_or(self.provider)
    }

    pub fn timeout_for(&self, criterion: &CriterionConfig) -> std::time::Duration {
        std::time::Duration::from_secs(criterion.timeout_sec.unwrap_or(self.timeout_sec))
    }

    pub fn summary_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.summary.timeout_sec.unwrap_or(self.timeout_sec))
    }

    /// Prompt template for a criterion: its prompt file, else the embedded prompt
    pub fn criterion_prompt(&self, criterion: &CriterionConfig) -> Result<String, ConfigError> {
        if let Some(path) = &criterion.prompt_file {
            return read_prompt(path);
        }

        let prompt = match criterion.id.as_str() {
            "language" => LANGUAGE_PROMPT.to_string(),
            "analysis" => ANALYSIS_PROMPT.to_string(),
            "clarity" => CLARITY_PROMPT.to_string(),
            _ => GENERIC_PROMPT.replace("{{CRITERION}}", &criterion.name.to_lowercase()),
        };
        Ok(prompt)
    }

    pub fn summary_prompt(&self) -> Result<String, ConfigError> {
        match &self.summary.prompt_file {
            Some(path) => read_prompt(path),
            None => Ok(SUMMARY_PROMPT.to_string()),
        }
    }
}

fn read_prompt(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::PromptFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        let ids: Vec<_> = config.enabled_criteria().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["language", "analysis", "clarity"]);
    }

    #[test]
    fn test_parse_yaml_with_overrides() {
        let yaml = r#"
provider: chat_api
concurrency: 2
criteria:
  - id: structure
    name: Structure
  - id: language
    name: Language quality
    provider: codex_cli
    timeout_sec: 30
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.criteria.len(), 2);
        assert_eq!(config.provider_for(&config.criteria[0]), Provider::ChatApi);
        assert_eq!(config.provider_for(&config.criteria[1]), Provider::CodexCli);
        assert_eq!(config.timeout_for(&config.criteria[1]).as_secs(), 30);
        assert_eq!(config.providers.chat_api.model, "sonar");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_no_enabled_criteria() {
        let mut config = Config::default();
        for criterion in &mut config.criteria {
            criterion.enabled = false;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoCriteriaEnabled)
        ));
    }

    #[test]
    fn test_retain_criteria() {
        let mut config = Config::default();
        config.retain_criteria(&["clarity".to_string()]).unwrap();
        let ids: Vec<_> = config.enabled_criteria().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clarity"]);
    }

    #[test]
    fn test_retain_criteria_rejects_unknown_id() {
        let mut config = Config::default();
        let err = config
            .retain_criteria(&["language".to_string(), "typo".to_string()])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCriterion(id) if id == "typo"));
        // Nothing is disabled on error
        assert_eq!(config.enabled_criteria().count(), 3);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut config = Config::default();
        config
            .criteria
            .push(CriterionConfig::builtin("language", "Again"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCriterion(id)) if id == "language"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroConcurrency)));
    }

    #[test]
    fn test_generic_prompt_names_criterion() {
        let config = Config::default();
        let criterion = CriterionConfig::builtin("structure", "Essay Structure");
        let prompt = config.criterion_prompt(&criterion).unwrap();
        assert!(prompt.contains("essay structure"));
        assert!(!prompt.contains("{{CRITERION}}"));
    }

    #[test]
    fn test_prompt_file_missing() {
        let config = Config::default();
        let mut criterion = CriterionConfig::builtin("language", "Language");
        criterion.prompt_file = Some("does/not/exist.md".into());
        assert!(matches!(
            config.criterion_prompt(&criterion),
            Err(ConfigError::PromptFile { .. })
        ));
    }
}
