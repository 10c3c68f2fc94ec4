use anyhow::{Context, Result};
use docqa_answer::AnswerConfig;
use docqa_retrieval::RankingConfig;
use serde::Deserialize;
use std::path::Path;

/// Contents of a `--config` TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocqaConfig {
    #[serde(default)]
    pub retrieval: RankingConfig,

    #[serde(default)]
    pub answer: AnswerConfig,
}

impl DocqaConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid configuration")?;
        config
            .retrieval
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [retrieval] configuration")?;
        config
            .answer
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [answer] configuration")?;
        Ok(config)
    }

    /// Load `path`, or the defaults when no path is given
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_tables_take_defaults() {
        let config = DocqaConfig::from_toml_str(
            r#"
            [retrieval]
            standard_per_source_cap = 2

            [retrieval.boosts]
            currency = 0.2

            [answer]
            max_sources = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.standard_per_source_cap, 2);
        assert_eq!(config.retrieval.boosts.currency, 0.2);
        assert_eq!(config.retrieval.boosts.digits, 0.15);
        assert_eq!(config.answer.max_sources, 5);
        assert_eq!(config.answer.display_threshold, 0.5);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = DocqaConfig::from_toml_str("").unwrap();
        assert_eq!(config.retrieval.comparative_min_per_source, 2);
        assert!(config.retrieval.enable_cache);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = DocqaConfig::from_toml_str("[answer]\nretrieval_weight = 0.9\n").unwrap_err();
        assert!(format!("{err:#}").contains("sum to 1.0"));
    }
}
