//! Configuration files.

use schemars::JsonSchema;

use crate::{
    extract::ExtractorConfig, image_input::DEFAULT_MAX_UPLOAD_SIZE, io::read_json_or_toml,
    prelude::*,
};

/// Settings loaded from `--config`. Every key is optional.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The largest image we will upload, in bytes.
    pub max_upload_size: u64,

    /// Cutoffs for picking the final result.
    pub extractor: ExtractorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Config {
    /// Load our config from `path`, or use the defaults.
    #[instrument(level = "debug")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => read_json_or_toml::<Config>(path).await?,
            None => Config::default(),
        };
        config.validate().with_context(|| match path {
            Some(path) => format!("invalid configuration in {:?}", path.display()),
            None => "invalid default configuration".to_owned(),
        })?;
        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Make sure our settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_size == 0 {
            bail!("max_upload_size must be greater than 0");
        }
        self.extractor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_defaults_without_a_file() {
        let config = Config::load(None).await.unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.extractor.similarity_threshold, 0.85);
    }

    #[tokio::test]
    async fn loads_partial_toml() {
        let dir = tempfile::TempDir::with_prefix("mathsnap").unwrap();
        let path = dir.path().join("mathsnap.toml");
        tokio::fs::write(&path, "[extractor]\nshorter_ratio = 0.5\n")
            .await
            .unwrap();
        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        assert_eq!(config.extractor.shorter_ratio, 0.5);
        assert_eq!(config.extractor.similarity_threshold, 0.85);
    }

    #[tokio::test]
    async fn rejects_unknown_keys_and_bad_values() {
        let dir = tempfile::TempDir::with_prefix("mathsnap").unwrap();
        let unknown = dir.path().join("unknown.json");
        tokio::fs::write(&unknown, r#"{"max_upload": 5}"#).await.unwrap();
        assert!(Config::load(Some(&unknown)).await.is_err());

        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, r#"{"extractor": {"similarity_threshold": 2.0}}"#)
            .await
            .unwrap();
        let err = Config::load(Some(&bad)).await.unwrap_err();
        assert!(format!("{err:#}").contains("similarity_threshold"));
    }
}
