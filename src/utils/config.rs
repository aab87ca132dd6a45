use std::env;

use serde::Deserialize;

use crate::error::UploadError;
use crate::utils::constants::*;
use crate::utils::operations::parse_endpoint;

/// Settings for one remote. Every field may be overridden per remote.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Base upload endpoint; the file id is appended for updates.
    pub endpoint: String,
    pub chunk_size: u64,
    /// Response field mask sent with the negotiation request.
    pub fields: String,
    pub keep_revision_forever: bool,
    pub team_drive: bool,
    /// Provider flags passed through verbatim as query parameters.
    pub extra_params: Vec<(String, String)>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fields: DEFAULT_FIELDS.to_string(),
            keep_revision_forever: false,
            team_drive: false,
            extra_params: Vec::new(),
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, UploadError> {
        let mut config = UploadConfig::default();
        if let Ok(endpoint) = env::var("UPLOAD_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(chunk_size) = parse_var("UPLOAD_CHUNK_SIZE")? {
            config.chunk_size = chunk_size;
        }
        if let Some(keep) = parse_var("UPLOAD_KEEP_REVISION_FOREVER")? {
            config.keep_revision_forever = keep;
        }
        if let Some(team_drive) = parse_var("UPLOAD_TEAM_DRIVE")? {
            config.team_drive = team_drive;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if usize::try_from(self.chunk_size).is_err() {
            return Err(UploadError::InvalidConfig(format!(
                "chunk_size {} does not fit in memory",
                self.chunk_size
            )));
        }
        parse_endpoint(&self.endpoint)?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, UploadError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| UploadError::InvalidConfig(format!("{name}={raw:?} is not valid"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(DEFAULT_CHUNK_SIZE, config.chunk_size);
        assert_eq!(DEFAULT_UPLOAD_ENDPOINT, config.endpoint);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() -> Result<()> {
        let config: UploadConfig =
            serde_json::from_str(r#"{"chunk_size": 262144, "team_drive": true}"#)?;
        assert_eq!(262_144, config.chunk_size);
        assert!(config.team_drive);
        assert_eq!(DEFAULT_FIELDS, config.fields);
        Ok(())
    }

    #[test]
    fn test_extra_params_override() -> Result<()> {
        let config: UploadConfig =
            serde_json::from_str(r#"{"extra_params": [["ocrLanguage", "en"]]}"#)?;
        assert_eq!(vec![("ocrLanguage".to_string(), "en".to_string())], config.extra_params);
        Ok(())
    }

    #[rstest]
    #[case(UploadConfig { chunk_size: 0, ..Default::default() })]
    #[case(UploadConfig { endpoint: "not a url".to_string(), ..Default::default() })]
    #[case(UploadConfig { endpoint: String::new(), ..Default::default() })]
    fn test_validate_err(#[case] config: UploadConfig) {
        assert!(config.validate().is_err());
    }
}
