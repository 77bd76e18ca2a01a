use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read configuration file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown model provider `{0}`, expected one of gemini, openai, anthropic")]
    UnknownProvider(String),
    #[error("model provider `{0}` is configured more than once")]
    DuplicateProvider(String),
    #[error("no provider serves model `{0}`")]
    UnsupportedModel(String),
    #[error("{why}")]
    Invalid { why: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = ConfigurationError::UnknownProvider("mistral".to_string());
        assert!(err.to_string().contains("`mistral`"));

        let err = ConfigurationError::Io {
            path: PathBuf::from("/etc/digest.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read configuration file `/etc/digest.yaml`: denied"
        );
    }
}
