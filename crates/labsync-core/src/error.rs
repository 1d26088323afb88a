use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read articles file {path}: {source}")]
    ArticlesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse articles file: {0}")]
    ArticlesFileParse(#[from] serde_yaml::Error),

    #[error("article validation failed: {0}")]
    Validation(String),
}
