use thiserror::Error;

/// Data panel error
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    General(String),
    /// A rewrite step applied to a statement that lacks the structure it
    /// depends on, or the encrypt rules themselves are inconsistent.
    #[error("configuration integrity violated: {0}")]
    ConfigIntegrity(String),
    #[error("expression `{0}` on an encrypted column can not be rewritten")]
    UnsupportedExpression(String),
    #[error("no value bound for parameter marker {0}")]
    MissingParameter(usize),
    #[error("encryptor failed: {0}")]
    Encryptor(String),
    #[error("edit [{}, {}] overlaps edit [{}, {}]", .first.0, .first.1, .second.0, .second.1)]
    OverlappingEdits {
        first: (usize, usize),
        second: (usize, usize),
    },
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}

/// Data panel Result type
pub type Result<T> = std::result::Result<T, Error>;
