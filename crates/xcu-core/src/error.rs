use thiserror::Error;

/// Why the libmagic handle could not be brought up.
///
/// The `Display` text is the fixed diagnostic that `filetype` returns for
/// every call once initialization has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitFailure {
    #[error("[Call to libmagic:magic_open() failed]")]
    Open,

    #[error("[Call to libmagic:magic_load() failed]")]
    Load,
}

/// All errors that can occur in xcu-core.
#[derive(Debug, Error)]
pub enum XcuError {
    #[error("Classifier unavailable: {0}")]
    ClassifierInit(#[from] InitFailure),

    /// Carries libmagic's own error text, unprefixed.
    #[error("{0}")]
    Classify(String),

    #[error("path of {len} bytes exceeds the {max} byte limit")]
    PathTooLong { len: usize, max: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, XcuError>;
