use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the extraction pipeline.
///
/// Everything except `NoRouteFiles`, `Config` and `Io` on the output path is
/// file-scoped: the pipeline records it against the offending route file and
/// keeps going.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    AmbiguousDeclaration { file: PathBuf, name: String },
    InvalidErrorStatuses { file: PathBuf, message: String },
    NoRouteFiles { root: PathBuf },
    ConfigError(String),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::AmbiguousDeclaration { file, name } => write!(
                f,
                "Ambiguous declaration in {}: `{}` is declared more than once at the top level",
                file.display(),
                name
            ),
            Error::InvalidErrorStatuses { file, message } => {
                write!(f, "Invalid errorStatuses in {}: {}", file.display(), message)
            }
            Error::NoRouteFiles { root } => {
                write!(f, "No usable route files found under {}", root.display())
            }
            Error::ConfigError(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML serialization error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

/// A file-scoped failure recorded during a batch run.
#[derive(Debug)]
pub struct FileIssue {
    /// Route file the failure belongs to (relative to the route root)
    pub file: PathBuf,
    /// What went wrong
    pub error: Error,
}

impl std::fmt::Display for FileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}
