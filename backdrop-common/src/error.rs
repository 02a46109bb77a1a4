use std::path::PathBuf;
use thiserror::Error;

/// Main error type for backdrop operations
#[derive(Error, Debug)]
pub enum BackdropError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image source error: {0}")]
    ImageSource(#[from] ImageSourceError),

    #[error("Style sink error: {0}")]
    Style(#[from] StyleError),

    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration and settings-record errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to write settings file: {path:?}")]
    FileWrite { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse TOML configuration: {message}")]
    TomlParse { message: String },

    #[error("Failed to parse settings record: {message}")]
    JsonParse { message: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Image listing errors. All of these are soft: the image source turns
/// them into an empty list plus a warning.
#[derive(Error, Debug)]
pub enum ImageSourceError {
    #[error("No background folder configured")]
    NoFolder,

    #[error("Folder not found: {path:?}")]
    FolderNotFound { path: PathBuf },

    #[error("Path is not a folder: {path:?}")]
    NotAFolder { path: PathBuf },

    #[error("Failed to read folder: {path:?}")]
    FolderRead { path: PathBuf, source: std::io::Error },

    #[error("No images found in folder: {path:?}")]
    NoImagesFound { path: PathBuf },
}

/// Failures reported by a style sink while mutating the visual resource
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Failed to write style output: {path:?}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Failed to remove style output: {path:?}")]
    Remove { path: PathBuf, source: std::io::Error },

    #[error("Style resource does not exist")]
    NoResource,
}

/// IPC communication errors
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Rotation service is not running")]
    ServiceStopped,

    #[error("Rotation service dropped the request")]
    NoReply,
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Opacity {value} is outside 0.1..=1.0")]
    OpacityOutOfRange { value: f32 },
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, BackdropError>;

impl From<serde_json::Error> for BackdropError {
    fn from(err: serde_json::Error) -> Self {
        BackdropError::Config(ConfigError::JsonParse {
            message: err.to_string(),
        })
    }
}

impl From<toml::de::Error> for BackdropError {
    fn from(err: toml::de::Error) -> Self {
        BackdropError::Config(ConfigError::TomlParse {
            message: err.to_string(),
        })
    }
}

// Error reporting utilities
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for BackdropError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {:?}", context, self);
    }

    fn user_friendly_message(&self) -> String {
        match self {
            BackdropError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Configuration file could not be read: {:?}", path)
            }
            BackdropError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            BackdropError::ImageSource(ImageSourceError::NoFolder) => {
                "No background folder set. Use `backdrop-cli folder <path>` first.".to_string()
            }
            BackdropError::ImageSource(ImageSourceError::NoImagesFound { path }) => {
                format!("No png/jpg/jpeg images found in folder: {:?}", path)
            }
            BackdropError::Ipc(IpcError::ServiceStopped) => {
                "backdrop rotation service has stopped. Please restart the daemon.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
