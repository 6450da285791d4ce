use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reference data (templates or colour table) missing or corrupt at load time
    #[error("Reference data at {path} could not be loaded: {reason}")]
    Load { path: PathBuf, reason: String },
    /// Error reading a screenshot file
    #[error("Screenshot {path} could not be read")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Error decoding the screenshot
    #[error("Image could not be decoded")]
    ImageDecode(#[source] image::error::ImageError),
    #[error("No board found in {width}x{height} image")]
    BoardNotFound { width: u32, height: u32 },
    /// Replacement bundle or table was empty or corrupt, the active data is unchanged
    #[error("Reload rejected: {0}")]
    ReloadValidation(String),
    #[error("Download failed")]
    Download(#[from] reqwest::Error),
    #[error("Download of {url} failed with status {status}")]
    DownloadStatus { url: String, status: u16 },
    #[error("No templates loaded")]
    TemplatesUnavailable,
    #[error("Invalid board string {0:?}")]
    InvalidBoardString(String),
    /// Error writing reloaded data to the data directory
    #[error("Reloaded data could not be saved")]
    Persist(#[from] io::Error),
    #[error("Config {path} could not be read: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn load<P: Into<PathBuf>, R: ToString>(path: P, reason: R) -> Error {
        Error::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
