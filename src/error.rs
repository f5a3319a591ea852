//! Error types for qrstudio operations

use thiserror::Error;

/// Result type alias using qrstudio's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Shown when the active input mode yields nothing to encode.
pub const MSG_REQUIRED_INPUT: &str = "Please enter the required information";

/// Shown when the payload does not fit a single symbol.
pub const MSG_CAPACITY: &str = "Your content is too large to encode in a single QR. Try shortening the code, removing description, or share a URL instead.";

/// Shown for any encode/composite failure without a more specific message.
pub const MSG_GENERIC: &str = "Failed to generate QR code. Please check your input and try again.";

/// Shown when the selected logo is not an image.
pub const MSG_NOT_AN_IMAGE: &str = "Please select a valid image file";

/// Shown when the selected logo file cannot be read.
pub const MSG_UNREADABLE_IMAGE: &str = "Failed to read the selected image file";

/// Main error type for qrstudio operations
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or incomplete required input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Payload too long for the chosen error-correction level
    #[error("Payload of {bytes} bytes exceeds QR capacity at error correction level {level}")]
    CapacityExceeded {
        /// Payload length in bytes
        bytes: usize,
        /// Error-correction level label (L/M/Q/H)
        level: char,
    },

    /// QR code encoding failed for a reason other than capacity
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// A user-supplied or intermediate image could not be read or decoded
    #[error("Image load failed: {0}")]
    Load(String),

    /// Unknown template identifier
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short inline text presented to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::Load(msg) => msg.clone(),
            Error::CapacityExceeded { .. } => MSG_CAPACITY.to_string(),
            Error::UnknownTemplate(id) => format!("Unknown template '{id}'"),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::QrEncode(_) | Error::Io(_) | Error::Image(_) | Error::Other(_) => {
                MSG_GENERIC.to_string()
            }
        }
    }

    /// Whether this error came from input validation (no encode was attempted).
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Other(format!("Hex decode error: {}", e))
    }
}
