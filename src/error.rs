use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Invalid hex color: {0}")]
    InvalidColor(String),

    #[error("Invalid error correction level: {0}")]
    InvalidErrorCorrection(String),

    #[error("Unknown color preset: {0}")]
    UnknownPreset(String),

    #[error("Unknown example: {0}")]
    UnknownExample(String),

    #[error("Failed to create QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Download failed: {0}")]
    Download(String),
}

pub type Result<T> = std::result::Result<T, QrError>;
