use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_FILENAME: &str = "qrcode.png";

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn to_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(png))
}

/// A rendered PNG ready to hand to a [`DownloadSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub png: Vec<u8>,
}

impl Download {
    pub fn new(png: Vec<u8>) -> Self {
        Download {
            filename: DEFAULT_FILENAME.to_string(),
            png,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn data_url(&self) -> String {
        to_data_url(&self.png)
    }
}

/// Where a download ends up: a file on disk, a browser anchor, a test buffer.
pub trait DownloadSink {
    fn deliver(&mut self, download: &Download) -> Result<()>;
}

/// Writes downloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        FileSink {
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Paths written so far, oldest first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DownloadSink for FileSink {
    fn deliver(&mut self, download: &Download) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(&download.filename);
        fs::write(&path, &download.png)?;
        tracing::debug!(path = %path.display(), bytes = download.png.len(), "wrote PNG");
        self.written.push(path);
        Ok(())
    }
}

impl DownloadSink for Vec<Download> {
    fn deliver(&mut self, download: &Download) -> Result<()> {
        self.push(download.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_encode_png() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_data_url() {
        let url = to_data_url(b"abc");
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_download_defaults() {
        let download = Download::new(vec![1, 2, 3]);
        assert_eq!(download.filename, "qrcode.png");
        assert_eq!(download.with_filename("x.png").filename, "x.png");
    }

    #[test]
    fn test_file_sink_creates_directory() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let target = temp_dir.path().join("nested").join("out");
        let mut sink = FileSink::new(&target);

        sink.deliver(&Download::new(vec![7; 16])).unwrap();

        let path = target.join("qrcode.png");
        assert_eq!(sink.written(), &[path.clone()]);
        assert_eq!(fs::read(path).unwrap(), vec![7; 16]);
    }
}
