use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debounce::{Debouncer, DEBOUNCE_DELAY};
use crate::error::Result;
use crate::export::DEFAULT_FILENAME;
use crate::session::StyleDefaults;
use crate::style::{
    find_preset, ErrorCorrection, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, DEFAULT_MARGIN,
    DEFAULT_SIZE,
};

/// Optional TOML config: top-level `debounce_ms`, a `[style]` table and an
/// `[output]` table. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debounce_ms: u64,
    pub style: StyleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub preset: Option<String>,
    pub foreground: Option<String>,
    pub background: Option<String>,
    pub size: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub filename: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debounce_ms: DEBOUNCE_DELAY.as_millis() as u64,
            style: StyleConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            preset: None,
            foreground: None,
            background: None,
            size: DEFAULT_SIZE,
            margin: DEFAULT_MARGIN,
            error_correction: ErrorCorrection::M,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: PathBuf::from("."),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl Config {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn debouncer(&self) -> Debouncer {
        Debouncer::new(Duration::from_millis(self.debounce_ms))
    }
}

impl StyleConfig {
    /// Resolves the preset (if any), then lets explicit colors override it.
    pub fn to_defaults(&self) -> Result<StyleDefaults> {
        let (mut foreground, mut background) =
            (DEFAULT_FOREGROUND.to_string(), DEFAULT_BACKGROUND.to_string());

        if let Some(name) = &self.preset {
            let preset = find_preset(name)?;
            foreground = preset.foreground.to_string();
            background = preset.background.to_string();
        }
        if let Some(fg) = &self.foreground {
            foreground = fg.clone();
        }
        if let Some(bg) = &self.background {
            background = bg.clone();
        }

        Ok(StyleDefaults {
            foreground,
            background,
            size: self.size,
            margin: self.margin,
            error_correction: self.error_correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QrError;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.debouncer().delay(), DEBOUNCE_DELAY);
        assert_eq!(config.output.filename, "qrcode.png");
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r##"
            debounce_ms = 150

            [style]
            preset = "purple"
            background = "#ffffff"
            size = 400
            margin = 0
            error_correction = "high"

            [output]
            directory = "out"
            filename = "code.png"
            "##,
        )
        .unwrap();

        assert_eq!(config.debouncer().delay(), Duration::from_millis(150));
        assert_eq!(config.output.directory, PathBuf::from("out"));

        let defaults = config.style.to_defaults().unwrap();
        assert_eq!(defaults.foreground, "#7c3aed");
        assert_eq!(defaults.background, "#ffffff");
        assert_eq!(defaults.size, 400);
        assert_eq!(defaults.margin, 0);
        assert_eq!(defaults.error_correction, ErrorCorrection::H);
    }

    #[test]
    fn test_bad_level_is_config_error() {
        let err = Config::parse("[style]\nerror_correction = \"Z\"").unwrap_err();
        assert!(matches!(err, QrError::Config(_)));
    }

    #[test]
    fn test_unknown_preset() {
        let config = Config::parse("[style]\npreset = \"neon\"").unwrap();
        assert!(matches!(
            config.style.to_defaults(),
            Err(QrError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("qrgen.toml");
        std::fs::write(&path, "[style]\nsize = 250\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.style.size, 250);
        assert!(Config::load_or_default(Some(&temp_dir.path().join("missing.toml"))).is_err());
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
