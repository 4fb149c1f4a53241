use image::Rgba;
use qrcode::EcLevel;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{QrError, Result};

pub const MIN_SIZE: u32 = 200;
pub const MAX_SIZE: u32 = 500;
pub const SIZE_STEP: u32 = 50;
pub const DEFAULT_SIZE: u32 = 300;

pub const MAX_MARGIN: u32 = 10;
pub const DEFAULT_MARGIN: u32 = 2;

pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// An RGBA color parsed from `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::opaque(0, 0, 0);
    pub const WHITE: HexColor = HexColor::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        HexColor { r, g, b, a: 255 }
    }

    /// The leading `#` is optional; shorthand forms double each digit.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || QrError::InvalidColor(input.to_string());

        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16);
        let r = channel(0).map_err(|_| invalid())?;
        let g = channel(1).map_err(|_| invalid())?;
        let b = channel(2).map_err(|_| invalid())?;
        let a = if expanded.len() == 8 {
            channel(3).map_err(|_| invalid())?
        } else {
            255
        };

        Ok(HexColor { r, g, b, a })
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for HexColor {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        HexColor::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ErrorCorrection {
    /// Recovers about 7% of damaged data.
    L,
    /// Recovers about 15% of damaged data.
    #[default]
    M,
    /// Recovers about 25% of damaged data.
    Q,
    /// Recovers about 30% of damaged data.
    H,
}

impl ErrorCorrection {
    pub const ALL: [ErrorCorrection; 4] = [
        ErrorCorrection::L,
        ErrorCorrection::M,
        ErrorCorrection::Q,
        ErrorCorrection::H,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ErrorCorrection::L => "Low (7%)",
            ErrorCorrection::M => "Medium (15%)",
            ErrorCorrection::Q => "Quartile (25%)",
            ErrorCorrection::H => "High (30%)",
        }
    }

    pub fn ec_level(self) -> EcLevel {
        match self {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            ErrorCorrection::L => "L",
            ErrorCorrection::M => "M",
            ErrorCorrection::Q => "Q",
            ErrorCorrection::H => "H",
        };
        f.write_str(letter)
    }
}

impl FromStr for ErrorCorrection {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(ErrorCorrection::L),
            "m" | "medium" => Ok(ErrorCorrection::M),
            "q" | "quartile" => Ok(ErrorCorrection::Q),
            "h" | "high" => Ok(ErrorCorrection::H),
            _ => Err(QrError::InvalidErrorCorrection(s.to_string())),
        }
    }
}

impl TryFrom<String> for ErrorCorrection {
    type Error = QrError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Clamps to `MIN_SIZE..=MAX_SIZE` and snaps to the nearest `SIZE_STEP`.
pub fn clamp_size(size: u32) -> u32 {
    let clamped = size.clamp(MIN_SIZE, MAX_SIZE);
    let steps = (clamped - MIN_SIZE + SIZE_STEP / 2) / SIZE_STEP;
    MIN_SIZE + steps * SIZE_STEP
}

pub fn clamp_margin(margin: u32) -> u32 {
    margin.min(MAX_MARGIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPreset {
    pub name: &'static str,
    pub foreground: &'static str,
    pub background: &'static str,
}

pub const PRESETS: [ColorPreset; 8] = [
    ColorPreset { name: "Classic", foreground: "#000000", background: "#FFFFFF" },
    ColorPreset { name: "Blue", foreground: "#1e40af", background: "#dbeafe" },
    ColorPreset { name: "Green", foreground: "#166534", background: "#dcfce7" },
    ColorPreset { name: "Purple", foreground: "#7c3aed", background: "#ede9fe" },
    ColorPreset { name: "Red", foreground: "#dc2626", background: "#fee2e2" },
    ColorPreset { name: "Orange", foreground: "#ea580c", background: "#fed7aa" },
    ColorPreset { name: "Dark", foreground: "#ffffff", background: "#1f2937" },
    ColorPreset { name: "Gradient", foreground: "#6366f1", background: "#f0f9ff" },
];

pub fn find_preset(name: &str) -> Result<&'static ColorPreset> {
    let name = name.trim();
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| QrError::UnknownPreset(name.to_string()))
}

/// A validated rendering style. Built from the raw values a user edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub foreground: HexColor,
    pub background: HexColor,
    pub size: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
}

impl Style {
    pub fn resolve(
        foreground: &str,
        background: &str,
        size: u32,
        margin: u32,
        error_correction: ErrorCorrection,
    ) -> Result<Self> {
        Ok(Style {
            foreground: HexColor::parse(foreground)?,
            background: HexColor::parse(background)?,
            size: clamp_size(size),
            margin: clamp_margin(margin),
            error_correction,
        })
    }
}

impl Default for Style {
    fn default() -> Self {
        Style {
            foreground: HexColor::BLACK,
            background: HexColor::WHITE,
            size: DEFAULT_SIZE,
            margin: DEFAULT_MARGIN,
            error_correction: ErrorCorrection::M,
        }
    }
}
