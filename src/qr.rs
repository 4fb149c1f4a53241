use image::RgbaImage;
use qrcode::{Color, QrCode, Version};

use crate::error::Result;
use crate::style::{clamp_margin, ErrorCorrection, Style, MAX_SIZE};

/// Pixels per module when the requested size cannot fit the symbol.
pub const FALLBACK_SCALE: f64 = 4.0;

/// The module grid produced by the encoder, row-major, `true` for dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
    version: Version,
}

impl QrMatrix {
    /// Number of modules along one side, excluding the quiet zone.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }
}

pub fn encode(content: &str, error_correction: ErrorCorrection) -> Result<QrMatrix> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), error_correction.ec_level())?;

    let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();

    Ok(QrMatrix {
        width: code.width(),
        version: code.version(),
        modules,
    })
}

/// Rasterises the matrix at `style.size` pixels, with `style.margin` light
/// modules around the symbol. Falls back to `FALLBACK_SCALE` when the size
/// is smaller than one pixel per module. Size is capped at `MAX_SIZE` and the
/// margin at `MAX_MARGIN`.
pub fn render_image(matrix: &QrMatrix, style: &Style) -> RgbaImage {
    let margin = clamp_margin(style.margin);
    let requested = style.size.min(MAX_SIZE);
    let total_modules = matrix.width() as u32 + margin * 2;

    let (size, scale) = if requested >= total_modules {
        (requested, requested as f64 / total_modules as f64)
    } else {
        let size = (total_modules as f64 * FALLBACK_SCALE).floor() as u32;
        (size, FALLBACK_SCALE)
    };

    let scaled_margin = (margin as f64 * scale).floor() as u32;
    let inner_end = size.saturating_sub(scaled_margin);
    let last = matrix.width().saturating_sub(1);

    let dark = style.foreground.to_rgba();
    let light = style.background.to_rgba();

    RgbaImage::from_fn(size, size, |x, y| {
        if x < scaled_margin || y < scaled_margin || x >= inner_end || y >= inner_end {
            return light;
        }
        let col = (((x - scaled_margin) as f64 / scale) as usize).min(last);
        let row = (((y - scaled_margin) as f64 / scale) as usize).min(last);
        if matrix.is_dark(col, row) {
            dark
        } else {
            light
        }
    })
}

/// Encodes `content` and rasterises it with `style`.
pub fn generate(content: &str, style: &Style) -> Result<(RgbaImage, QrMatrix)> {
    let matrix = encode(content, style.error_correction)?;
    let image = render_image(&matrix, style);
    Ok((image, matrix))
}

/// Renders the matrix with half-block characters, two module rows per line.
pub fn render_terminal(matrix: &QrMatrix, quiet_zone: usize, left_pad: usize) -> String {
    let qr_size = matrix.width();
    let total = qr_size + quiet_zone * 2;
    let pad: String = " ".repeat(left_pad);

    let is_dark = |row: usize, col: usize| -> bool {
        row >= quiet_zone
            && col >= quiet_zone
            && matrix.is_dark(col - quiet_zone, row - quiet_zone)
    };

    let mut result = String::new();
    for pair in 0..total.div_ceil(2) {
        let top = pair * 2;
        let bottom = top + 1;

        result.push_str(&pad);
        for col in 0..total {
            let top_dark = is_dark(top, col);
            let bottom_dark = bottom < total && is_dark(bottom, col);

            let ch = match (top_dark, bottom_dark) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            };
            result.push(ch);
        }
        result.push('\n');
    }

    result
}

/// Width and height in terminal cells of `render_terminal` output.
pub fn terminal_dimensions(matrix: &QrMatrix, quiet_zone: usize) -> (usize, usize) {
    let total = matrix.width() + quiet_zone * 2;
    (total, total.div_ceil(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QrError;
    use crate::style::HexColor;
    use image::{DynamicImage, GrayImage};

    fn decode(image: RgbaImage) -> String {
        let gray: GrayImage = DynamicImage::ImageRgba8(image).to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        assert!(!grids.is_empty(), "No QR code found in image");
        let (_, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn test_qr_generation() {
        let (image, matrix) = generate("Hello, World!", &Style::default()).unwrap();
        assert_eq!(image.width(), 300);
        assert_eq!(image.height(), 300);
        assert_eq!(matrix.version(), Version::Normal(1));
        assert_eq!(matrix.width(), 21);
    }

    #[test]
    fn test_qr_roundtrip() {
        let (image, _) = generate("https://github.com", &Style::default()).unwrap();
        assert_eq!(decode(image), "https://github.com");
    }

    #[test]
    fn test_colors_applied() {
        let style = Style {
            foreground: HexColor::parse("#1e40af").unwrap(),
            background: HexColor::parse("#dbeafe").unwrap(),
            size: 250,
            margin: 4,
            ..Style::default()
        };
        let (image, _) = generate("Colors", &style).unwrap();

        // Margin is background, the top-left finder corner is foreground.
        assert_eq!(*image.get_pixel(0, 0), style.background.to_rgba());
        let scale: f64 = 250.0 / (21.0 + 8.0);
        let corner = (4.0 * scale).ceil() as u32;
        assert_eq!(*image.get_pixel(corner, corner), style.foreground.to_rgba());

        let distinct: std::collections::HashSet<[u8; 4]> = image.pixels().map(|p| p.0).collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_zero_margin_starts_with_dark_finder() {
        let style = Style {
            margin: 0,
            size: 200,
            ..Style::default()
        };
        let (image, _) = generate("edge", &style).unwrap();
        assert_eq!(*image.get_pixel(0, 0), HexColor::BLACK.to_rgba());
    }

    #[test]
    fn test_small_size_falls_back_to_fixed_scale() {
        let matrix = encode("fallback", ErrorCorrection::M).unwrap();
        assert_eq!(matrix.width(), 21);

        let style = Style {
            size: 20,
            ..Style::default()
        };
        let image = render_image(&matrix, &style);
        let expected = ((matrix.width() + 4) as f64 * FALLBACK_SCALE) as u32;
        assert_eq!(image.width(), expected);
    }

    #[test]
    fn test_out_of_range_style_is_capped() {
        let matrix = encode("bounds", ErrorCorrection::M).unwrap();

        let style = Style {
            margin: u32::MAX / 2 + 1,
            ..Style::default()
        };
        let image = render_image(&matrix, &style);
        assert_eq!(image.width(), 300);
        // Margin behaves as 10 modules: (21 + 20) modules over 300 px.
        let scaled_margin = (10.0_f64 * 300.0 / 41.0).floor() as u32;
        assert_eq!(*image.get_pixel(scaled_margin - 1, scaled_margin - 1), HexColor::WHITE.to_rgba());
        assert_eq!(*image.get_pixel(scaled_margin, scaled_margin), HexColor::BLACK.to_rgba());

        let style = Style {
            size: u32::MAX,
            ..Style::default()
        };
        assert_eq!(render_image(&matrix, &style).width(), 500);
    }

    #[test]
    fn test_payload_too_large_for_level() {
        let payload = "a".repeat(2000);
        assert!(encode(&payload, ErrorCorrection::L).is_ok());
        assert!(matches!(
            encode(&payload, ErrorCorrection::H),
            Err(QrError::Encode(_))
        ));
    }

    #[test]
    fn test_terminal_rendering_shape() {
        let matrix = encode("term", ErrorCorrection::M).unwrap();
        let rendered = render_terminal(&matrix, 2, 3);
        let (width, height) = terminal_dimensions(&matrix, 2);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), height);
        for line in &lines {
            assert!(line.starts_with("   "));
            assert_eq!(line.chars().count(), width + 3);
        }
        // First row is all quiet zone.
        assert!(lines[0].trim().is_empty());
    }
}
