use terminal_size::{terminal_size, Height, Width};

use crate::qr::{render_terminal, terminal_dimensions, QrMatrix};
use crate::session::{Notification, NotificationKind, RenderedQr};
use crate::style::PRESETS;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Terminal quiet zone; scanners want at least two modules.
const QUIET_ZONE: usize = 2;

fn terminal_dims() -> (usize, usize) {
    terminal_size()
        .map(|(Width(w), Height(h))| {
            if w < 40 || h < 30 {
                (120, 60)
            } else {
                (w as usize, h as usize)
            }
        })
        .unwrap_or((120, 60))
}

pub fn fits_in_terminal(matrix: &QrMatrix) -> bool {
    let (term_width, term_height) = terminal_dims();
    let (width, height) = terminal_dimensions(matrix, QUIET_ZONE);

    // Leave room for the header and the status lines below the code.
    width <= term_width && height + 8 <= term_height
}

/// Half-block preview, centred horizontally.
pub fn preview(matrix: &QrMatrix) -> String {
    let (term_width, _) = terminal_dims();
    let (width, _) = terminal_dimensions(matrix, QUIET_ZONE);
    let pad_left = term_width.saturating_sub(width) / 2;
    render_terminal(matrix, QUIET_ZONE, pad_left)
}

pub fn display_rendered(rendered: &RenderedQr, clear: bool) {
    if clear {
        print!("{}", CLEAR_SCREEN);
    }

    let style = &rendered.style;
    println!(
        "QR code {}  |  {}px  |  margin {}  |  {}",
        version_label(&rendered.matrix),
        rendered.image.width(),
        style.margin,
        style.error_correction.label()
    );
    println!("{}", "=".repeat(50));

    if fits_in_terminal(&rendered.matrix) {
        println!();
        print!("{}", preview(&rendered.matrix));
    } else {
        println!("(too large to preview in this terminal; use `save`)");
    }

    println!();
    println!("Content: {}", rendered.content);
    println!(
        "Color scheme: foreground {}  |  background {}",
        style.foreground, style.background
    );
}

fn version_label(matrix: &QrMatrix) -> String {
    match matrix.version() {
        qrcode::Version::Normal(v) => format!("v{}", v),
        qrcode::Version::Micro(v) => format!("M{}", v),
    }
}

pub fn display_notification(notification: &Notification) {
    match notification.kind {
        NotificationKind::Info => println!("{}: {}", notification.title, notification.description),
        NotificationKind::Destructive => {
            eprintln!("{}: {}", notification.title, notification.description)
        }
    }
}

pub fn display_presets() {
    for preset in &PRESETS {
        println!(
            "  {:<10} fg {}  bg {}",
            preset.name, preset.foreground, preset.background
        );
    }
}
