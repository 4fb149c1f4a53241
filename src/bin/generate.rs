use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use qrgen::config::Config;
use qrgen::export::{encode_png, Download, DownloadSink, FileSink};
use qrgen::style::{find_preset, ErrorCorrection, Style};
use qrgen::terminal::{display_presets, fits_in_terminal, preview};

#[derive(Parser, Debug)]
#[command(name = "qrgen")]
#[command(author, version, about = "Generate a styled QR code from text or a URL", long_about = None)]
struct Cli {
    /// Text or URL to encode
    #[arg(required_unless_present = "list_presets")]
    content: Option<String>,

    /// Output PNG path (defaults to the config's output directory and filename)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the QR code to the terminal instead of writing a file
    #[arg(short, long)]
    terminal: bool,

    /// Foreground color, e.g. #1e40af
    #[arg(long)]
    fg: Option<String>,

    /// Background color, e.g. #dbeafe
    #[arg(long)]
    bg: Option<String>,

    /// Color preset (explicit --fg/--bg win over it)
    #[arg(short, long)]
    preset: Option<String>,

    /// Image width in pixels (200-500, step 50)
    #[arg(short, long)]
    size: Option<u32>,

    /// Quiet zone in modules (0-10)
    #[arg(short, long)]
    margin: Option<u32>,

    /// Error correction level: L, M, Q or H
    #[arg(short, long)]
    ecl: Option<ErrorCorrection>,

    /// TOML config file with default style and output settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List the color presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    qrgen::logging::init(args.verbose);

    if args.list_presets {
        display_presets();
        return Ok(());
    }

    let content = args.content.clone().unwrap_or_default();
    if content.trim().is_empty() {
        bail!("Nothing to encode: content is empty");
    }

    let config = Config::load_or_default(args.config.as_deref())
        .with_context(|| "Failed to load config")?;
    let style = resolve_style(&args, &config)?;
    tracing::debug!(?style, "resolved style");

    let (image, matrix) = qrgen::generate(&content, &style)?;

    if args.terminal {
        if !fits_in_terminal(&matrix) {
            println!("Warning: QR code may be too large for this terminal");
        }
        println!();
        print!("{}", preview(&matrix));
        println!();
        println!("Content: {}", content);
        return Ok(());
    }

    let (directory, filename) = match &args.output {
        Some(path) => {
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid output path: {}", path.display()))?
                .to_string();
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            (directory, filename)
        }
        None => (config.output.directory.clone(), config.output.filename.clone()),
    };

    let download = Download::new(encode_png(&image)?).with_filename(filename);
    let mut sink = FileSink::new(directory);
    sink.deliver(&download)?;

    println!(
        "Generated {}x{} QR code ({} modules, level {})",
        image.width(),
        image.height(),
        matrix.width(),
        style.error_correction
    );
    for path in sink.written() {
        println!("Output file: {}", path.display());
    }

    Ok(())
}

/// Flags override the config file; a preset is applied before explicit colors.
fn resolve_style(args: &Cli, config: &Config) -> Result<Style> {
    let mut defaults = config.style.to_defaults()?;

    if let Some(name) = &args.preset {
        let preset = find_preset(name)?;
        defaults.foreground = preset.foreground.to_string();
        defaults.background = preset.background.to_string();
    }
    if let Some(fg) = &args.fg {
        defaults.foreground = fg.clone();
    }
    if let Some(bg) = &args.bg {
        defaults.background = bg.clone();
    }

    let style = Style::resolve(
        &defaults.foreground,
        &defaults.background,
        args.size.unwrap_or(defaults.size),
        args.margin.unwrap_or(defaults.margin),
        args.ecl.unwrap_or(defaults.error_correction),
    )?;
    Ok(style)
}
