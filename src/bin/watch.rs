use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use qrgen::config::Config;
use qrgen::edit::{Command, HELP};
use qrgen::export::FileSink;
use qrgen::session::{RenderOutcome, Session};
use qrgen::terminal::{display_notification, display_presets, display_rendered};
use qrgen::MonotonicClock;

#[derive(Parser, Debug)]
#[command(name = "qrgen-watch")]
#[command(author, version, about = "Edit a QR code line by line with a live, debounced preview", long_about = None)]
struct Cli {
    /// TOML config file with default style and output settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial content
    #[arg(long)]
    text: Option<String>,

    /// Do not clear the screen before each preview
    #[arg(long)]
    no_clear: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    qrgen::logging::init(args.verbose);

    let config = Config::load_or_default(args.config.as_deref())
        .with_context(|| "Failed to load config")?;
    let mut session = Session::with_style(
        MonotonicClock::new(),
        config.debouncer(),
        config.style.to_defaults()?,
    );
    session.set_download_filename(config.output.filename.clone());

    if let Some(text) = args.text {
        session.set_content(text);
    }

    // stdin blocks, so it gets its own thread; the session stays on this one.
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    println!("{}", HELP);

    loop {
        let received = match session.remaining() {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(line) => match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(Command::Edit(edit))) => {
                    if let Err(e) = edit.apply(&mut session) {
                        eprintln!("{}", e);
                    }
                }
                Ok(Some(Command::Save(path))) => save(&mut session, path, &config),
                Ok(Some(Command::Presets)) => display_presets(),
                Ok(Some(Command::Status)) => print_status(&session),
                Ok(Some(Command::Help)) => println!("{}", HELP),
                Ok(Some(Command::Quit)) => break,
                Err(message) => eprintln!("{}", message),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Input closed: flush the last edit before leaving.
                if session.is_pending() {
                    render(&mut session, args.no_clear);
                }
                break;
            }
        }

        if let Some(outcome) = session.poll() {
            show(&mut session, outcome, args.no_clear);
        }
    }

    Ok(())
}

fn render(session: &mut Session<MonotonicClock>, no_clear: bool) {
    let outcome = session.render_now();
    show(session, outcome, no_clear);
}

fn show(session: &mut Session<MonotonicClock>, outcome: RenderOutcome, no_clear: bool) {
    match outcome {
        RenderOutcome::Rendered => {
            if let Some(rendered) = session.rendered() {
                display_rendered(rendered, !no_clear);
            }
        }
        RenderOutcome::Cleared => println!("Enter text to generate a QR code"),
        RenderOutcome::Failed => {
            if let Some(message) = session.last_error() {
                eprintln!("{}", message);
            }
        }
    }
    for notification in session.take_notifications() {
        display_notification(&notification);
    }
}

fn save(session: &mut Session<MonotonicClock>, path: Option<PathBuf>, config: &Config) {
    // Saving what is on screen; an edit still in its quiet period is rendered first.
    if session.is_pending() {
        let outcome = session.render_now();
        if outcome != RenderOutcome::Rendered {
            show(session, outcome, true);
        }
    }

    if !session.can_download() {
        println!("Nothing to save yet");
        return;
    }

    let mut sink = match &path {
        Some(path) => {
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                session.set_download_filename(name);
            }
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            FileSink::new(directory)
        }
        None => {
            session.set_download_filename(config.output.filename.clone());
            FileSink::new(config.output.directory.clone())
        }
    };

    if session.download(&mut sink).is_ok() {
        for written in sink.written() {
            println!("Saved {}", written.display());
        }
    }
    for notification in session.take_notifications() {
        display_notification(&notification);
    }
}

fn print_status(session: &Session<MonotonicClock>) {
    println!("Content:          {:?}", session.content());
    println!("Foreground:       {}", session.foreground());
    println!("Background:       {}", session.background());
    println!("Size:             {}px", session.size());
    println!("Margin:           {}", session.margin());
    println!(
        "Error correction: {}",
        session.error_correction().label()
    );
    println!(
        "QR code:          {}",
        if session.can_download() { "ready" } else { "none" }
    );
}
