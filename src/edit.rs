use std::path::PathBuf;

use crate::debounce::Clock;
use crate::error::Result;
use crate::session::Session;
use crate::style::ErrorCorrection;

pub const HELP: &str = "\
Commands:
  text <message>     set the content (alias: url)
  example <name>     github | hello world | email | phone
  clear              clear the content
  fg <#hex>          foreground color
  bg <#hex>          background color
  preset <name>      apply a color preset
  size <px>          200-500, step 50
  margin <modules>   0-10
  ecl <L|M|Q|H>      error correction level
  save [path]        write the PNG (default: qrcode.png)
  presets            list color presets
  status             show the current settings
  help               show this help
  quit               exit";

/// A change to the session's input or style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Content(String),
    Example(String),
    Clear,
    Foreground(String),
    Background(String),
    Preset(String),
    Size(u32),
    Margin(u32),
    ErrorCorrection(ErrorCorrection),
}

impl Edit {
    pub fn apply<C: Clock>(self, session: &mut Session<C>) -> Result<()> {
        match self {
            Edit::Content(text) => session.set_content(text),
            Edit::Example(name) => session.apply_example(&name)?,
            Edit::Clear => session.clear(),
            Edit::Foreground(color) => session.set_foreground(color),
            Edit::Background(color) => session.set_background(color),
            Edit::Preset(name) => session.apply_preset(&name)?,
            Edit::Size(size) => session.set_size(size),
            Edit::Margin(margin) => session.set_margin(margin),
            Edit::ErrorCorrection(level) => session.set_error_correction(level),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit(Edit),
    Save(Option<PathBuf>),
    Presets,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> std::result::Result<Option<Command>, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (trimmed, ""),
        };
        let arg = rest.trim();

        let require = |what: &str| -> std::result::Result<String, String> {
            if arg.is_empty() {
                Err(format!("`{}` needs {}", word, what))
            } else {
                Ok(arg.to_string())
            }
        };
        let number = |what: &str| -> std::result::Result<u32, String> {
            require(what)?
                .parse::<u32>()
                .map_err(|_| format!("`{}` expects a whole number, got `{}`", word, arg))
        };

        let command = match word.to_ascii_lowercase().as_str() {
            // Content keeps inner whitespace, only the separator is dropped.
            "text" | "url" => Command::Edit(Edit::Content(rest.to_string())),
            "example" => Command::Edit(Edit::Example(require("an example name")?)),
            "clear" => Command::Edit(Edit::Clear),
            "fg" | "foreground" => Command::Edit(Edit::Foreground(require("a hex color")?)),
            "bg" | "background" => Command::Edit(Edit::Background(require("a hex color")?)),
            "preset" => Command::Edit(Edit::Preset(require("a preset name")?)),
            "size" => Command::Edit(Edit::Size(number("a pixel size")?)),
            "margin" => Command::Edit(Edit::Margin(number("a module count")?)),
            "ecl" | "level" => {
                let level = require("L, M, Q or H")?
                    .parse::<ErrorCorrection>()
                    .map_err(|e| e.to_string())?;
                Command::Edit(Edit::ErrorCorrection(level))
            }
            "save" | "download" => {
                Command::Save((!arg.is_empty()).then(|| PathBuf::from(arg)))
            }
            "presets" => Command::Presets,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("Unknown command `{}`; try `help`", other)),
        };

        Ok(Some(command))
    }
}
