//! Command-line argument parsing for the textmacro binary
//!
//! The binary replays a key script against a simulated surface:
//! - Plain characters are typed as-is
//! - `{name}` presses a named key or chord (`{bs}`, `{esc}`, `{enter}`,
//!   `{tab}`, `{left}`, `{ctrl+z}`)
//! - `{wait}` lets every pending timer fire
//! - `{{` types a literal `{`

use clap::Parser;
use std::path::PathBuf;

use crate::keys::{parse_key_string, KeyParseError, Keystroke};

/// Replay typing against a text surface and print the result
#[derive(Parser, Debug)]
#[command(name = "textmacro", version, about = "Trigger-based text expansion")]
pub struct CliArgs {
    /// Key script to replay
    #[arg(value_name = "SCRIPT")]
    pub script: String,

    /// Macro catalog (YAML or JSON); defaults to the config directory
    #[arg(short, long, value_name = "FILE")]
    pub macros: Option<PathBuf>,

    /// Engine config file; defaults to the config directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulate a rich-text region instead of a plain field
    #[arg(long, conflicts_with = "single_line")]
    pub rich: bool,

    /// Simulate a single-line input
    #[arg(long)]
    pub single_line: bool,

    /// Require a commit key instead of committing on exact match
    #[arg(long)]
    pub commit_key_mode: bool,

    /// Initial surface content (markup with --rich)
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub initial: String,

    /// Undo the last replacement after the script ran
    #[arg(long)]
    pub undo: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// One step of a key script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Key(Keystroke),
    /// Fire every pending timer
    Wait,
}

/// Parse a key script into steps
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>, KeyParseError> {
    let mut steps = Vec::new();
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            steps.push(ScriptStep::Key(match c {
                '\n' => parse_key_string("enter")?,
                c => Keystroke::char(c),
            }));
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            steps.push(ScriptStep::Key(Keystroke::char('{')));
            continue;
        }

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }
        if !closed {
            return Err(KeyParseError::InvalidKey(format!("Unclosed '{{{}'", name)));
        }

        if name.eq_ignore_ascii_case("wait") {
            steps.push(ScriptStep::Wait);
        } else {
            steps.push(ScriptStep::Key(parse_key_string(&name)?));
        }
    }

    Ok(steps)
}
