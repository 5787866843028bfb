//! Parses positional command tokens into actions.
//!
//! The grammar is flat: each recognized token consumes its arguments up
//! to the next recognized token. Text arguments may span multiple words
//! (`type BillField 100 50` types "100 50"); identifier and numeric
//! arguments take exactly one word. The optional long-press duration is
//! consumed only when the next word is numeric.
//!
//! Targets parsed here are plain identifiers. Text-filtered resolution
//! (`ElementLocator::text_filter` in uidrive-core) has no command token
//! and stays a library-level refinement for embedding callers.

use std::path::PathBuf;

use thiserror::Error;

use uidrive_core::action::{Action, Direction};
use uidrive_core::executor::DEFAULT_LONG_PRESS_MS;

/// A malformed action token list. Always a usage error (exit 2).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown action '{0}'")]
    UnknownToken(String),
    #[error("'{token}' requires a {argument} argument")]
    MissingArgument { token: &'static str, argument: &'static str },
    #[error("'{token}' expects a number, got '{value}'")]
    InvalidNumber { token: &'static str, value: String },
    #[error("'{token}': {message}")]
    InvalidArgument { token: &'static str, message: String },
}

/// Every token the parser recognizes, in grammar order.
const TOKENS: &[&str] = &[
    "tap",
    "tap-like",
    "double-tap",
    "long-press",
    "type",
    "clear",
    "get-text",
    "exists",
    "is-enabled",
    "is-visible",
    "expect",
    "wait",
    "wait-for",
    "dismiss-keyboard",
    "press-key",
    "accept-alert",
    "dismiss-alert",
    "get-alert",
    "set-slider",
    "drag",
    "swipe",
    "scroll",
    "scroll-to",
    "tap-coords",
    "activate",
    "terminate",
    "install",
    "screenshot",
    "page-source",
    "list-buttons",
    "list-elements",
    "find-text",
    "get-rect",
    "end-session",
];

fn is_token(word: &str) -> bool {
    TOKENS.contains(&word)
}

/// Parse a flat token list into an ordered action list.
pub fn parse_actions(words: &[String]) -> Result<Vec<Action>, ParseError> {
    let mut cursor = Cursor { words, pos: 0 };
    let mut actions = Vec::new();

    while let Some(word) = cursor.next_word() {
        let action = match word {
            "tap" => Action::Tap { id: cursor.id("tap")? },
            "tap-like" => Action::TapLike { id: cursor.id("tap-like")? },
            "double-tap" => Action::DoubleTap { id: cursor.id("double-tap")? },
            "long-press" => {
                let id = cursor.id("long-press")?;
                let duration_ms = cursor.optional_number().unwrap_or(DEFAULT_LONG_PRESS_MS);
                Action::LongPress { id, duration_ms }
            }
            "type" => {
                let id = cursor.id("type")?;
                let text = cursor.text("type", "text")?;
                Action::Type { id, text }
            }
            "clear" => Action::Clear { id: cursor.id("clear")? },
            "get-text" => Action::GetText { id: cursor.id("get-text")? },
            "exists" => Action::Exists { id: cursor.id("exists")? },
            "is-enabled" => Action::IsEnabled { id: cursor.id("is-enabled")? },
            "is-visible" => Action::IsVisible { id: cursor.id("is-visible")? },
            "expect" => {
                let id = cursor.id("expect")?;
                let expected = cursor.text("expect", "expected text")?;
                Action::Expect { id, expected }
            }
            "wait" => Action::Wait { ms: cursor.number("wait")? },
            "wait-for" => Action::WaitFor { id: cursor.id("wait-for")? },
            "dismiss-keyboard" => Action::DismissKeyboard,
            "press-key" => Action::PressKey { keycode: cursor.number("press-key")? },
            "accept-alert" => Action::AcceptAlert,
            "dismiss-alert" => Action::DismissAlert,
            "get-alert" => Action::GetAlert,
            "set-slider" => {
                let id = cursor.id("set-slider")?;
                let percent = cursor.finite_number("set-slider")?;
                Action::SetSlider { id, percent }
            }
            "drag" => Action::Drag {
                x1: cursor.number("drag")?,
                y1: cursor.number("drag")?,
                x2: cursor.number("drag")?,
                y2: cursor.number("drag")?,
            },
            "swipe" => Action::Swipe { direction: cursor.direction("swipe")? },
            "scroll" => Action::Scroll { direction: cursor.direction("scroll")? },
            "scroll-to" => {
                let id = cursor.id("scroll-to")?;
                let direction = cursor.optional_direction().unwrap_or(Direction::Up);
                Action::ScrollTo { id, direction }
            }
            "tap-coords" => Action::TapCoords {
                x: cursor.number("tap-coords")?,
                y: cursor.number("tap-coords")?,
            },
            "activate" => Action::Activate,
            "terminate" => Action::Terminate,
            "install" => Action::Install { path: cursor.arg("install", "path")? },
            "screenshot" => {
                Action::Screenshot { path: PathBuf::from(cursor.arg("screenshot", "path")?) }
            }
            "page-source" => Action::PageSource,
            "list-buttons" => Action::ListButtons,
            "list-elements" => Action::ListElements,
            "find-text" => Action::FindText { text: cursor.text("find-text", "text")? },
            "get-rect" => Action::GetRect { id: cursor.id("get-rect")? },
            "end-session" => Action::EndSession,
            unknown => return Err(ParseError::UnknownToken(unknown.to_string())),
        };
        actions.push(action);
    }

    Ok(actions)
}

struct Cursor<'a> {
    words: &'a [String],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&str> {
        self.words.get(self.pos).map(String::as_str)
    }

    fn next_word(&mut self) -> Option<&str> {
        let word = self.words.get(self.pos)?;
        self.pos += 1;
        Some(word)
    }

    /// One argument word; the next recognized token never counts as one.
    fn arg(&mut self, token: &'static str, argument: &'static str) -> Result<String, ParseError> {
        match self.peek() {
            Some(word) if !is_token(word) => {
                let word = word.to_string();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(ParseError::MissingArgument { token, argument }),
        }
    }

    fn id(&mut self, token: &'static str) -> Result<String, ParseError> {
        self.arg(token, "target identifier")
    }

    /// One or more words joined with spaces, up to the next token.
    fn text(&mut self, token: &'static str, argument: &'static str) -> Result<String, ParseError> {
        let mut parts = vec![self.arg(token, argument)?];
        while let Some(word) = self.peek() {
            if is_token(word) {
                break;
            }
            parts.push(word.to_string());
            self.pos += 1;
        }
        Ok(parts.join(" "))
    }

    fn number<T: std::str::FromStr>(&mut self, token: &'static str) -> Result<T, ParseError> {
        let word = self.arg(token, "numeric")?;
        word.parse()
            .map_err(|_| ParseError::InvalidNumber { token, value: word })
    }

    /// A finite float; `NaN` and infinities parse but are rejected.
    fn finite_number(&mut self, token: &'static str) -> Result<f64, ParseError> {
        let word = self.arg(token, "numeric")?;
        match word.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::InvalidNumber { token, value: word }),
        }
    }

    /// A trailing numeric argument, consumed only when present.
    fn optional_number<T: std::str::FromStr>(&mut self) -> Option<T> {
        let parsed = self.peek()?.parse().ok()?;
        self.pos += 1;
        Some(parsed)
    }

    fn direction(&mut self, token: &'static str) -> Result<Direction, ParseError> {
        self.arg(token, "direction")?
            .parse()
            .map_err(|message| ParseError::InvalidArgument { token, message })
    }

    /// A trailing direction word, consumed only when present.
    fn optional_direction(&mut self) -> Option<Direction> {
        let parsed = self.peek()?.parse().ok()?;
        self.pos += 1;
        Some(parsed)
    }
}
