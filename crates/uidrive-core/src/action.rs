//! Action types for automation runs.
//!
//! An [`Action`] is one discrete UI operation or inspection request in an
//! ordered execution list. Actions are immutable once parsed and are
//! executed strictly in the order supplied; each carries the minimal
//! typed arguments it needs.
//!
//! Actions fall into several categories:
//!
//! - **Interaction**: [`Action::Tap`], [`Action::DoubleTap`], [`Action::LongPress`],
//!   [`Action::Type`], [`Action::Clear`], [`Action::SetSlider`], [`Action::Drag`],
//!   [`Action::Swipe`], [`Action::Scroll`], [`Action::TapCoords`]
//! - **Queries**: [`Action::GetText`], [`Action::Exists`], [`Action::IsEnabled`],
//!   [`Action::IsVisible`], [`Action::GetRect`]
//! - **Assertions**: [`Action::Expect`] (pass/fail verdict, never aborts)
//! - **Waiting**: [`Action::Wait`], [`Action::WaitFor`]
//! - **Alerts**: [`Action::AcceptAlert`], [`Action::DismissAlert`], [`Action::GetAlert`]
//! - **App lifecycle**: [`Action::Activate`], [`Action::Terminate`], [`Action::Install`]
//! - **Inspection**: [`Action::Screenshot`], [`Action::PageSource`],
//!   [`Action::ListButtons`], [`Action::ListElements`], [`Action::FindText`]
//! - **Session**: [`Action::EndSession`]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::wire::Rect;

/// A swipe/scroll direction, mapped to a fixed unit vector by the
/// executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The unit vector this direction moves the finger along (screen
    /// coordinates, y grows downward). Swiping up moves content up, so
    /// the finger travels toward negative y.
    pub fn vector(&self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(format!("invalid direction '{other}' (use up, down, left, right)")),
        }
    }
}

/// One UI operation in an ordered execution list.
///
/// Serialized with a `type` tag discriminator for logging and report
/// output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Tap an element resolved by identifier.
    Tap { id: String },
    /// Tap the first element whose identifier contains the given
    /// substring (partial resolution).
    TapLike { id: String },
    /// Double-tap an element.
    DoubleTap { id: String },
    /// Press and hold an element.
    LongPress { id: String, duration_ms: u64 },
    /// Clear the field, then type the text (never a plain append).
    Type { id: String, text: String },
    /// Clear a field's content; succeeds when already empty.
    Clear { id: String },
    /// Read an element's visible text.
    GetText { id: String },
    /// Whether an element currently exists.
    Exists { id: String },
    /// Whether an element is enabled.
    IsEnabled { id: String },
    /// Whether an element is visible.
    IsVisible { id: String },
    /// Assert that the element's text contains the expected substring.
    Expect { id: String, expected: String },
    /// Sleep unconditionally.
    Wait { ms: u64 },
    /// Poll until the element appears or the resolver deadline passes.
    WaitFor { id: String },
    /// Dismiss the software keyboard (feature-gated).
    DismissKeyboard,
    /// Send a hardware key code (feature-gated).
    PressKey { keycode: i64 },
    /// Accept the current alert.
    AcceptAlert,
    /// Dismiss the current alert.
    DismissAlert,
    /// Read the current alert's text.
    GetAlert,
    /// Drag a slider to a percentage of its range (clamped to [0, 100]).
    SetSlider { id: String, percent: f64 },
    /// Drag between two screen points.
    Drag { x1: i64, y1: i64, x2: i64, y2: i64 },
    /// Swipe across the screen in a direction.
    Swipe { direction: Direction },
    /// Scroll the screen content in a direction (shorter travel than a
    /// swipe).
    Scroll { direction: Direction },
    /// Scroll repeatedly in a direction until the element resolves.
    ScrollTo { id: String, direction: Direction },
    /// Tap at screen coordinates.
    TapCoords { x: i64, y: i64 },
    /// Bring the app under test to the foreground.
    Activate,
    /// Terminate the app under test.
    Terminate,
    /// Install an app bundle from a path on the server host.
    Install { path: String },
    /// Capture a screenshot to the given path.
    Screenshot { path: PathBuf },
    /// Dump the full UI tree as XML.
    PageSource,
    /// List the identifiers/labels of on-screen buttons.
    ListButtons,
    /// List the identifiers of all elements with a native identifier.
    ListElements,
    /// List the texts of elements whose visible text contains the query.
    FindText { text: String },
    /// Read an element's rect in screen coordinates.
    GetRect { id: String },
    /// Explicitly end the session and delete its persisted descriptor.
    EndSession,
}

impl Action {
    /// A short static name for tracing span metadata; avoids
    /// Debug-formatting payloads into spans.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tap { .. } => "tap",
            Action::TapLike { .. } => "tap-like",
            Action::DoubleTap { .. } => "double-tap",
            Action::LongPress { .. } => "long-press",
            Action::Type { .. } => "type",
            Action::Clear { .. } => "clear",
            Action::GetText { .. } => "get-text",
            Action::Exists { .. } => "exists",
            Action::IsEnabled { .. } => "is-enabled",
            Action::IsVisible { .. } => "is-visible",
            Action::Expect { .. } => "expect",
            Action::Wait { .. } => "wait",
            Action::WaitFor { .. } => "wait-for",
            Action::DismissKeyboard => "dismiss-keyboard",
            Action::PressKey { .. } => "press-key",
            Action::AcceptAlert => "accept-alert",
            Action::DismissAlert => "dismiss-alert",
            Action::GetAlert => "get-alert",
            Action::SetSlider { .. } => "set-slider",
            Action::Drag { .. } => "drag",
            Action::Swipe { .. } => "swipe",
            Action::Scroll { .. } => "scroll",
            Action::ScrollTo { .. } => "scroll-to",
            Action::TapCoords { .. } => "tap-coords",
            Action::Activate => "activate",
            Action::Terminate => "terminate",
            Action::Install { .. } => "install",
            Action::Screenshot { .. } => "screenshot",
            Action::PageSource => "page-source",
            Action::ListButtons => "list-buttons",
            Action::ListElements => "list-elements",
            Action::FindText { .. } => "find-text",
            Action::GetRect { .. } => "get-rect",
            Action::EndSession => "end-session",
        }
    }

    /// The target identifier this action resolves, if any. Used for
    /// failure reporting.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Tap { id }
            | Action::TapLike { id }
            | Action::DoubleTap { id }
            | Action::LongPress { id, .. }
            | Action::Type { id, .. }
            | Action::Clear { id }
            | Action::GetText { id }
            | Action::Exists { id }
            | Action::IsEnabled { id }
            | Action::IsVisible { id }
            | Action::Expect { id, .. }
            | Action::WaitFor { id }
            | Action::SetSlider { id, .. }
            | Action::ScrollTo { id, .. }
            | Action::GetRect { id } => Some(id),
            _ => None,
        }
    }
}

/// A value returned by an executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Text(String),
    Bool(bool),
    Rect(Rect),
    Path(PathBuf),
    List(Vec<String>),
}

/// The verdict of one `expect` assertion, including the literal actual
/// value observed at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionVerdict {
    /// The target identifier.
    pub id: String,
    /// The expected substring.
    pub expected: String,
    /// Whether the actual text contained the expected substring.
    pub passed: bool,
    /// The literal text observed.
    pub actual: String,
}

impl fmt::Display for AssertionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            write!(f, "expect {} \"{}\" PASS", self.id, self.expected)
        } else {
            write!(
                f,
                "expect {} \"{}\" FAIL (actual: \"{}\")",
                self.id, self.expected, self.actual
            )
        }
    }
}

/// The outcome of one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the action completed successfully. Assertions report
    /// success here even when the verdict fails; the verdict carries the
    /// pass/fail separately.
    pub success: bool,
    /// Human-readable description of what happened.
    pub message: String,
    /// Value returned by the action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ActionValue>,
    /// Assertion verdict, for `expect` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<AssertionVerdict>,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), value: None, assertion: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), value: None, assertion: None }
    }

    pub fn with_value(mut self, value: ActionValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_assertion(mut self, verdict: AssertionVerdict) -> Self {
        self.assertion = Some(verdict);
        self
    }
}
