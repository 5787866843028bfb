//! HTTP client for the remote automation protocol.
//!
//! This module provides [`WireClient`], a low-level transport layer that
//! speaks the W3C WebDriver protocol (plus the Appium device extensions)
//! over HTTP. It knows nothing about sessions beyond their opaque ids,
//! nothing about locator fallback order, and nothing about actions; those
//! concerns live in [`crate::session`], [`crate::locator`] and
//! [`crate::executor`].
//!
//! # Example
//!
//! ```no_run
//! use uidrive_core::wire::WireClient;
//!
//! # async fn example() -> Result<(), uidrive_core::error::DriverError> {
//! let wire = WireClient::new("http://127.0.0.1:4723");
//! wire.status().await?;
//! let session = wire.new_session(&serde_json::json!({"platformName": "iOS"})).await?;
//! wire.delete_session(&session).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, debug_span, trace, Instrument};

use crate::error::DriverError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Timeout for establishing an HTTP connection to the server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a complete request/response round trip. Session creation
/// can legitimately take this long while the driver boots the app.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The W3C element id key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// ---------------------------------------------------------------------------
// Shared wire types
// ---------------------------------------------------------------------------

/// A rectangle in screen coordinates, as returned by the element rect
/// endpoint. Origin is the top-left corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// The center point of the rectangle, rounded to whole points.
    pub fn center(&self) -> (i64, i64) {
        (
            (self.x + self.width / 2.0).round() as i64,
            (self.y + self.height / 2.0).round() as i64,
        )
    }
}

/// A locator strategy understood by the remote driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Appium's cross-platform accessibility id strategy.
    AccessibilityId(String),
    /// The legacy `name` attribute strategy.
    Name(String),
    /// An arbitrary XPath query.
    XPath(String),
}

impl Strategy {
    /// The W3C `using` / `value` pair for this strategy.
    pub fn as_wire(&self) -> (&'static str, &str) {
        match self {
            Strategy::AccessibilityId(v) => ("accessibility id", v),
            Strategy::Name(v) => ("name", v),
            Strategy::XPath(v) => ("xpath", v),
        }
    }
}

// ---------------------------------------------------------------------------
// Error payload classification
// ---------------------------------------------------------------------------

/// The `value` object of a W3C error response.
#[derive(Debug, Deserialize)]
struct WireErrorValue {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Maps a W3C error payload from a session-creation attempt onto the
/// error taxonomy. Driver messages about missing devices become
/// [`DriverError::DeviceNotAvailable`]; everything else is a capability
/// rejection.
fn classify_session_error(err: &WireErrorValue) -> DriverError {
    let haystack = format!("{} {}", err.error, err.message).to_ascii_lowercase();
    if haystack.contains("device")
        || haystack.contains("simulator")
        || haystack.contains("emulator")
    {
        DriverError::DeviceNotAvailable(err.message.clone())
    } else {
        DriverError::SessionCreationFailed(err.message.clone())
    }
}

// ---------------------------------------------------------------------------
// WireClient
// ---------------------------------------------------------------------------

/// Low-level WebDriver HTTP client.
///
/// One instance serves the whole invocation; it is cheap to clone (the
/// underlying `reqwest::Client` is an `Arc` internally).
#[derive(Debug, Clone)]
pub struct WireClient {
    http: reqwest::Client,
    base: String,
}

impl WireClient {
    /// Create a client for the given base endpoint (no trailing slash).
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.base
    }

    // -----------------------------------------------------------------------
    // Session endpoints
    // -----------------------------------------------------------------------

    /// Probe the server's /status endpoint.
    pub async fn status(&self) -> Result<(), DriverError> {
        self.get("/status").await?;
        Ok(())
    }

    /// Create a new session with the given `alwaysMatch` capabilities and
    /// return its opaque id.
    pub async fn new_session(&self, always_match: &Value) -> Result<String, DriverError> {
        let body = json!({ "capabilities": { "alwaysMatch": always_match } });
        let span = debug_span!("new_session");
        async {
            let value = self
                .send(reqwest::Method::POST, "/session", Some(&body))
                .await
                .map_err(|e| match e {
                    // Re-classify a generic protocol rejection into the
                    // session-creation taxonomy.
                    DriverError::Protocol(msg) => classify_session_error(&WireErrorValue {
                        error: String::new(),
                        message: msg,
                    }),
                    other => other,
                })?;

            let session_id = value
                .get("sessionId")
                .and_then(Value::as_str)
                .ok_or_else(|| DriverError::Protocol("missing sessionId in response".into()))?;
            debug!(session_id, "session created");
            Ok(session_id.to_string())
        }
        .instrument(span)
        .await
    }

    /// Delete a session. A 404 (already gone) is treated as success so
    /// that ending a session stays idempotent.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), DriverError> {
        match self
            .send(reqwest::Method::DELETE, &format!("/session/{session_id}"), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(DriverError::Protocol(msg)) if msg.contains("invalid session") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Cheap liveness probe for an existing session.
    ///
    /// `GET /session/{id}/timeouts` is a W3C endpoint with a trivial
    /// response; any error (including transport errors) means the session
    /// cannot be reused.
    pub async fn session_alive(&self, session_id: &str) -> bool {
        self.get(&format!("/session/{session_id}/timeouts"))
            .await
            .is_ok()
    }

    // -----------------------------------------------------------------------
    // Element endpoints
    // -----------------------------------------------------------------------

    /// Find the first element matching the strategy.
    ///
    /// Returns `Ok(None)` when the driver reports `no such element`;
    /// every other error is propagated.
    pub async fn find_element(
        &self,
        session_id: &str,
        strategy: &Strategy,
    ) -> Result<Option<String>, DriverError> {
        let (using, value) = strategy.as_wire();
        let body = json!({ "using": using, "value": value });
        match self
            .send(
                reqwest::Method::POST,
                &format!("/session/{session_id}/element"),
                Some(&body),
            )
            .await
        {
            Ok(v) => Ok(Some(extract_element_id(&v)?)),
            Err(DriverError::Protocol(msg)) if msg.contains("no such element") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Find all elements matching the strategy, in document order.
    pub async fn find_elements(
        &self,
        session_id: &str,
        strategy: &Strategy,
    ) -> Result<Vec<String>, DriverError> {
        let (using, value) = strategy.as_wire();
        let body = json!({ "using": using, "value": value });
        let v = self
            .send(
                reqwest::Method::POST,
                &format!("/session/{session_id}/elements"),
                Some(&body),
            )
            .await?;
        let list = v
            .as_array()
            .ok_or_else(|| DriverError::Protocol("elements response is not an array".into()))?;
        list.iter().map(extract_element_id).collect()
    }

    /// Click an element.
    pub async fn element_click(&self, session_id: &str, element_id: &str) -> Result<(), DriverError> {
        self.post_empty(&format!("/session/{session_id}/element/{element_id}/click"))
            .await
    }

    /// Clear an element's content. Succeeds on an already-empty field.
    pub async fn element_clear(&self, session_id: &str, element_id: &str) -> Result<(), DriverError> {
        self.post_empty(&format!("/session/{session_id}/element/{element_id}/clear"))
            .await
    }

    /// Send keystrokes to an element.
    pub async fn element_send_keys(
        &self,
        session_id: &str,
        element_id: &str,
        text: &str,
    ) -> Result<(), DriverError> {
        let body = json!({ "text": text });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/element/{element_id}/value"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// The element's visible text.
    pub async fn element_text(
        &self,
        session_id: &str,
        element_id: &str,
    ) -> Result<String, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/element/{element_id}/text"))
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    /// The element's rect in screen coordinates.
    pub async fn element_rect(
        &self,
        session_id: &str,
        element_id: &str,
    ) -> Result<Rect, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/element/{element_id}/rect"))
            .await?;
        serde_json::from_value(v).map_err(|e| DriverError::Protocol(format!("bad rect: {e}")))
    }

    /// Whether the element is enabled.
    pub async fn element_enabled(
        &self,
        session_id: &str,
        element_id: &str,
    ) -> Result<bool, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/element/{element_id}/enabled"))
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    /// Whether the element is displayed.
    pub async fn element_displayed(
        &self,
        session_id: &str,
        element_id: &str,
    ) -> Result<bool, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/element/{element_id}/displayed"))
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    /// An element attribute value, or `None` when the driver reports null.
    pub async fn element_attribute(
        &self,
        session_id: &str,
        element_id: &str,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let v = self
            .get(&format!(
                "/session/{session_id}/element/{element_id}/attribute/{name}"
            ))
            .await?;
        Ok(v.as_str().map(str::to_string))
    }

    // -----------------------------------------------------------------------
    // Pointer gestures (W3C actions)
    // -----------------------------------------------------------------------

    /// Perform a prebuilt W3C actions payload.
    pub async fn perform_actions(&self, session_id: &str, actions: Value) -> Result<(), DriverError> {
        let body = json!({ "actions": [actions] });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/actions"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Single tap at screen coordinates.
    pub async fn tap_at(&self, session_id: &str, x: i64, y: i64) -> Result<(), DriverError> {
        self.perform_actions(session_id, pointer_tap(x, y, 1, 50)).await
    }

    /// Double tap at screen coordinates.
    pub async fn double_tap_at(&self, session_id: &str, x: i64, y: i64) -> Result<(), DriverError> {
        self.perform_actions(session_id, pointer_tap(x, y, 2, 50)).await
    }

    /// Press and hold at screen coordinates for `duration_ms`.
    pub async fn long_press_at(
        &self,
        session_id: &str,
        x: i64,
        y: i64,
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        self.perform_actions(session_id, pointer_tap(x, y, 1, duration_ms))
            .await
    }

    /// Press at the start point, move to the end point over
    /// `duration_ms`, then release.
    pub async fn drag(
        &self,
        session_id: &str,
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        self.perform_actions(session_id, pointer_drag(from, to, duration_ms))
            .await
    }

    // -----------------------------------------------------------------------
    // Inspection and device endpoints
    // -----------------------------------------------------------------------

    /// The bounds of the automation window (the screen, on mobile).
    pub async fn window_rect(&self, session_id: &str) -> Result<Rect, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/window/rect"))
            .await?;
        serde_json::from_value(v)
            .map_err(|e| DriverError::Protocol(format!("bad window rect: {e}")))
    }

    /// The full page source (UI tree) as XML.
    pub async fn source(&self, session_id: &str) -> Result<String, DriverError> {
        let v = self.get(&format!("/session/{session_id}/source")).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    /// A screenshot of the current screen, decoded to raw PNG bytes.
    pub async fn screenshot(&self, session_id: &str) -> Result<Vec<u8>, DriverError> {
        let v = self
            .get(&format!("/session/{session_id}/screenshot"))
            .await?;
        let b64 = v
            .as_str()
            .ok_or_else(|| DriverError::Protocol("screenshot response is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| DriverError::Protocol(format!("bad screenshot encoding: {e}")))
    }

    /// Accept the current alert.
    pub async fn alert_accept(&self, session_id: &str) -> Result<(), DriverError> {
        self.post_empty(&format!("/session/{session_id}/alert/accept")).await
    }

    /// Dismiss the current alert.
    pub async fn alert_dismiss(&self, session_id: &str) -> Result<(), DriverError> {
        self.post_empty(&format!("/session/{session_id}/alert/dismiss")).await
    }

    /// The current alert's text.
    pub async fn alert_text(&self, session_id: &str) -> Result<String, DriverError> {
        let v = self.get(&format!("/session/{session_id}/alert/text")).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    /// Hide the software keyboard (Appium extension).
    pub async fn hide_keyboard(&self, session_id: &str) -> Result<(), DriverError> {
        self.post_empty(&format!("/session/{session_id}/appium/device/hide_keyboard"))
            .await
    }

    /// Send a hardware key code (Appium extension, Android).
    pub async fn press_keycode(&self, session_id: &str, keycode: i64) -> Result<(), DriverError> {
        let body = json!({ "keycode": keycode });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/appium/device/press_keycode"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Bring the app with the given identifier to the foreground.
    pub async fn activate_app(&self, session_id: &str, app_id: &str) -> Result<(), DriverError> {
        let body = json!({ "appId": app_id, "bundleId": app_id });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/appium/device/activate_app"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Terminate the app with the given identifier.
    pub async fn terminate_app(&self, session_id: &str, app_id: &str) -> Result<(), DriverError> {
        let body = json!({ "appId": app_id, "bundleId": app_id });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/appium/device/terminate_app"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Install an app bundle from a path on the server host.
    pub async fn install_app(&self, session_id: &str, app_path: &str) -> Result<(), DriverError> {
        let body = json!({ "appPath": app_path });
        self.send(
            reqwest::Method::POST,
            &format!("/session/{session_id}/appium/device/install_app"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal request plumbing
    // -----------------------------------------------------------------------

    async fn get(&self, path: &str) -> Result<Value, DriverError> {
        self.send(reqwest::Method::GET, path, None).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), DriverError> {
        self.send(reqwest::Method::POST, path, Some(&json!({}))).await?;
        Ok(())
    }

    /// Send one request and unwrap the W3C `value` field.
    ///
    /// Transport failures map to [`DriverError::ServerUnreachable`] (on
    /// connect) or [`DriverError::Timeout`]; W3C error payloads map to
    /// [`DriverError::Protocol`] carrying the driver's message.
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.base, path);
        trace!(%method, %url, "wire request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                DriverError::ServerUnreachable(self.base.clone())
            } else if e.is_timeout() {
                DriverError::Timeout
            } else {
                DriverError::Protocol(e.to_string())
            }
        })?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| DriverError::Protocol(format!("unparseable response: {e}")))?;

        if status.is_success() {
            Ok(payload.get("value").cloned().unwrap_or(Value::Null))
        } else {
            let err: WireErrorValue = payload
                .get("value")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or(WireErrorValue {
                    error: status.to_string(),
                    message: String::new(),
                });
            let detail = if err.message.is_empty() { err.error } else { format!("{}: {}", err.error, err.message) };
            Err(DriverError::Protocol(detail))
        }
    }
}

// ---------------------------------------------------------------------------
// W3C actions payload builders
// ---------------------------------------------------------------------------

/// A touch pointer sequence that taps `count` times at one point,
/// holding each press for `hold_ms`.
fn pointer_tap(x: i64, y: i64, count: u32, hold_ms: u64) -> Value {
    let mut actions = vec![json!({
        "type": "pointerMove", "duration": 0, "x": x, "y": y
    })];
    for i in 0..count {
        if i > 0 {
            actions.push(json!({ "type": "pause", "duration": 80 }));
        }
        actions.push(json!({ "type": "pointerDown", "button": 0 }));
        actions.push(json!({ "type": "pause", "duration": hold_ms }));
        actions.push(json!({ "type": "pointerUp", "button": 0 }));
    }
    pointer_sequence(actions)
}

/// A touch pointer sequence that presses at `from`, moves to `to` over
/// `duration_ms`, and releases.
fn pointer_drag(from: (i64, i64), to: (i64, i64), duration_ms: u64) -> Value {
    pointer_sequence(vec![
        json!({ "type": "pointerMove", "duration": 0, "x": from.0, "y": from.1 }),
        json!({ "type": "pointerDown", "button": 0 }),
        json!({ "type": "pause", "duration": 120 }),
        json!({ "type": "pointerMove", "duration": duration_ms, "x": to.0, "y": to.1 }),
        json!({ "type": "pointerUp", "button": 0 }),
    ])
}

fn pointer_sequence(actions: Vec<Value>) -> Value {
    json!({
        "type": "pointer",
        "id": "finger1",
        "parameters": { "pointerType": "touch" },
        "actions": actions,
    })
}

/// Extract the element id from a W3C find-element value object.
fn extract_element_id(value: &Value) -> Result<String, DriverError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::Protocol("missing element id in response".into()))
}
