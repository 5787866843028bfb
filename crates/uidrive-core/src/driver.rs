//! Backend-agnostic driver trait for UI automation.
//!
//! [`UiDriver`] is the seam between action execution and the remote
//! protocol. The production implementation, [`RemoteDriver`], binds a
//! [`WireClient`](crate::wire::WireClient) to one session id; tests
//! substitute a scripted mock. Element handles are opaque strings minted
//! by the remote driver and are only valid until the next mutating
//! action, which is why nothing in this crate caches them.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::wire::{Rect, Strategy, WireClient};

/// Operations the action executor needs from an automation backend.
///
/// Every method maps to one remote protocol operation. Methods that take
/// an element handle assume the handle was resolved against the current
/// UI tree; stale handles surface as [`DriverError::Protocol`] from the
/// remote side.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Find the first element matching a strategy, in document order.
    async fn find(&self, strategy: &Strategy) -> Result<Option<String>, DriverError>;

    /// Find all elements matching a strategy, in document order.
    async fn find_all(&self, strategy: &Strategy) -> Result<Vec<String>, DriverError>;

    async fn click(&self, element: &str) -> Result<(), DriverError>;
    async fn clear(&self, element: &str) -> Result<(), DriverError>;
    async fn send_keys(&self, element: &str, text: &str) -> Result<(), DriverError>;
    async fn text(&self, element: &str) -> Result<String, DriverError>;
    async fn rect(&self, element: &str) -> Result<Rect, DriverError>;
    async fn enabled(&self, element: &str) -> Result<bool, DriverError>;
    async fn displayed(&self, element: &str) -> Result<bool, DriverError>;
    async fn attribute(&self, element: &str, name: &str) -> Result<Option<String>, DriverError>;

    /// The screen bounds, used to scale direction vectors for swipes.
    async fn screen_rect(&self) -> Result<Rect, DriverError>;

    async fn tap_at(&self, x: i64, y: i64) -> Result<(), DriverError>;
    async fn double_tap_at(&self, x: i64, y: i64) -> Result<(), DriverError>;
    async fn long_press_at(&self, x: i64, y: i64, duration_ms: u64) -> Result<(), DriverError>;
    async fn drag(
        &self,
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
    ) -> Result<(), DriverError>;

    async fn page_source(&self) -> Result<String, DriverError>;
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    async fn alert_accept(&self) -> Result<(), DriverError>;
    async fn alert_dismiss(&self) -> Result<(), DriverError>;
    async fn alert_text(&self) -> Result<String, DriverError>;

    async fn hide_keyboard(&self) -> Result<(), DriverError>;
    async fn press_keycode(&self, keycode: i64) -> Result<(), DriverError>;

    async fn activate_app(&self, app_id: &str) -> Result<(), DriverError>;
    async fn terminate_app(&self, app_id: &str) -> Result<(), DriverError>;
    async fn install_app(&self, app_path: &str) -> Result<(), DriverError>;
}

/// [`UiDriver`] implementation over the WebDriver wire protocol.
///
/// Holds the session id for the one active session of this invocation;
/// constructed by the session lifecycle manager after acquire.
#[derive(Debug, Clone)]
pub struct RemoteDriver {
    wire: WireClient,
    session_id: String,
}

impl RemoteDriver {
    /// Bind a wire client to an acquired session.
    pub fn new(wire: WireClient, session_id: impl Into<String>) -> Self {
        Self { wire, session_id: session_id.into() }
    }

    /// The id of the session this driver operates on.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl UiDriver for RemoteDriver {
    async fn find(&self, strategy: &Strategy) -> Result<Option<String>, DriverError> {
        self.wire.find_element(&self.session_id, strategy).await
    }

    async fn find_all(&self, strategy: &Strategy) -> Result<Vec<String>, DriverError> {
        self.wire.find_elements(&self.session_id, strategy).await
    }

    async fn click(&self, element: &str) -> Result<(), DriverError> {
        self.wire.element_click(&self.session_id, element).await
    }

    async fn clear(&self, element: &str) -> Result<(), DriverError> {
        self.wire.element_clear(&self.session_id, element).await
    }

    async fn send_keys(&self, element: &str, text: &str) -> Result<(), DriverError> {
        self.wire.element_send_keys(&self.session_id, element, text).await
    }

    async fn text(&self, element: &str) -> Result<String, DriverError> {
        self.wire.element_text(&self.session_id, element).await
    }

    async fn rect(&self, element: &str) -> Result<Rect, DriverError> {
        self.wire.element_rect(&self.session_id, element).await
    }

    async fn enabled(&self, element: &str) -> Result<bool, DriverError> {
        self.wire.element_enabled(&self.session_id, element).await
    }

    async fn displayed(&self, element: &str) -> Result<bool, DriverError> {
        self.wire.element_displayed(&self.session_id, element).await
    }

    async fn attribute(&self, element: &str, name: &str) -> Result<Option<String>, DriverError> {
        self.wire.element_attribute(&self.session_id, element, name).await
    }

    async fn screen_rect(&self) -> Result<Rect, DriverError> {
        self.wire.window_rect(&self.session_id).await
    }

    async fn tap_at(&self, x: i64, y: i64) -> Result<(), DriverError> {
        self.wire.tap_at(&self.session_id, x, y).await
    }

    async fn double_tap_at(&self, x: i64, y: i64) -> Result<(), DriverError> {
        self.wire.double_tap_at(&self.session_id, x, y).await
    }

    async fn long_press_at(&self, x: i64, y: i64, duration_ms: u64) -> Result<(), DriverError> {
        self.wire.long_press_at(&self.session_id, x, y, duration_ms).await
    }

    async fn drag(
        &self,
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        self.wire.drag(&self.session_id, from, to, duration_ms).await
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.wire.source(&self.session_id).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.wire.screenshot(&self.session_id).await
    }

    async fn alert_accept(&self) -> Result<(), DriverError> {
        self.wire.alert_accept(&self.session_id).await
    }

    async fn alert_dismiss(&self) -> Result<(), DriverError> {
        self.wire.alert_dismiss(&self.session_id).await
    }

    async fn alert_text(&self) -> Result<String, DriverError> {
        self.wire.alert_text(&self.session_id).await
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        self.wire.hide_keyboard(&self.session_id).await
    }

    async fn press_keycode(&self, keycode: i64) -> Result<(), DriverError> {
        self.wire.press_keycode(&self.session_id, keycode).await
    }

    async fn activate_app(&self, app_id: &str) -> Result<(), DriverError> {
        self.wire.activate_app(&self.session_id, app_id).await
    }

    async fn terminate_app(&self, app_id: &str) -> Result<(), DriverError> {
        self.wire.terminate_app(&self.session_id, app_id).await
    }

    async fn install_app(&self, app_path: &str) -> Result<(), DriverError> {
        self.wire.install_app(&self.session_id, app_path).await
    }
}
