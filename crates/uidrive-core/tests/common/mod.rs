//! Shared test helpers for uidrive-core integration tests.
//!
//! Provides a scripted in-memory UI tree behind the [`UiDriver`] seam and
//! a counting session backend, so tests exercise resolution, execution
//! and session lifecycle without a network server.

// Each integration binary compiles its own copy; not every binary uses
// every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use uidrive_core::driver::UiDriver;
use uidrive_core::error::DriverError;
use uidrive_core::executor::ActionExecutor;
use uidrive_core::platform::{Platform, PlatformProfile};
use uidrive_core::session::SessionBackend;
use uidrive_core::wire::{Rect, Strategy};

// ---------------------------------------------------------------------------
// Scripted UI tree
// ---------------------------------------------------------------------------

/// One element in the scripted tree. Attributes model what the remote
/// driver exposes: `accessibility-id` for the Appium strategy, `name`
/// for the name strategy, and native attributes (`label`, `text`,
/// `resource-id`, `type`, ...) for XPath matching.
#[derive(Debug, Clone)]
pub struct MockElement {
    pub handle: String,
    pub attrs: HashMap<String, String>,
    pub initial_text: String,
    pub rect: Rect,
    pub enabled: bool,
    pub displayed: bool,
    /// Element stays unmatched until this many find calls have happened.
    pub appears_after_finds: u32,
}

impl MockElement {
    pub fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            attrs: HashMap::new(),
            initial_text: String::new(),
            rect: Rect { x: 0.0, y: 0.0, width: 100.0, height: 40.0 },
            enabled: true,
            displayed: true,
            appears_after_finds: 0,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the Appium accessibility id (and mirrors it to `name`, the
    /// way real drivers expose it).
    pub fn accessibility_id(self, id: &str) -> Self {
        self.attr("accessibility-id", id).attr("name", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.initial_text = text.to_string();
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect { x, y, width, height };
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn appears_after_finds(mut self, finds: u32) -> Self {
        self.appears_after_finds = finds;
        self
    }
}

/// A scripted [`UiDriver`] over a fixed element list.
///
/// Mutating calls append to `log` in call order; field text mutates the
/// way a real driver's clear/send_keys would, so typed text echoes back
/// through text queries.
pub struct MockDriver {
    elements: Vec<MockElement>,
    texts: Mutex<HashMap<String, String>>,
    screen: Rect,
    find_calls: AtomicU32,
    pub log: Mutex<Vec<String>>,
    pub alert: Option<String>,
}

impl MockDriver {
    pub fn new(elements: Vec<MockElement>) -> Self {
        let texts = elements
            .iter()
            .map(|e| (e.handle.clone(), e.initial_text.clone()))
            .collect();
        Self {
            elements,
            texts: Mutex::new(texts),
            screen: Rect { x: 0.0, y: 0.0, width: 400.0, height: 800.0 },
            find_calls: AtomicU32::new(0),
            log: Mutex::new(Vec::new()),
            alert: None,
        }
    }

    pub fn with_alert(mut self, text: &str) -> Self {
        self.alert = Some(text.to_string());
        self
    }

    pub fn log_entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn element(&self, handle: &str) -> Result<&MockElement, DriverError> {
        self.elements
            .iter()
            .find(|e| e.handle == handle)
            .ok_or_else(|| DriverError::Protocol(format!("stale element reference: {handle}")))
    }

    fn visible_matches(&self, strategy: &Strategy) -> Vec<String> {
        let calls = self.find_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.elements
            .iter()
            .filter(|e| calls > e.appears_after_finds && matches(&e.attrs, strategy))
            .map(|e| e.handle.clone())
            .collect()
    }
}

/// Strategy matching over the scripted attribute map. XPath support
/// covers exactly the query shapes the resolver and executor generate.
fn matches(attrs: &HashMap<String, String>, strategy: &Strategy) -> bool {
    match strategy {
        Strategy::AccessibilityId(id) => attrs.get("accessibility-id") == Some(id),
        Strategy::Name(name) => attrs.get("name") == Some(name),
        Strategy::XPath(xpath) => xpath_matches(attrs, xpath),
    }
}

fn xpath_matches(attrs: &HashMap<String, String>, xpath: &str) -> bool {
    if let Some(rest) = xpath.strip_prefix("//*[contains(@") {
        let Some((attr, rest)) = rest.split_once(", ") else { return false };
        let Some(rest) = rest.strip_suffix(")]") else { return false };
        let Some(value) = literal_value(rest) else { return false };
        attrs.get(attr).is_some_and(|v| v.contains(value))
    } else if let Some(rest) = xpath.strip_prefix("//*[@") {
        if let Some((attr, rest)) = rest.split_once('=') {
            let Some(rest) = rest.strip_suffix(']') else { return false };
            let Some(value) = literal_value(rest) else { return false };
            attrs.get(attr).map(String::as_str) == Some(value)
        } else {
            let Some(attr) = rest.strip_suffix(']') else { return false };
            attrs.contains_key(attr)
        }
    } else if let Some(element_type) = xpath.strip_prefix("//") {
        attrs.get("type").map(String::as_str) == Some(element_type)
    } else {
        false
    }
}

/// Unwraps a single-quoted or double-quoted XPath string literal.
/// `concat()` forms are not supported.
fn literal_value(literal: &str) -> Option<&str> {
    literal
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| literal.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
}

#[async_trait]
impl UiDriver for MockDriver {
    async fn find(&self, strategy: &Strategy) -> Result<Option<String>, DriverError> {
        Ok(self.visible_matches(strategy).into_iter().next())
    }

    async fn find_all(&self, strategy: &Strategy) -> Result<Vec<String>, DriverError> {
        Ok(self.visible_matches(strategy))
    }

    async fn click(&self, element: &str) -> Result<(), DriverError> {
        self.element(element)?;
        self.record(format!("click:{element}"));
        Ok(())
    }

    async fn clear(&self, element: &str) -> Result<(), DriverError> {
        self.element(element)?;
        self.texts.lock().unwrap().insert(element.to_string(), String::new());
        self.record(format!("clear:{element}"));
        Ok(())
    }

    async fn send_keys(&self, element: &str, text: &str) -> Result<(), DriverError> {
        self.element(element)?;
        let mut texts = self.texts.lock().unwrap();
        texts.entry(element.to_string()).or_default().push_str(text);
        self.record(format!("send_keys:{element}:{text}"));
        Ok(())
    }

    async fn text(&self, element: &str) -> Result<String, DriverError> {
        self.element(element)?;
        Ok(self.texts.lock().unwrap().get(element).cloned().unwrap_or_default())
    }

    async fn rect(&self, element: &str) -> Result<Rect, DriverError> {
        Ok(self.element(element)?.rect)
    }

    async fn enabled(&self, element: &str) -> Result<bool, DriverError> {
        Ok(self.element(element)?.enabled)
    }

    async fn displayed(&self, element: &str) -> Result<bool, DriverError> {
        Ok(self.element(element)?.displayed)
    }

    async fn attribute(&self, element: &str, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.element(element)?.attrs.get(name).cloned())
    }

    async fn screen_rect(&self) -> Result<Rect, DriverError> {
        Ok(self.screen)
    }

    async fn tap_at(&self, x: i64, y: i64) -> Result<(), DriverError> {
        self.record(format!("tap_at:{x},{y}"));
        Ok(())
    }

    async fn double_tap_at(&self, x: i64, y: i64) -> Result<(), DriverError> {
        self.record(format!("double_tap_at:{x},{y}"));
        Ok(())
    }

    async fn long_press_at(&self, x: i64, y: i64, duration_ms: u64) -> Result<(), DriverError> {
        self.record(format!("long_press_at:{x},{y}:{duration_ms}"));
        Ok(())
    }

    async fn drag(
        &self,
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        self.record(format!(
            "drag:{},{}->{},{}:{duration_ms}",
            from.0, from.1, to.0, to.1
        ));
        Ok(())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        Ok("<AppiumAUT/>".to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(vec![0x89, 0x50, 0x4E, 0x47])
    }

    async fn alert_accept(&self) -> Result<(), DriverError> {
        self.record("alert_accept".to_string());
        Ok(())
    }

    async fn alert_dismiss(&self) -> Result<(), DriverError> {
        self.record("alert_dismiss".to_string());
        Ok(())
    }

    async fn alert_text(&self) -> Result<String, DriverError> {
        self.alert
            .clone()
            .ok_or_else(|| DriverError::Protocol("no such alert".to_string()))
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        self.record("hide_keyboard".to_string());
        Ok(())
    }

    async fn press_keycode(&self, keycode: i64) -> Result<(), DriverError> {
        self.record(format!("press_keycode:{keycode}"));
        Ok(())
    }

    async fn activate_app(&self, app_id: &str) -> Result<(), DriverError> {
        self.record(format!("activate_app:{app_id}"));
        Ok(())
    }

    async fn terminate_app(&self, app_id: &str) -> Result<(), DriverError> {
        self.record(format!("terminate_app:{app_id}"));
        Ok(())
    }

    async fn install_app(&self, app_path: &str) -> Result<(), DriverError> {
        self.record(format!("install_app:{app_path}"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Counting session backend
// ---------------------------------------------------------------------------

/// A [`SessionBackend`] that mints predictable ids and counts creations.
#[derive(Default)]
pub struct MockBackend {
    created: AtomicU32,
    alive: Mutex<HashSet<String>>,
    pub fail_create_with: Mutex<Option<DriverError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a session id the backend will report as alive.
    pub fn with_alive(self, session_id: &str) -> Self {
        self.alive.lock().unwrap().insert(session_id.to_string());
        self
    }

    pub fn creations(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn server_status(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn create_session(&self, _capabilities: &Value) -> Result<String, DriverError> {
        if let Some(error) = self.fail_create_with.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("mock-session-{n}");
        self.alive.lock().unwrap().insert(id.clone());
        Ok(id)
    }

    async fn session_alive(&self, session_id: &str) -> bool {
        self.alive.lock().unwrap().contains(session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), DriverError> {
        self.alive.lock().unwrap().remove(session_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const APP_ID: &str = "com.example.tipcalc";

/// The tip calculator screen: a bill field, a tip slider, a calculate
/// button and a total label showing `total`.
pub fn tip_calculator(total: &str) -> Vec<MockElement> {
    vec![
        MockElement::new("el-bill").accessibility_id("BillField").attr("type", "XCUIElementTypeTextField"),
        MockElement::new("el-slider")
            .accessibility_id("TipSlider")
            .rect(50.0, 500.0, 300.0, 40.0),
        MockElement::new("el-calc")
            .accessibility_id("CalculateButton")
            .attr("type", "XCUIElementTypeButton")
            .attr("label", "Calculate"),
        MockElement::new("el-total")
            .accessibility_id("TotalLabel")
            .attr("label", "Total")
            .text(total),
    ]
}

/// An executor over a mock driver for the given platform.
pub fn executor_for(driver: Arc<MockDriver>, platform: Platform) -> ActionExecutor {
    ActionExecutor::new(driver, PlatformProfile::for_platform(platform), APP_ID)
}
