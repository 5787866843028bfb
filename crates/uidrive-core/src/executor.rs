//! Action execution against a resolved element and the active session.
//!
//! [`ActionExecutor`] maps each [`Action`] to exactly one remote protocol
//! operation (or a short fixed sequence, e.g. `set-slider` resolves the
//! element, computes a target offset from the percentage and performs a
//! drag gesture). It re-resolves the target identifier on every action —
//! intervening actions mutate the remote UI tree and invalidate prior
//! node references, so handles are never carried across actions.
//!
//! Feature-gated actions consult the platform profile first and fail
//! fast with `UnsupportedAction` rather than sending an invalid remote
//! call. Inspection actions never mutate remote state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info_span, Instrument};

use crate::action::{Action, ActionOutcome, ActionValue, AssertionVerdict, Direction};
use crate::driver::UiDriver;
use crate::error::DriverError;
use crate::locator::{xpath_literal, ElementLocator, Resolver};
use crate::platform::PlatformProfile;
use crate::wire::Strategy;

/// Fraction of the screen dimension a swipe travels.
const SWIPE_TRAVEL: f64 = 0.6;

/// Fraction of the screen dimension a scroll travels.
const SCROLL_TRAVEL: f64 = 0.3;

/// Maximum scroll attempts for `scroll-to` before giving up.
const SCROLL_TO_ATTEMPTS: u32 = 8;

/// Default long-press hold when the caller does not supply one.
pub const DEFAULT_LONG_PRESS_MS: u64 = 800;

/// Executes automation actions against the active session.
pub struct ActionExecutor {
    driver: Arc<dyn UiDriver>,
    resolver: Resolver,
    profile: PlatformProfile,
    app_id: String,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn UiDriver>, profile: PlatformProfile, app_id: impl Into<String>) -> Self {
        Self {
            driver,
            resolver: Resolver::new(profile.clone()),
            profile,
            app_id: app_id.into(),
        }
    }

    /// Override the wait-class resolution deadline.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.resolver = self.resolver.with_wait_timeout(timeout);
        self
    }

    /// Executes one action and returns its outcome.
    ///
    /// Handles every [`Action`] variant except [`Action::EndSession`],
    /// which belongs to the session lifecycle manager. Driver errors
    /// propagate so callers can classify them for exit-code purposes.
    pub async fn execute(&self, action: &Action) -> Result<ActionOutcome, DriverError> {
        let span = info_span!("execute_action", action = action.name());
        async {
            let start = Instant::now();
            let result = self.execute_inner(action).await;
            match &result {
                Ok(outcome) => debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    success = outcome.success,
                    "action complete"
                ),
                Err(e) => debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "action failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute_inner(&self, action: &Action) -> Result<ActionOutcome, DriverError> {
        match action {
            Action::Tap { id } => {
                let element = self.resolve(id).await?;
                self.driver.click(&element).await?;
                Ok(ActionOutcome::success(format!("Tapped '{id}'")))
            }

            Action::TapLike { id } => {
                let element = self.resolver.resolve_partial(self.driver.as_ref(), id).await?;
                self.driver.click(&element).await?;
                Ok(ActionOutcome::success(format!("Tapped element matching '{id}'")))
            }

            Action::DoubleTap { id } => {
                let element = self.resolve(id).await?;
                let (x, y) = self.driver.rect(&element).await?.center();
                self.driver.double_tap_at(x, y).await?;
                Ok(ActionOutcome::success(format!("Double-tapped '{id}'")))
            }

            Action::LongPress { id, duration_ms } => {
                let element = self.resolve(id).await?;
                let (x, y) = self.driver.rect(&element).await?.center();
                self.driver.long_press_at(x, y, *duration_ms).await?;
                Ok(ActionOutcome::success(format!(
                    "Long-pressed '{id}' for {duration_ms}ms"
                )))
            }

            Action::Type { id, text } => {
                let element = self.resolve(id).await?;
                // Contract: typing replaces the field content, it never
                // appends to it.
                self.driver.clear(&element).await?;
                self.driver.send_keys(&element, text).await?;
                Ok(ActionOutcome::success(format!("Typed into '{id}'")))
            }

            Action::Clear { id } => {
                let element = self.resolve(id).await?;
                self.driver.clear(&element).await?;
                Ok(ActionOutcome::success(format!("Cleared '{id}'")))
            }

            Action::GetText { id } => {
                let element = self.resolve(id).await?;
                let text = self.driver.text(&element).await?;
                Ok(ActionOutcome::success(format!("Text of '{id}'"))
                    .with_value(ActionValue::Text(text)))
            }

            Action::Exists { id } => {
                let exists = match self.resolve(id).await {
                    Ok(_) => true,
                    Err(DriverError::ElementNotFound { .. }) => false,
                    Err(e) => return Err(e),
                };
                Ok(ActionOutcome::success(format!("'{id}' exists: {exists}"))
                    .with_value(ActionValue::Bool(exists)))
            }

            Action::IsEnabled { id } => {
                let element = self.resolve(id).await?;
                let enabled = self.driver.enabled(&element).await?;
                Ok(ActionOutcome::success(format!("'{id}' enabled: {enabled}"))
                    .with_value(ActionValue::Bool(enabled)))
            }

            Action::IsVisible { id } => {
                let element = self.resolve(id).await?;
                let visible = self.driver.displayed(&element).await?;
                Ok(ActionOutcome::success(format!("'{id}' visible: {visible}"))
                    .with_value(ActionValue::Bool(visible)))
            }

            Action::Expect { id, expected } => {
                // The actual value is captured at call time; a missing
                // element is a failed assertion here, not a pipeline
                // abort, so interleaved chains keep running.
                let locator = ElementLocator::id(id.clone());
                let actual = match self
                    .resolver
                    .resolve_wait(self.driver.as_ref(), &locator)
                    .await
                {
                    Ok(element) => self.driver.text(&element).await?,
                    Err(DriverError::ElementNotFound { .. }) => "<element not found>".to_string(),
                    Err(e) => return Err(e),
                };
                let verdict = AssertionVerdict {
                    id: id.clone(),
                    expected: expected.clone(),
                    passed: actual.contains(expected.as_str()),
                    actual,
                };
                Ok(ActionOutcome::success(verdict.to_string()).with_assertion(verdict))
            }

            Action::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(ActionOutcome::success(format!("Waited {ms}ms")))
            }

            Action::WaitFor { id } => {
                let start = Instant::now();
                let locator = ElementLocator::id(id.clone());
                self.resolver.resolve_wait(self.driver.as_ref(), &locator).await?;
                Ok(ActionOutcome::success(format!(
                    "'{id}' appeared after {}ms",
                    start.elapsed().as_millis() as u64
                )))
            }

            Action::DismissKeyboard => {
                self.require_feature(self.profile.features.dismiss_keyboard, "dismiss-keyboard")?;
                self.driver.hide_keyboard().await?;
                Ok(ActionOutcome::success("Keyboard dismissed"))
            }

            Action::PressKey { keycode } => {
                self.require_feature(self.profile.features.press_key, "press-key")?;
                self.driver.press_keycode(*keycode).await?;
                Ok(ActionOutcome::success(format!("Pressed key {keycode}")))
            }

            Action::AcceptAlert => {
                self.driver.alert_accept().await?;
                Ok(ActionOutcome::success("Alert accepted"))
            }

            Action::DismissAlert => {
                self.driver.alert_dismiss().await?;
                Ok(ActionOutcome::success("Alert dismissed"))
            }

            Action::GetAlert => {
                let text = self.driver.alert_text().await?;
                Ok(ActionOutcome::success("Alert text").with_value(ActionValue::Text(text)))
            }

            Action::SetSlider { id, percent } => {
                // NaN survives clamp and would silently drag to the
                // track origin.
                if !percent.is_finite() {
                    return Ok(ActionOutcome::failure(format!(
                        "Slider percentage must be finite (got {percent})"
                    )));
                }
                let clamped = percent.clamp(0.0, 100.0);
                let element = self.resolve(id).await?;
                let rect = self.driver.rect(&element).await?;
                let (_, center_y) = rect.center();
                let target_x = (rect.x + rect.width * clamped / 100.0).round() as i64;
                let from = rect.center();
                self.driver.drag(from, (target_x, center_y), 300).await?;
                Ok(ActionOutcome::success(format!("Slider '{id}' set to {clamped}%")))
            }

            Action::Drag { x1, y1, x2, y2 } => {
                self.driver.drag((*x1, *y1), (*x2, *y2), 500).await?;
                Ok(ActionOutcome::success(format!(
                    "Dragged ({x1}, {y1}) -> ({x2}, {y2})"
                )))
            }

            Action::Swipe { direction } => {
                let (from, to) = self.screen_travel(*direction, SWIPE_TRAVEL).await?;
                self.driver.drag(from, to, 300).await?;
                Ok(ActionOutcome::success(format!("Swiped {direction}")))
            }

            Action::Scroll { direction } => {
                let (from, to) = self.screen_travel(*direction, SCROLL_TRAVEL).await?;
                self.driver.drag(from, to, 300).await?;
                Ok(ActionOutcome::success(format!("Scrolled {direction}")))
            }

            Action::ScrollTo { id, direction } => {
                let locator = ElementLocator::id(id.clone());
                for attempt in 0..SCROLL_TO_ATTEMPTS {
                    match self.resolver.resolve_once(self.driver.as_ref(), &locator).await {
                        Ok(_) => {
                            return Ok(ActionOutcome::success(format!(
                                "'{id}' in view after {attempt} scrolls"
                            )));
                        }
                        Err(DriverError::ElementNotFound { .. }) => {
                            let (from, to) =
                                self.screen_travel(*direction, SCROLL_TRAVEL).await?;
                            self.driver.drag(from, to, 300).await?;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(DriverError::ElementNotFound {
                    locator: id.clone(),
                    waited_ms: 0,
                })
            }

            Action::TapCoords { x, y } => {
                if *x < 0 || *y < 0 {
                    return Ok(ActionOutcome::failure(format!(
                        "Coordinates must be non-negative (got x={x}, y={y})"
                    )));
                }
                self.driver.tap_at(*x, *y).await?;
                Ok(ActionOutcome::success(format!("Tapped at ({x}, {y})")))
            }

            Action::Activate => {
                self.driver.activate_app(&self.app_id).await?;
                Ok(ActionOutcome::success(format!("Activated {}", self.app_id)))
            }

            Action::Terminate => {
                self.driver.terminate_app(&self.app_id).await?;
                Ok(ActionOutcome::success(format!("Terminated {}", self.app_id)))
            }

            Action::Install { path } => {
                self.driver.install_app(path).await?;
                Ok(ActionOutcome::success(format!("Installed {path}")))
            }

            Action::Screenshot { path } => {
                let bytes = self.driver.screenshot().await?;
                tokio::fs::write(path, &bytes).await?;
                Ok(ActionOutcome::success(format!("Screenshot saved to {}", path.display()))
                    .with_value(ActionValue::Path(path.clone())))
            }

            Action::PageSource => {
                let source = self.driver.page_source().await?;
                Ok(ActionOutcome::success("Page source").with_value(ActionValue::Text(source)))
            }

            Action::ListButtons => {
                let strategy = Strategy::XPath(self.profile.button_xpath.to_string());
                let names = self.describe_all(&strategy).await?;
                Ok(ActionOutcome::success(format!("{} buttons", names.len()))
                    .with_value(ActionValue::List(names)))
            }

            Action::ListElements => {
                let strategy = Strategy::XPath(format!(
                    "//*[@{}]",
                    self.profile.identifier_attribute
                ));
                let names = self.describe_all(&strategy).await?;
                Ok(ActionOutcome::success(format!("{} elements", names.len()))
                    .with_value(ActionValue::List(names)))
            }

            Action::FindText { text } => {
                let strategy = Strategy::XPath(format!(
                    "//*[contains(@{}, {})]",
                    self.profile.label_attribute,
                    xpath_literal(text)
                ));
                let mut matches = Vec::new();
                for element in self.driver.find_all(&strategy).await? {
                    matches.push(self.driver.text(&element).await?);
                }
                Ok(ActionOutcome::success(format!("{} matches for \"{text}\"", matches.len()))
                    .with_value(ActionValue::List(matches)))
            }

            Action::GetRect { id } => {
                let element = self.resolve(id).await?;
                let rect = self.driver.rect(&element).await?;
                Ok(ActionOutcome::success(format!("Rect of '{id}'"))
                    .with_value(ActionValue::Rect(rect)))
            }

            // Session management belongs to the lifecycle manager.
            Action::EndSession => Ok(ActionOutcome::failure(
                "end-session must be handled by the session manager",
            )),
        }
    }

    /// Single-shot resolution via the platform fallback chain.
    async fn resolve(&self, id: &str) -> Result<String, DriverError> {
        self.resolver
            .resolve_once(self.driver.as_ref(), &ElementLocator::id(id.to_string()))
            .await
    }

    fn require_feature(&self, supported: bool, action: &str) -> Result<(), DriverError> {
        if supported {
            Ok(())
        } else {
            Err(DriverError::UnsupportedAction {
                action: action.to_string(),
                platform: self.profile.platform.to_string(),
            })
        }
    }

    /// Start and end points for a directional gesture centered on the
    /// screen, traveling `fraction` of the relevant screen dimension.
    async fn screen_travel(
        &self,
        direction: Direction,
        fraction: f64,
    ) -> Result<((i64, i64), (i64, i64)), DriverError> {
        let screen = self.driver.screen_rect().await?;
        let (cx, cy) = screen.center();
        let (vx, vy) = direction.vector();
        let distance = if vx == 0.0 { screen.height } else { screen.width } * fraction;
        let (dx, dy) = ((vx * distance / 2.0) as i64, (vy * distance / 2.0) as i64);
        Ok(((cx - dx, cy - dy), (cx + dx, cy + dy)))
    }

    /// Best identifier-or-text description of every element matched by a
    /// strategy, in document order.
    async fn describe_all(&self, strategy: &Strategy) -> Result<Vec<String>, DriverError> {
        let mut names = Vec::new();
        for element in self.driver.find_all(strategy).await? {
            let name = match self
                .driver
                .attribute(&element, self.profile.identifier_attribute)
                .await?
            {
                Some(id) if !id.is_empty() => id,
                _ => self.driver.text(&element).await?,
            };
            names.push(name);
        }
        Ok(names)
    }
}
