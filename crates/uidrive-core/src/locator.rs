//! Element resolution against the remote UI tree.
//!
//! A locator is a logical name plus an optional text filter. Resolution
//! tries a platform-specific fallback chain, first match wins:
//!
//! 1. exact match on the platform's native accessibility identifier
//!    attribute (what an authoring-side AutomationId maps to),
//! 2. exact match on the secondary `name` attribute,
//! 3. exact match on visible text/label content.
//!
//! Partial resolution (used by `tap-like`) substring-matches the native
//! identifier attribute instead and picks the first matching node in
//! document order; ties are not an error.
//!
//! Every call performs a fresh UI-tree query. Intervening actions mutate
//! the tree and invalidate prior node references, so handles are never
//! cached across actions. Only wait-class resolution polls; everything
//! else resolves once and fails immediately if absent.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::driver::UiDriver;
use crate::error::DriverError;
use crate::platform::PlatformProfile;
use crate::wire::Strategy;

/// Default deadline for wait-class resolution.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed polling interval for wait-class resolution.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An abstract element identifier with an optional text filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLocator {
    /// The logical name (accessibility identifier, name or visible text).
    pub id: String,
    /// When set, only elements whose text contains this string match.
    pub text_filter: Option<String>,
}

impl ElementLocator {
    /// A locator with no text filter.
    pub fn id(id: impl Into<String>) -> Self {
        Self { id: id.into(), text_filter: None }
    }
}

/// Resolves locators against a driver using the platform's fallback chain.
#[derive(Debug, Clone)]
pub struct Resolver {
    profile: PlatformProfile,
    wait_timeout: Duration,
}

impl Resolver {
    pub fn new(profile: PlatformProfile) -> Self {
        Self { profile, wait_timeout: DEFAULT_WAIT_TIMEOUT }
    }

    /// Override the wait-class resolution deadline.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// The exact-match fallback chain for an identifier.
    pub fn strategies(&self, id: &str) -> Vec<Strategy> {
        vec![
            Strategy::AccessibilityId(id.to_string()),
            Strategy::Name(id.to_string()),
            Strategy::XPath(format!(
                "//*[@{}={}]",
                self.profile.label_attribute,
                xpath_literal(id)
            )),
        ]
    }

    /// The substring-match strategy for partial resolution.
    pub fn partial_strategy(&self, id: &str) -> Strategy {
        Strategy::XPath(format!(
            "//*[contains(@{}, {})]",
            self.profile.identifier_attribute,
            xpath_literal(id)
        ))
    }

    /// Resolve once; fail immediately with [`DriverError::ElementNotFound`]
    /// if nothing matches.
    pub async fn resolve_once(
        &self,
        driver: &dyn UiDriver,
        locator: &ElementLocator,
    ) -> Result<String, DriverError> {
        match self.try_resolve(driver, locator).await? {
            Some(handle) => Ok(handle),
            None => Err(DriverError::ElementNotFound {
                locator: locator.id.clone(),
                waited_ms: 0,
            }),
        }
    }

    /// Resolve with polling: retry at a fixed interval until the deadline,
    /// then fail with [`DriverError::ElementNotFound`] carrying the total
    /// time waited.
    pub async fn resolve_wait(
        &self,
        driver: &dyn UiDriver,
        locator: &ElementLocator,
    ) -> Result<String, DriverError> {
        let start = Instant::now();
        loop {
            if let Some(handle) = self.try_resolve(driver, locator).await? {
                return Ok(handle);
            }
            if start.elapsed() >= self.wait_timeout {
                return Err(DriverError::ElementNotFound {
                    locator: locator.id.clone(),
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Partial resolution: first node in document order whose native
    /// identifier attribute contains `id`.
    pub async fn resolve_partial(
        &self,
        driver: &dyn UiDriver,
        id: &str,
    ) -> Result<String, DriverError> {
        let strategy = self.partial_strategy(id);
        let mut matches = driver.find_all(&strategy).await?;
        if matches.is_empty() {
            return Err(DriverError::ElementNotFound { locator: id.to_string(), waited_ms: 0 });
        }
        Ok(matches.remove(0))
    }

    /// One pass through the fallback chain. Returns `Ok(None)` when no
    /// strategy produced a match, so callers decide whether to poll.
    async fn try_resolve(
        &self,
        driver: &dyn UiDriver,
        locator: &ElementLocator,
    ) -> Result<Option<String>, DriverError> {
        for strategy in self.strategies(&locator.id) {
            match &locator.text_filter {
                None => {
                    if let Some(handle) = driver.find(&strategy).await? {
                        trace!(id = %locator.id, ?strategy, "resolved");
                        return Ok(Some(handle));
                    }
                }
                Some(filter) => {
                    for handle in driver.find_all(&strategy).await? {
                        if driver.text(&handle).await?.contains(filter.as_str()) {
                            trace!(id = %locator.id, ?strategy, filter, "resolved with filter");
                            return Ok(Some(handle));
                        }
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Quote a string as an XPath literal.
///
/// XPath 1.0 has no escape syntax inside string literals; strings
/// containing both quote kinds need `concat()`. Every XPath built from
/// caller-supplied text must go through this.
pub(crate) fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn resolver(platform: Platform) -> Resolver {
        Resolver::new(PlatformProfile::for_platform(platform))
    }

    #[test]
    fn chain_order_is_id_then_name_then_label() {
        let chain = resolver(Platform::Ios).strategies("Total");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0], Strategy::AccessibilityId("Total".into()));
        assert_eq!(chain[1], Strategy::Name("Total".into()));
        assert_eq!(chain[2], Strategy::XPath("//*[@label='Total']".into()));
    }

    #[test]
    fn label_attribute_follows_platform() {
        let chain = resolver(Platform::Android).strategies("Total");
        assert_eq!(chain[2], Strategy::XPath("//*[@text='Total']".into()));

        let chain = resolver(Platform::MacCatalyst).strategies("Total");
        assert_eq!(chain[2], Strategy::XPath("//*[@title='Total']".into()));
    }

    #[test]
    fn partial_strategy_uses_contains_on_native_attribute() {
        let strategy = resolver(Platform::Android).partial_strategy("Tip");
        assert_eq!(
            strategy,
            Strategy::XPath("//*[contains(@resource-id, 'Tip')]".into())
        );
    }

    #[test]
    fn xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }
}
