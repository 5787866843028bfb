//! Platform profile registry.
//!
//! Platform-specific behavior differences are shallow (capability key
//! names, accessibility attribute names, a handful of feature flags), so
//! they are modeled as data in a [`PlatformProfile`] rather than as
//! per-platform trait impls. The executor consults the feature flags
//! before attempting an optional action and fails fast with
//! [`DriverError::UnsupportedAction`] instead of sending an invalid
//! remote call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::DriverError;

/// Default automation server endpoint, shared by all platforms.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4723";

/// The platforms uidrive can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    MacCatalyst,
}

impl Platform {
    /// All recognized platforms.
    pub const ALL: [Platform; 3] = [Platform::Ios, Platform::Android, Platform::MacCatalyst];

    /// The canonical lowercase identifier (`ios`, `android`, `maccatalyst`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::MacCatalyst => "maccatalyst",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "maccatalyst" => Ok(Platform::MacCatalyst),
            other => Err(DriverError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Optional features that differ across platforms.
///
/// Mac Catalyst is a desktop target: hardware keyboard, no back button,
/// fixed orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Software keyboard can be dismissed programmatically.
    pub dismiss_keyboard: bool,
    /// Hardware/system key codes (including back) can be sent.
    pub press_key: bool,
    /// Device orientation can be queried and changed.
    pub orientation: bool,
}

/// Driver connection parameters and defaults for one platform.
///
/// Immutable once constructed; built at process start from the platform
/// argument via [`PlatformProfile::resolve`].
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    /// Which platform this profile describes.
    pub platform: Platform,
    /// Automation server endpoint (base URL, no trailing slash).
    pub endpoint: String,
    /// The driver's automation name capability.
    pub automation_name: &'static str,
    /// The capability key naming the application under test.
    pub app_capability: &'static str,
    /// The native attribute an authoring-side AutomationId maps to.
    pub identifier_attribute: &'static str,
    /// The attribute carrying the user-visible text/label.
    pub label_attribute: &'static str,
    /// XPath matching button elements in this platform's source tree.
    pub button_xpath: &'static str,
    /// Optional feature support for this platform.
    pub features: FeatureFlags,
}

impl PlatformProfile {
    /// Look up the profile for a platform identifier.
    ///
    /// Fails with [`DriverError::UnsupportedPlatform`] for anything other
    /// than `ios`, `android` or `maccatalyst`.
    pub fn resolve(platform: &str) -> Result<Self, DriverError> {
        Ok(Self::for_platform(platform.parse()?))
    }

    /// The static profile for a known platform.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Ios => Self {
                platform,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                automation_name: "XCUITest",
                app_capability: "appium:bundleId",
                identifier_attribute: "name",
                label_attribute: "label",
                button_xpath: "//XCUIElementTypeButton",
                features: FeatureFlags {
                    dismiss_keyboard: true,
                    press_key: false,
                    orientation: true,
                },
            },
            Platform::Android => Self {
                platform,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                automation_name: "UiAutomator2",
                app_capability: "appium:appPackage",
                identifier_attribute: "resource-id",
                label_attribute: "text",
                button_xpath: "//android.widget.Button",
                features: FeatureFlags {
                    dismiss_keyboard: true,
                    press_key: true,
                    orientation: true,
                },
            },
            Platform::MacCatalyst => Self {
                platform,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                automation_name: "Mac2",
                app_capability: "appium:bundleId",
                identifier_attribute: "identifier",
                label_attribute: "title",
                button_xpath: "//XCUIElementTypeButton",
                features: FeatureFlags {
                    dismiss_keyboard: false,
                    press_key: false,
                    orientation: false,
                },
            },
        }
    }

    /// Replace the default endpoint with a caller-supplied one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// The W3C `alwaysMatch` capability object for a new session.
    ///
    /// `noReset` is always true so that application state survives
    /// repeated invocations; the reuse model depends on it and callers
    /// may not override it implicitly.
    pub fn capabilities(&self, app_id: &str) -> Value {
        let platform_name = match self.platform {
            Platform::Ios => "iOS",
            Platform::Android => "Android",
            Platform::MacCatalyst => "Mac",
        };
        let mut caps = json!({
            "platformName": platform_name,
            "appium:automationName": self.automation_name,
            "appium:noReset": true,
        });
        caps[self.app_capability] = Value::String(app_id.to_string());
        caps
    }
}
