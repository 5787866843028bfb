//! # uidrive-core
//!
//! Core library for cross-platform UI automation over the WebDriver
//! protocol.
//!
//! This crate provides the foundational components for driving mobile and
//! desktop application UIs through an Appium-compatible automation server:
//! platform profiles, session lifecycle with cross-invocation reuse,
//! element resolution with per-platform fallback chains, and ordered
//! action execution with assertion reporting.
//!
//! ## Modules
//!
//! - [`platform`] - Platform registry (ios, android, maccatalyst) with
//!   capability and attribute profiles
//! - [`wire`] - HTTP client for the W3C WebDriver protocol plus Appium
//!   extensions
//! - [`driver`] - Backend-agnostic [`driver::UiDriver`] trait and its
//!   remote implementation
//! - [`locator`] - Element resolution with identifier/name/label fallback
//!   and wait-class polling
//! - [`session`] - Session creation, persistence, reuse and auto-start of
//!   the automation server
//! - [`action`] - Action types, values and assertion verdicts
//! - [`executor`] - Maps each action to remote protocol operations
//! - [`pipeline`] - Ordered execution, run reports and exit codes
//!
//! ## External dependencies
//!
//! A running Appium-compatible server (default `http://127.0.0.1:4723`)
//! with the platform driver installed (`XCUITest`, `UiAutomator2` or
//! `Mac2`), plus a booted device, emulator or simulator for the target
//! platform.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use uidrive_core::action::Action;
//! use uidrive_core::driver::RemoteDriver;
//! use uidrive_core::executor::ActionExecutor;
//! use uidrive_core::pipeline::Pipeline;
//! use uidrive_core::platform::PlatformProfile;
//! use uidrive_core::session::{FsSessionStore, SessionManager, SessionOptions};
//! use uidrive_core::wire::WireClient;
//!
//! # async fn run() -> Result<(), uidrive_core::error::DriverError> {
//! let profile = PlatformProfile::resolve("ios")?;
//! let wire = WireClient::new(&profile.endpoint);
//! let sessions = Arc::new(SessionManager::new(
//!     Arc::new(wire.clone()),
//!     Arc::new(FsSessionStore::new()),
//!     profile.clone(),
//!     "com.example.tipcalc",
//! ));
//!
//! let acquired = sessions.acquire(&SessionOptions::default()).await?;
//! let driver = Arc::new(RemoteDriver::new(wire, acquired.session_id.clone()));
//! let executor = ActionExecutor::new(driver, profile, "com.example.tipcalc");
//!
//! let pipeline = Pipeline::new(executor, sessions, acquired.session_id);
//! let report = pipeline
//!     .run(&[
//!         Action::Tap { id: "CalculateButton".into() },
//!         Action::Expect { id: "TotalLabel".into(), expected: "120".into() },
//!     ])
//!     .await;
//! std::process::exit(report.exit_code());
//! # }
//! ```

pub mod action;
pub mod driver;
pub mod error;
pub mod executor;
pub mod locator;
pub mod pipeline;
pub mod platform;
pub mod session;
pub mod wire;
