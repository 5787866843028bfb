//! Session lifecycle management.
//!
//! One invocation drives exactly one remote automation session. The
//! [`SessionManager`] owns that session for the duration of the process:
//! it creates or rehydrates it, optionally persists a descriptor for a
//! later independent invocation, and ends it on explicit request.
//!
//! # Non-teardown policy
//!
//! Sessions are deliberately NOT torn down at process exit, even when no
//! descriptor was persisted. The automation server owns the underlying
//! session and reclaims it on its own idle timeout; tearing it down here
//! would defeat the cross-invocation reuse model. Only an explicit
//! end-session action (idempotent) releases it early.
//!
//! # Cross-invocation reuse
//!
//! Reuse is modeled as an explicit descriptor store with load/save/delete
//! operations rather than in-process global state, keeping the manager
//! testable with a substitutable store. A persisted descriptor is keyed
//! by platform + application identifier; on reuse the session is probed
//! with a cheap liveness call, and an expired session falls back to
//! creating a fresh one (a recoverable condition, logged and signaled,
//! never a hard failure).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DriverError;
use crate::platform::{Platform, PlatformProfile};
use crate::wire::WireClient;

/// How long to wait for an auto-started server to answer /status.
const LAUNCH_READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Poll interval while waiting for an auto-started server.
const LAUNCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Returns the uidrive home directory (`~/.uidrive`).
pub fn uidrive_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".uidrive")
}

// ---------------------------------------------------------------------------
// Descriptor and store
// ---------------------------------------------------------------------------

/// A serialized record of a live remote session, durable across process
/// invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Opaque session token minted by the remote driver.
    pub session_id: String,
    /// Platform the session was created for.
    pub platform: Platform,
    /// Application identifier the session targets.
    pub app_id: String,
    /// Endpoint the session lives on.
    pub endpoint: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Durable storage for session descriptors, keyed by platform + app id.
pub trait SessionStore: Send + Sync {
    fn load(&self, platform: Platform, app_id: &str) -> Option<SessionDescriptor>;
    fn save(&self, descriptor: &SessionDescriptor) -> std::io::Result<()>;
    fn delete(&self, platform: Platform, app_id: &str) -> std::io::Result<()>;
}

/// Filesystem store under `~/.uidrive/sessions/` (one JSON file per
/// platform + app pair).
pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    /// Store rooted at the default uidrive home.
    pub fn new() -> Self {
        Self::at(uidrive_dir().join("sessions"))
    }

    /// Store rooted at an explicit directory (used by tests).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, platform: Platform, app_id: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.json", platform, sanitize(app_id)))
    }
}

impl Default for FsSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FsSessionStore {
    fn load(&self, platform: Platform, app_id: &str) -> Option<SessionDescriptor> {
        let path = self.path_for(platform, app_id);
        let raw = std::fs::read_to_string(&path).ok()?;
        let descriptor: SessionDescriptor = serde_json::from_str(&raw).ok()?;
        // A descriptor written for a different pair is never returned,
        // even if the file name collides after sanitization.
        (descriptor.platform == platform && descriptor.app_id == app_id).then_some(descriptor)
    }

    fn save(&self, descriptor: &SessionDescriptor) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(descriptor.platform, &descriptor.app_id);
        let json = serde_json::to_string_pretty(descriptor)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    fn delete(&self, platform: Platform, app_id: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.path_for(platform, app_id)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<(Platform, String), SessionDescriptor>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, platform: Platform, app_id: &str) -> Option<SessionDescriptor> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .get(&(platform, app_id.to_string()))
            .cloned()
    }

    fn save(&self, descriptor: &SessionDescriptor) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert((descriptor.platform, descriptor.app_id.clone()), descriptor.clone());
        Ok(())
    }

    fn delete(&self, platform: Platform, app_id: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .remove(&(platform, app_id.to_string()));
        Ok(())
    }
}

/// Replace path-hostile characters in an app identifier.
fn sanitize(app_id: &str) -> String {
    app_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// The session-level operations the manager needs from the remote server.
///
/// Production uses [`WireClient`]; tests substitute a mock that counts
/// creations.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Probe the server itself.
    async fn server_status(&self) -> Result<(), DriverError>;

    /// Create a session and return its opaque id.
    async fn create_session(&self, capabilities: &Value) -> Result<String, DriverError>;

    /// Whether an existing session still answers.
    async fn session_alive(&self, session_id: &str) -> bool;

    /// Delete a session; already-gone sessions are not an error.
    async fn delete_session(&self, session_id: &str) -> Result<(), DriverError>;
}

#[async_trait]
impl SessionBackend for WireClient {
    async fn server_status(&self) -> Result<(), DriverError> {
        self.status().await
    }

    async fn create_session(&self, capabilities: &Value) -> Result<String, DriverError> {
        self.new_session(capabilities).await
    }

    async fn session_alive(&self, session_id: &str) -> bool {
        WireClient::session_alive(self, session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), DriverError> {
        WireClient::delete_session(self, session_id).await
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Session-control flags for one invocation.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Rehydrate a persisted descriptor when one matches.
    pub reuse: bool,
    /// Persist the descriptor after successful creation or reuse.
    pub keep: bool,
    /// Command line to auto-start the automation server if it is
    /// unreachable (single bounded attempt).
    pub launch_command: Option<String>,
}

/// The result of acquiring a session.
#[derive(Debug, Clone)]
pub struct AcquireOutcome {
    /// The active session id for this invocation.
    pub session_id: String,
    /// The persisted session was rehydrated; zero creations occurred.
    pub reused: bool,
    /// A persisted session had expired and exactly one new session was
    /// created in its place (recoverable, logged not failed).
    pub recreated: bool,
}

/// Owns the one active session of an invocation.
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
    store: Arc<dyn SessionStore>,
    profile: PlatformProfile,
    app_id: String,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        store: Arc<dyn SessionStore>,
        profile: PlatformProfile,
        app_id: impl Into<String>,
    ) -> Self {
        Self { backend, store, profile, app_id: app_id.into() }
    }

    /// Acquire a session per the options: rehydrate a live persisted one,
    /// or create a new one (recreating silently if the persisted one has
    /// expired).
    ///
    /// Environment failures (`ServerUnreachable`, `DeviceNotAvailable`,
    /// `SessionCreationFailed`) propagate; an expired persisted session
    /// does not.
    pub async fn acquire(&self, options: &SessionOptions) -> Result<AcquireOutcome, DriverError> {
        let mut recreated = false;

        if options.reuse {
            if let Some(descriptor) = self.store.load(self.profile.platform, &self.app_id) {
                if self.backend.session_alive(&descriptor.session_id).await {
                    info!(
                        session_id = %descriptor.session_id,
                        platform = %self.profile.platform,
                        "reusing persisted session"
                    );
                    return Ok(AcquireOutcome {
                        session_id: descriptor.session_id,
                        reused: true,
                        recreated: false,
                    });
                }
                warn!(
                    session_id = %descriptor.session_id,
                    "persisted session expired; creating a new one"
                );
                let _ = self.store.delete(self.profile.platform, &self.app_id);
                recreated = true;
            }
        }

        let session_id = self.create(options).await?;
        info!(session_id = %session_id, platform = %self.profile.platform, "session created");

        if options.keep {
            let descriptor = SessionDescriptor {
                session_id: session_id.clone(),
                platform: self.profile.platform,
                app_id: self.app_id.clone(),
                endpoint: self.profile.endpoint.clone(),
                created_at: Utc::now(),
            };
            self.store.save(&descriptor)?;
            debug!("session descriptor persisted");
        }

        Ok(AcquireOutcome { session_id, reused: false, recreated })
    }

    /// End a session: request termination from the remote server and
    /// delete the persisted descriptor if present. Idempotent — ending an
    /// already-ended or nonexistent session succeeds silently.
    pub async fn end(&self, session_id: Option<&str>) -> Result<(), DriverError> {
        let target = session_id.map(str::to_string).or_else(|| {
            self.store
                .load(self.profile.platform, &self.app_id)
                .map(|d| d.session_id)
        });

        if let Some(id) = target {
            if let Err(e) = self.backend.delete_session(&id).await {
                // The server may have reclaimed it already.
                debug!(session_id = %id, error = %e, "delete_session failed; treating as ended");
            } else {
                info!(session_id = %id, "session ended");
            }
        }

        self.store.delete(self.profile.platform, &self.app_id)?;
        Ok(())
    }

    /// Create a new session, optionally auto-starting the server once if
    /// it is unreachable.
    async fn create(&self, options: &SessionOptions) -> Result<String, DriverError> {
        let capabilities = self.profile.capabilities(&self.app_id);

        match self.backend.create_session(&capabilities).await {
            Err(DriverError::ServerUnreachable(endpoint)) => {
                let Some(command) = options.launch_command.as_deref() else {
                    return Err(DriverError::ServerUnreachable(endpoint));
                };
                warn!(%endpoint, "server unreachable; attempting auto-start");
                self.launch_server(command).await?;
                // Single bounded retry; anything beyond is the caller's
                // responsibility.
                self.backend.create_session(&capabilities).await
            }
            other => other,
        }
    }

    /// Spawn the automation server and poll /status until it answers or
    /// the startup deadline passes.
    async fn launch_server(&self, command: &str) -> Result<(), DriverError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            DriverError::ServerUnreachable("empty server launch command".to_string())
        })?;

        tokio::process::Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let start = Instant::now();
        loop {
            if self.backend.server_status().await.is_ok() {
                info!(elapsed_ms = start.elapsed().as_millis() as u64, "server is up");
                return Ok(());
            }
            if start.elapsed() >= LAUNCH_READY_TIMEOUT {
                return Err(DriverError::ServerUnreachable(format!(
                    "auto-started server did not become ready within {}s",
                    LAUNCH_READY_TIMEOUT.as_secs()
                )));
            }
            tokio::time::sleep(LAUNCH_POLL_INTERVAL).await;
        }
    }
}
