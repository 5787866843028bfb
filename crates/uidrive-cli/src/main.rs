//! `uidrive` — drive a mobile or desktop app UI from the command line.
//!
//! One invocation acquires (or reuses) a session against an automation
//! server, executes its action tokens strictly in order, prints the
//! results and exits with a status suitable for CI:
//!
//! ```text
//! uidrive --platform ios --app com.example.tipcalc --keep-session \
//!     type BillField 100 set-slider TipSlider 20 \
//!     tap CalculateButton expect TotalLabel 120
//! ```

mod parse;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use uidrive_core::action::{Action, ActionValue};
use uidrive_core::driver::RemoteDriver;
use uidrive_core::executor::ActionExecutor;
use uidrive_core::pipeline::{Pipeline, RunReport};
use uidrive_core::platform::{Platform, PlatformProfile};
use uidrive_core::session::{FsSessionStore, SessionManager, SessionOptions};
use uidrive_core::wire::WireClient;

const EXIT_USAGE: i32 = 2;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0  every action completed and every assertion passed
  1  an assertion failed or an action aborted the run
  2  usage or action parse error
  3  environment failure (server unreachable, device unavailable,
     session creation failed)";

#[derive(Parser)]
#[command(
    name = "uidrive",
    about = "Cross-platform UI automation session orchestrator",
    after_help = EXIT_CODES_HELP
)]
struct Cli {
    /// Target platform: ios, android or maccatalyst
    #[arg(short, long, env = "UIDRIVE_PLATFORM")]
    platform: String,

    /// Application identifier (bundle id or package name)
    #[arg(short, long, env = "UIDRIVE_APP")]
    app: String,

    /// Automation server endpoint (default http://127.0.0.1:4723)
    #[arg(long, env = "UIDRIVE_SERVER")]
    server: Option<String>,

    /// Persist the session descriptor for later reuse
    #[arg(long)]
    keep_session: bool,

    /// Reuse a persisted session when it is still alive
    #[arg(long)]
    reuse_session: bool,

    /// Deadline for wait-class element resolution, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Command to auto-start the automation server when unreachable
    #[arg(long, value_name = "CMD", env = "UIDRIVE_LAUNCH_SERVER")]
    launch_server: Option<String>,

    /// Action tokens, executed in order (e.g. `tap Login expect Status ok`)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    actions: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let actions = match parse::parse_actions(&cli.actions) {
        Ok(actions) => actions,
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_USAGE;
        }
    };

    let profile = match PlatformProfile::resolve(&cli.platform) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_USAGE;
        }
    };
    let profile = match cli.server {
        Some(server) => profile.with_endpoint(server),
        None => profile,
    };
    let platform = profile.platform;
    debug!(%platform, endpoint = %profile.endpoint, "resolved profile");

    let wire = WireClient::new(profile.endpoint.clone());
    let sessions = Arc::new(SessionManager::new(
        Arc::new(wire.clone()),
        Arc::new(FsSessionStore::new()),
        profile.clone(),
        &cli.app,
    ));

    // A lone end-session never creates a session just to tear it down.
    if actions == [Action::EndSession] {
        return match sessions.end(None).await {
            Ok(()) => {
                println!("Session ended");
                0
            }
            Err(e) => {
                eprintln!("Error: {e}");
                if e.is_environment() { 3 } else { 1 }
            }
        };
    }

    let options = SessionOptions {
        reuse: cli.reuse_session,
        keep: cli.keep_session,
        launch_command: cli.launch_server,
    };
    let acquired = match sessions.acquire(&options).await {
        Ok(acquired) => acquired,
        Err(e) => {
            eprintln!("Error: {e}");
            return if e.is_environment() { 3 } else { 1 };
        }
    };

    let driver = Arc::new(RemoteDriver::new(wire, acquired.session_id.clone()));
    let executor = ActionExecutor::new(driver, profile, &cli.app)
        .with_wait_timeout(Duration::from_millis(cli.timeout_ms));
    let pipeline = Pipeline::new(executor, sessions, acquired.session_id);

    let report = pipeline.run(&actions).await;
    print_report(&report, platform);
    report.exit_code()
}

fn print_report(report: &RunReport, platform: Platform) {
    for record in &report.records {
        match &record.outcome.value {
            Some(ActionValue::Text(text)) => println!("{text}"),
            Some(ActionValue::Bool(b)) => println!("{b}"),
            Some(ActionValue::List(items)) => {
                for item in items {
                    println!("{item}");
                }
            }
            Some(ActionValue::Rect(rect)) => {
                println!("{}", serde_json::json!(rect));
            }
            Some(ActionValue::Path(path)) => println!("{}", path.display()),
            None => {}
        }
    }

    for verdict in &report.assertions {
        println!("{verdict}");
    }

    if let Some(failure) = &report.failure {
        eprintln!("Error [{platform}]: {failure}");
    }

    let failed = report.failed_assertions();
    eprintln!(
        "{} action(s), {} assertion(s), {} failed",
        report.records.len(),
        report.assertions.len(),
        failed
    );
}
