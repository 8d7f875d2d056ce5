//! Electree CLI - log in, register and inspect the current session.
//!
//! This binary stands in for the app screens: it drives the session manager
//! from `electree-core` and prints what the screens would show.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use electree_core::auth::validation::validate_password_change;
use electree_core::auth::{BusyFlag, BusyGuard};
use electree_core::dashboard::{self, Range, SeriesStats};
use electree_core::{ApiClient, AuthError, Config, Profile, SessionManager, SessionState};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Glyphs for the text sparkline, lowest to highest
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Parser)]
#[command(name = "electree", version, about = "Electree - energy price tracking client")]
struct Cli {
    /// Backend URL (overrides the config file)
    #[arg(long, env = "ELECTREE_API_URL", global = true)]
    server: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        /// Account email (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(long, env = "ELECTREE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Password (prompted for twice when omitted)
        #[arg(long, env = "ELECTREE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Remove the stored session token
    Logout,
    /// Show who is logged in
    Whoami {
        /// Print the raw decoded claims as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the demo price series
    Dashboard {
        /// spot, day or week
        #[arg(long, default_value = "spot")]
        range: Range,
    },
}

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file output is flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!("Electree CLI starting");

    // Effective settings for this run; never written back as a whole
    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.api_base_url = server;
    }

    let store = config.open_store()?;
    let api = ApiClient::from_config(&config, store).context("Failed to create API client")?;
    let session = SessionManager::new(api);
    let busy = BusyFlag::new();

    match cli.command {
        Commands::Login { email, password } => {
            cmd_login(&session, &busy, config.last_email.as_deref(), email, password).await
        }
        Commands::Register {
            name,
            email,
            password,
        } => cmd_register(&session, &busy, &name, &email, password).await,
        Commands::Logout => {
            session.logout().await.map_err(display_error)?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami { json } => cmd_whoami(&session, json).await,
        Commands::Dashboard { range } => cmd_dashboard(&session, range).await,
    }
}

/// Turn a session error into the message a user should see.
fn display_error(e: AuthError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

/// Claim the busy flag for a login or registration.
fn begin_action(busy: &BusyFlag) -> Result<BusyGuard> {
    busy.try_begin()
        .context("A login or registration is already in progress")
}

async fn cmd_login(
    session: &SessionManager,
    busy: &BusyFlag,
    last_email: Option<&str>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = email
        .or_else(|| last_email.map(str::to_string))
        .context("--email is required on first login")?;
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ")?,
    };

    let _guard = begin_action(busy)?;
    let claims = session.login(&email, &password).await.map_err(display_error)?;

    if let Err(e) = Config::remember_last_email(&email) {
        warn!(error = %e, "Failed to save config");
    }

    let profile = Profile::from_claims(&claims);
    println!("{}", profile.greeting());
    Ok(())
}

async fn cmd_register(
    session: &SessionManager,
    busy: &BusyFlag,
    name: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            let first = rpassword::prompt_password("Password (at least 8 characters): ")?;
            let second = rpassword::prompt_password("Repeat password: ")?;
            validate_password_change(&first, &second).map_err(display_error)?;
            first
        }
    };

    let _guard = begin_action(busy)?;
    let message = session
        .register(name, email, &password)
        .await
        .map_err(display_error)?;
    println!("{}", message);
    println!("You can now log in with `electree login --email {}`", email);
    Ok(())
}

async fn cmd_whoami(session: &SessionManager, json: bool) -> Result<()> {
    if let SessionState::Anonymous = session.state().await.map_err(display_error)? {
        println!("Not logged in");
        return Ok(());
    }

    let Some(claims) = session.current_claims().await else {
        println!("Logged in (token carries no readable profile)");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&claims)?);
        return Ok(());
    }

    let profile = Profile::from_claims(&claims);
    println!("{}  [{}]", profile.greeting(), profile.initials());
    if let Some(ref email) = profile.email {
        println!("Email:   {}", email);
    }
    if let Some(expires) = claims.expires_at() {
        let remaining = (expires - chrono::Utc::now()).num_minutes().max(0);
        println!("Expires: {} ({} min left)", expires.format("%Y-%m-%d %H:%M UTC"), remaining);
    }
    Ok(())
}

async fn cmd_dashboard(session: &SessionManager, range: Range) -> Result<()> {
    let greeting = session
        .profile()
        .await
        .unwrap_or_default()
        .greeting();
    println!("Electree - {}", greeting);

    let series = range.demo_series();
    let Some(stats) = SeriesStats::of(series) else {
        println!("No data for {}", range);
        return Ok(());
    };

    println!("Range: {}  min {}  max {}", range, stats.min, stats.max);
    println!("{}", sparkline(series));
    Ok(())
}

fn sparkline(series: &[u32]) -> String {
    let top = (SPARK_GLYPHS.len() - 1) as f64;
    dashboard::scaled(series)
        .into_iter()
        .map(|s| SPARK_GLYPHS[(s * top).round() as usize])
        .collect()
}
