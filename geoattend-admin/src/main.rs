//! geoattend-admin - Event administration dashboard
//!
//! Creates events, lists active and past events, downloads attendance
//! reports and reviews failed attendance attempts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use geoattend_admin::attendance::render_attempts;
use geoattend_admin::events::{render_events, EventForm};
use geoattend_admin::Dashboard;
use geoattend_common::config::ConfigResolver;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "geoattend-admin")]
#[command(about = "Administer GeoAttend events and attendance")]
#[command(version)]
struct Cli {
    /// Config file (default: GEOATTEND_CONFIG, then ~/.config/geoattend/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Attendance API base URL (overrides config and GEOATTEND_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an event with a geofenced venue
    CreateEvent(CreateEventArgs),
    /// List events in progress or upcoming
    Active,
    /// List finished events
    Past,
    /// Download an event's attendance report
    Download {
        event_id: String,

        /// Directory to save the report in
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Replace an existing file with the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// List failed attendance attempts for an event
    FailedAttempts {
        event_id: String,
    },
    /// Approve (or with --reject, reject) a failed attempt
    Approve {
        attempt_id: String,

        #[arg(long)]
        reject: bool,
    },
}

#[derive(Args, Debug)]
struct CreateEventArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: Option<String>,

    /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM:SS" UTC)
    #[arg(long)]
    start: String,

    /// End time (RFC 3339 or "YYYY-MM-DD HH:MM:SS" UTC)
    #[arg(long)]
    end: String,

    #[arg(long, allow_hyphen_values = true)]
    latitude: f64,

    #[arg(long, allow_hyphen_values = true)]
    longitude: f64,

    /// Geofence radius in meters
    #[arg(long, default_value = "100")]
    radius: f64,

    /// Venue name shown to attendees
    #[arg(long)]
    location: Option<String>,
}

impl From<CreateEventArgs> for EventForm {
    fn from(args: CreateEventArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            start_time: args.start,
            end_time: args.end,
            latitude: args.latitude,
            longitude: args.longitude,
            radius_meters: args.radius,
            location_name: args.location,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigResolver::new("admin")
        .load(cli.config.as_deref(), cli.api_url.as_deref())
        .context("Loading configuration")?;
    geoattend_common::logging::init_tracing(&config.logging)?;

    info!(
        "Starting GeoAttend dashboard (geoattend-admin) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let dashboard = Dashboard::new(&config)?;

    match cli.command {
        Command::CreateEvent(args) => {
            let form = EventForm::from(args);
            match dashboard.create_event(&form).await? {
                Some(event_id) => println!("Created event {}", event_id),
                None => println!("Event created"),
            }
        }
        Command::Active => {
            let events = dashboard.active_events().await.context("Listing active events")?;
            println!("{}", render_events(&events));
        }
        Command::Past => {
            let events = dashboard.past_events().await.context("Listing past events")?;
            println!("{}", render_events(&events));
        }
        Command::Download {
            event_id,
            output,
            overwrite,
        } => {
            let path = dashboard
                .download_attendance(&event_id, &output, overwrite)
                .await
                .with_context(|| format!("Downloading attendance for event {}", event_id))?;
            println!("Saved {}", path.display());
        }
        Command::FailedAttempts { event_id } => {
            let attempts = dashboard
                .failed_attempts(&event_id)
                .await
                .with_context(|| format!("Listing failed attempts for event {}", event_id))?;
            println!("{}", render_attempts(&attempts));
        }
        Command::Approve { attempt_id, reject } => {
            let message = dashboard.review_attempt(&attempt_id, !reject).await?;
            println!("{}", message);
        }
    }

    Ok(())
}
