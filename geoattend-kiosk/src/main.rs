//! geoattend-kiosk - Attendee registration client
//!
//! Looks up an event, walks the registration wizard (photo from an image
//! file, location from a configured device fix or manual entry), submits,
//! and shows the confirmation screen.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use geoattend_common::api::EventDetails;
use geoattend_common::config::ConfigResolver;
use geoattend_common::GeoCoordinate;
use geoattend_kiosk::capture::{
    FixedPositionSource, GeolocationError, PositionSource, StillImageCamera,
    UnavailablePositionSource,
};
use geoattend_kiosk::flow::FlowOutcome;
use geoattend_kiosk::poller::{PollOutcome, PollState};
use geoattend_kiosk::wizard::{StepResult, REGISTRATION_ID};
use geoattend_kiosk::Kiosk;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "geoattend-kiosk")]
#[command(about = "Register event attendance with a selfie and your location")]
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
    /// Show event details
    Event {
        event_id: String,
    },
    /// Register attendance for an event
    Register(RegisterArgs),
    /// Poll attendance status until it settles
    Status {
        event_id: String,

        /// Registration number (default: the one remembered on this device)
        #[arg(long)]
        reg_no: Option<String>,
    },
    /// Show the confirmation screen for the last registration
    Confirm {
        event_id: String,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    event_id: String,

    /// Registration number (default: the one remembered on this device)
    #[arg(long)]
    reg_no: Option<String>,

    /// Selfie image file served as the camera feed
    #[arg(long, value_name = "FILE")]
    photo: PathBuf,

    /// Position reported by the device, as "lat,lng"
    #[arg(
        long,
        env = "GEOATTEND_DEVICE_POSITION",
        value_name = "LAT,LNG",
        allow_hyphen_values = true
    )]
    device_position: Option<GeoCoordinate>,

    /// Enter the location manually instead of asking the device
    #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
    location: Option<GeoCoordinate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigResolver::new("kiosk")
        .load(cli.config.as_deref(), cli.api_url.as_deref())
        .context("Loading configuration")?;
    geoattend_common::logging::init_tracing(&config.logging)?;

    info!(
        "Starting GeoAttend kiosk (geoattend-kiosk) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let kiosk = Kiosk::open(config)?;
    let cancel = shutdown_token();

    match cli.command {
        Command::Event { event_id } => {
            let event = kiosk
                .api
                .event(&event_id)
                .await
                .with_context(|| format!("Loading event {}", event_id))?;
            print_event(&event);
        }
        Command::Register(args) => register(&kiosk, args, &cancel).await?,
        Command::Status { event_id, reg_no } => {
            let reg_no = match reg_no {
                Some(reg_no) => reg_no,
                None => REGISTRATION_ID
                    .load(kiosk.store.as_ref())?
                    .ok_or_else(|| anyhow!("No registration number remembered, pass --reg-no"))?,
            };
            poll_status(&kiosk, &event_id, &reg_no, &cancel).await?;
        }
        Command::Confirm { event_id } => confirm(&kiosk, &event_id, &cancel).await?,
    }

    Ok(())
}

/// Cancelled on Ctrl-C
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            on_signal.cancel();
        }
    });
    cancel
}

async fn register(kiosk: &Kiosk, args: RegisterArgs, cancel: &CancellationToken) -> Result<()> {
    let event = kiosk
        .api
        .event(&args.event_id)
        .await
        .with_context(|| format!("Loading event {}", args.event_id))?;
    print_event(&event);

    let position_source: Box<dyn PositionSource> = match args.device_position {
        Some(coordinate) => Box::new(FixedPositionSource::new(coordinate)),
        None => Box::new(UnavailablePositionSource::new(
            GeolocationError::PositionUnavailable("no positioning device configured".to_string()),
        )),
    };

    let mut flow = kiosk.registration_flow(
        args.event_id.clone(),
        StillImageCamera::new(&args.photo),
        position_source,
    );

    let wizard = flow.wizard_mut();
    if let Some(reg_no) = args.reg_no {
        require(wizard.set_registration_id(reg_no))?;
    }
    require(wizard.next().await)?;
    if let Some(message) = wizard.message() {
        bail!("{}", message);
    }
    require(wizard.capture_photo())?;
    require(wizard.next().await)?;
    match args.location {
        Some(coordinate) => require(wizard.set_manual_coordinates(coordinate.lat(), coordinate.lng()))?,
        None => require(wizard.locate().await).context("Pass --location LAT,LNG to enter it manually")?,
    }
    require(wizard.next().await)?;

    let outcome = flow.submit().await?;
    flow.teardown();
    match outcome {
        FlowOutcome::Confirmed(_) => confirm(kiosk, &args.event_id, cancel).await,
        FlowOutcome::RetakePhoto(result) => {
            bail!("{} Take a new photo and register again.", result.message)
        }
        FlowOutcome::ReturnToEventList(result) => {
            bail!("{} Check the event and try again from the event list.", result.message)
        }
        FlowOutcome::Failed(result) => bail!("{}", result.message),
    }
}

async fn poll_status(kiosk: &Kiosk, event_id: &str, reg_no: &str, cancel: &CancellationToken) -> Result<()> {
    let mut poller = kiosk.status_poller();
    let mut states = poller.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if let PollState::Pending { attempts } = state {
                println!("Still pending (check {})...", attempts);
            }
        }
    });

    let outcome = poller.run(event_id, reg_no, cancel).await;
    progress.abort();

    match outcome {
        PollOutcome::Finished(PollState::Registered(attendee)) => {
            println!("Attendance registered");
            if !attendee.name.is_empty() {
                println!("  Name:         {}", attendee.name);
            }
            println!("  Registration: {}", attendee.registration_id);
            if let Some(timestamp) = attendee.timestamp {
                println!("  Recorded at:  {}", timestamp);
            }
            Ok(())
        }
        PollOutcome::Finished(PollState::StillProcessing { .. }) => {
            println!("Your attendance is still being processed, check back later");
            Ok(())
        }
        PollOutcome::Finished(PollState::Error(e)) => bail!("{}", e),
        PollOutcome::Finished(other) => bail!("Polling stopped in state {:?}", other),
        PollOutcome::Cancelled => {
            warn!("Status polling cancelled");
            Ok(())
        }
    }
}

async fn confirm(kiosk: &Kiosk, event_id: &str, cancel: &CancellationToken) -> Result<()> {
    let mut screen = kiosk.confirmation_screen();
    match screen.load(event_id, cancel).await? {
        Some(view) => println!("{}", view),
        None => warn!("Confirmation cancelled"),
    }
    Ok(())
}

fn require(step: StepResult) -> Result<()> {
    match step {
        StepResult::Blocked(message) => Err(anyhow!(message)),
        _ => Ok(()),
    }
}

fn print_event(event: &EventDetails) {
    println!("{} (event {})", event.title, event.id);
    if let Some(description) = &event.description {
        println!("  {}", description);
    }
    println!("  From: {}", event.start_time);
    println!("  To:   {}", event.end_time);
    match &event.location_name {
        Some(name) => println!("  At:   {} ({:.6}, {:.6})", name, event.latitude, event.longitude),
        None => println!("  At:   {:.6}, {:.6}", event.latitude, event.longitude),
    }
    if let Some(radius) = event.radius_meters {
        println!("  Within {:.0} m", radius);
    }
}
