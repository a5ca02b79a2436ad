mod cli;

use clap::Parser;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use keentrack_core::{DeviceEvent, Tracker};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), cli::DaemonError> {
    let config = cli.tracker_config()?;
    info!(url = %config.url, interval_secs = config.poll_interval_secs, "starting keentrackd");

    let tracker = Tracker::new(config)?;
    let mut events = tracker.events();
    tracker.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(DeviceEvent::Added(device)) => {
                    info!(mac = %device.mac, name = %device.name, ip = %device.ip, "device discovered");
                }
                Ok(DeviceEvent::Connected(mac)) => info!(%mac, "device connected"),
                Ok(DeviceEvent::Disconnected(mac)) => info!(%mac, "device disconnected"),
                Ok(DeviceEvent::PropertyChanged { mac, property, value }) => {
                    trace!(%mac, %property, %value, "property updated");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    tracker.stop().await;
    Ok(())
}
