//! Command-line front end: replay a radiotap capture on a monitor interface.
//!
//! Logs go to stderr; the only line on stdout is the run summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use airreplay::{
    ChannelController, InjectionRetrier, InjectionSink, PcapFileSource, ReplayConfig,
    ReplayScheduler, StagedCapture, interface,
};

#[derive(Parser, Debug)]
#[command(name = "airreplay", version, about = "Replay captured 802.11 frames with their original timing")]
struct Args {
    /// Capture file (pcap with radiotap link type)
    capture: PathBuf,

    /// Monitor-mode interface to inject on
    #[arg(short, long)]
    interface: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Retune the radio to the channel recorded in each frame
    #[arg(long)]
    follow_channel: bool,

    /// Send frames back to back instead of with their capture spacing
    #[arg(long)]
    no_timing: bool,

    /// Give each frame a single attempt
    #[arg(long)]
    no_retry: bool,

    /// Attempts per frame before the run is aborted
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Read the capture in place instead of copying it to the staging directory
    #[arg(long)]
    no_stage: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// File configuration with command-line overrides applied.
    fn config(&self) -> Result<ReplayConfig> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => ReplayConfig::default(),
        };

        if let Some(interface) = &self.interface {
            config.interface = interface.clone();
        }
        if self.follow_channel {
            config.follow_channel = true;
        }
        if self.no_timing {
            config.enforce_timing = false;
        }
        if self.no_retry {
            config.retry_on_short_write = false;
        }
        if self.max_attempts.is_some() {
            config.max_attempts = self.max_attempts;
        }
        if self.no_stage {
            config.stage_capture = false;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(target_os = "linux")]
fn open_sink(interface: &str) -> Result<Box<dyn InjectionSink>> {
    let sink = airreplay::inject::PacketSocketSink::open(interface)
        .with_context(|| format!("opening injection socket on {}", interface))?;
    Ok(Box::new(sink))
}

#[cfg(not(target_os = "linux"))]
fn open_sink(interface: &str) -> Result<Box<dyn InjectionSink>> {
    anyhow::bail!("cannot inject on {}: raw 802.11 injection needs Linux packet sockets", interface)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.config()?;
    interface::check_interface(&config.interface)
        .with_context(|| format!("checking interface {}", config.interface))?;

    // dropped last, after the source has closed its handle
    let staged = if config.stage_capture {
        Some(StagedCapture::create(&args.capture, &config.staging_dir).context("staging capture")?)
    } else {
        None
    };
    let capture = staged.as_ref().map_or(args.capture.as_path(), |s| s.path());

    let source = PcapFileSource::open(capture)
        .with_context(|| format!("opening capture {}", args.capture.display()))?;
    let sink = open_sink(&config.interface)?;
    let retrier = InjectionRetrier::new(sink, config.retry_policy());

    let mut scheduler = ReplayScheduler::new(source, retrier, config.replay_options());
    if config.follow_channel {
        scheduler = scheduler
            .with_channel_controller(ChannelController::default().with_command(&config.channel_command));
    }

    let cancel = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping replay");
            cancel.cancel();
        }
    });

    info!("Replaying {} on {}", args.capture.display(), config.interface);
    let summary = scheduler.run().await.context("replay aborted")?;
    println!("{}", summary);

    Ok(())
}
