use clap::{Parser, Subcommand};
use dialoguer::Input;
use log::{debug, error, info, warn};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sonycontrol::config::{
    http_timeout, load_config, pairing_store_path, player_entries, single_player_config, SonyPlatformConfig,
};
use sonycontrol::constants::{DEFAULT_CONFIG_FILE, PIN_REQUEST};
use sonycontrol::data::PlayerCommand;
use sonycontrol::helpers::{ConsoleConfigurator, PairingStore};
use sonycontrol::logging;
use sonycontrol::players::sony::{BraviaDeviceFactory, PairingManager, PinOutcome, Resolution, SonyMediaPlayer};
use sonycontrol::players::{player_config_from_json, PlayerController, PlayerCreationError};

/// Control a Sony television from the command line
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Television hostname or IP address, overrides the configuration file
    #[clap(short = 'H', long)]
    host: Option<String>,

    /// Display name used together with --host
    #[clap(short, long)]
    name: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Enable debug logging for sonycontrol only
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair with the television, prompting for the PIN if needed
    Pair,

    /// Show the current state
    Status,

    /// Poll the television and print state changes until Ctrl+C
    Watch {
        /// Poll interval in seconds
        #[clap(short, long, default_value_t = 10)]
        interval: u64,
    },

    /// Turn the television on
    On,

    /// Turn the television off
    Off,

    /// Start playback
    Play,

    /// Pause playback
    Pause,

    /// Toggle between play and pause
    Toggle,

    /// Skip to the next item
    Next,

    /// Go back to the previous item
    Previous,

    /// Stop playback
    Stop,

    /// Remove the stored pairing of the television
    Forget,
}

impl Commands {
    fn player_command(&self) -> Option<PlayerCommand> {
        match self {
            Commands::On => Some(PlayerCommand::TurnOn),
            Commands::Off => Some(PlayerCommand::TurnOff),
            Commands::Play => Some(PlayerCommand::Play),
            Commands::Pause => Some(PlayerCommand::Pause),
            Commands::Toggle => Some(PlayerCommand::PlayPause),
            Commands::Next => Some(PlayerCommand::Next),
            Commands::Previous => Some(PlayerCommand::Previous),
            Commands::Stop => Some(PlayerCommand::Stop),
            Commands::Pair | Commands::Status | Commands::Watch { .. } | Commands::Forget => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // --host works without a configuration file
    let (config, base_dir) = match &cli.host {
        Some(host) => (single_player_config(host, cli.name.as_deref()), PathBuf::from(".")),
        None => {
            let path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            let config = load_config(&path)?;
            let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            (config, base_dir)
        }
    };

    logging::initialize_logging(&config, cli.debug, cli.verbose)?;
    info!("sonycontrol {} starting", env!("CARGO_PKG_VERSION"));

    let platform = first_player(&config)?;
    let store = PairingStore::new(pairing_store_path(&config, &base_dir));

    if let Commands::Forget = cli.command {
        if store.remove(&platform.host)? {
            println!("Removed pairing of {}", platform.host);
        } else {
            println!("{} is not paired", platform.host);
        }
        return Ok(());
    }

    let manager = PairingManager::new(
        Arc::new(BraviaDeviceFactory::new(http_timeout(&config))),
        Arc::new(ConsoleConfigurator::new()),
        store,
    );

    let player = match manager.resolve_device(&platform.host, &platform.name)? {
        Resolution::Ready(player) => player,
        Resolution::Pending(request_id) => {
            debug!("Waiting for PIN on request {}", request_id);
            pair_interactively(&manager, &platform.host)?
        }
    };

    match &cli.command {
        Commands::Pair => println!("{} ({}) is paired", player.get_display_name(), player.host()),
        Commands::Status => print_status(&player),
        Commands::Watch { interval } => watch(&player, Duration::from_secs((*interval).max(1)))?,
        command => {
            if let Some(player_command) = command.player_command() {
                player.send_command(player_command)?;
                println!("{}: {}", player.get_display_name(), player_command);
            }
        }
    }
    Ok(())
}

/// First usable player of the configuration
fn first_player(config: &serde_json::Value) -> Result<SonyPlatformConfig, Box<dyn Error>> {
    for entry in player_entries(config) {
        match player_config_from_json(&entry) {
            Ok(platform) => return Ok(platform),
            Err(PlayerCreationError::Disabled(name)) => debug!("Skipping player {}", name),
            Err(e) => warn!("Ignoring player entry {}: {}", entry, e),
        }
    }
    Err("No Sony player configured. Add one to the configuration or use --host.".into())
}

/// Read PINs from the terminal until the television is paired
fn pair_interactively(manager: &PairingManager, host: &str) -> Result<Box<SonyMediaPlayer>, Box<dyn Error>> {
    loop {
        let pin: String = Input::new()
            .with_prompt("PIN")
            .default(PIN_REQUEST.to_string())
            .allow_empty(true)
            .interact_text()?;

        match manager.submit_pin(host, Some(pin.trim()))? {
            PinOutcome::Paired(player) => return Ok(player),
            PinOutcome::PinNeeded => println!("The television now shows a PIN, please enter it."),
            PinOutcome::Rejected => match manager.session(host) {
                Some(session) => println!(
                    "Pairing failed ({}) after {} attempt(s), please try again.",
                    session.last_error.unwrap_or_default(),
                    session.attempt_count
                ),
                None => println!("Pairing failed, please try again."),
            },
        }
    }
}

fn print_status(player: &SonyMediaPlayer) {
    let capabilities = player.get_capabilities();
    println!("Name:         {}", player.get_display_name());
    println!("Host:         {}", player.host());
    println!("State:        {}", player.get_lifecycle_state());
    println!("Capabilities: {} ({})", capabilities, capabilities.bits());
    if let Some(last_seen) = player.get_last_seen() {
        let when: chrono::DateTime<chrono::Local> = last_seen.into();
        println!("Last seen:    {}", when.format("%Y-%m-%d %H:%M:%S"));
    }
}

fn watch(player: &SonyMediaPlayer, interval: Duration) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    println!("Watching {} every {}s, press Ctrl+C to stop", player.get_display_name(), interval.as_secs());
    let mut last_state = None;
    while running.load(Ordering::SeqCst) {
        player.refresh();
        let state = player.get_lifecycle_state();
        if last_state != Some(state) {
            println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), state);
            last_state = Some(state);
        }

        // sleep in small steps so Ctrl+C is handled quickly
        let mut slept = Duration::ZERO;
        while slept < interval && running.load(Ordering::SeqCst) {
            let step = Duration::from_millis(200);
            thread::sleep(step);
            slept += step;
        }
    }
    info!("Stopped watching {}", player.host());
    Ok(())
}
