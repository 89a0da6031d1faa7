//! Binary entry point: argument dispatch, hardware bring-up, thread
//! lifecycle.
//!
//! Startup order matters: signal wiring first so an early Ctrl-C is not
//! lost, then configuration, then the GPIO session — any hardware failure
//! here is fatal and exits non-zero before either loop starts. Each GPIO
//! line is moved into exactly one worker thread; the main thread only joins.

use std::sync::Arc;

use anyhow::{Context, Result};

use temphum_clock::args::{self, CliAction, ParsedArgs};
use temphum_clock::cancel::CancelToken;
use temphum_clock::config::{AppConfig, PinConfig};
use temphum_clock::core::{run_display_loop, run_sensor_loop};
use temphum_clock::display::Tm1637;
use temphum_clock::gpio::sysfs::GpioSession;
use temphum_clock::light::LightSensor;
use temphum_clock::logger::{Log, LogSink, MacroSink};
use temphum_clock::sensor::DhtSensor;
use temphum_clock::signals::setup_signal_handler;
use temphum_clock::store::ReadingCell;
use temphum_clock::{log_block_start, log_end, log_version, log_warning};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(1);
        }
        CliAction::Run { config } => run(config),
    }
}

fn run(config: AppConfig) -> Result<()> {
    Log::set_min_severity(config.min_severity);
    log_version!();

    if !config.any_mode_enabled() {
        log_warning!("All readouts are disabled, nothing to do. Exiting");
        log_end!();
        return Ok(());
    }

    let token = CancelToken::new();
    setup_signal_handler(token.clone())?;

    let pins = PinConfig::load(&config.pin_config_path);
    pins.log_pins();

    // The shared hardware session; failure here is fatal before any loop
    // starts.
    let session = GpioSession::open().context("failed to initialize GPIO")?;
    let sensor_line = session
        .line(pins.sensor)
        .context("failed to claim the sensor line")?;
    let display_dio = session
        .line(pins.display_dio)
        .context("failed to claim the display data line")?;
    let display_clk = session
        .line(pins.display_clk)
        .context("failed to claim the display clock line")?;
    let light_line = session
        .line(pins.light_sensor)
        .context("failed to claim the light sensor line")?;

    let sink: Arc<dyn LogSink> = Arc::new(MacroSink);
    let store = Arc::new(ReadingCell::new());

    let sensor = DhtSensor::new(sensor_line, Arc::clone(&sink));
    let display = Tm1637::new(display_dio, display_clk, Arc::clone(&sink))
        .context("failed to initialize the display lines")?;
    let light = LightSensor::new(light_line, Arc::clone(&sink));

    log_block_start!("Starting sensor and display loops...");

    let sensor_thread = std::thread::Builder::new()
        .name("sensor".into())
        .spawn({
            let store = Arc::clone(&store);
            let token = token.clone();
            let sink = Arc::clone(&sink);
            move || run_sensor_loop(sensor, store, token, sink)
        })
        .context("failed to spawn sensor thread")?;

    let display_thread = std::thread::Builder::new()
        .name("display".into())
        .spawn({
            let token = token.clone();
            move || run_display_loop(display, light, store, config, token, sink)
        })
        .context("failed to spawn display thread")?;

    // Both loops run until the token fires; the lines unexport themselves
    // when the threads drop them.
    let _ = sensor_thread.join();
    let _ = display_thread.join();
    drop(session);

    log_block_start!("Graceful shutdown complete");
    log_end!();
    Ok(())
}
