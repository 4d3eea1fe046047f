// Input Filter CLI
// Takes over a keyboard node and captures head unit control keys

use anyhow::{bail, Context, Result};
use clap::Parser;
use filter_core::{
    list_input_devices, ControlSignal, FilterEngine, InterceptMode, ModeController, Settings,
    ShutdownToken,
};
use std::path::PathBuf;

/// Keyboard input filter for head unit controls
#[derive(Parser, Debug)]
#[command(name = "input-filter")]
#[command(author = "input-filter contributors")]
#[command(version)]
#[command(about = "Replaces a keyboard node with a filtering virtual keyboard", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/input-filter/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// List available input devices
    #[arg(long)]
    list_devices: bool,

    /// Source device to take over, overriding [device].source
    #[arg(short, long, value_name = "DEVICE")]
    source: Option<PathBuf>,

    /// Start with interception enabled
    #[arg(short, long)]
    enabled: bool,
}

impl Args {
    fn load_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::load_default().context("Failed to load default settings")?,
        };

        if let Some(source) = &self.source {
            settings.device.source = source.clone();
        }
        if self.enabled {
            settings.capture.start_enabled = true;
        }
        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

fn list_devices() {
    let devices = list_input_devices();
    println!("Found {} input device(s):", devices.len());
    for device in &devices {
        let kind = if device.has_keys { " [keys]" } else { "" };
        match &device.path {
            Some(path) => println!("  {}: {} ({}){}", device.index, device.name, path, kind),
            None => println!("  {}: {}{}", device.index, device.name, kind),
        }
    }
}

fn check_config(settings: &Settings) -> Result<()> {
    settings.validate()?;
    let keys = settings.captured_keys()?;
    println!("Configuration is valid");
    println!("  source: {}", settings.device.source.display());
    println!("  locator: {:?}", settings.device.locator);
    println!(
        "  captured: {}",
        keys.controls().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

/// Route control signals to the mode cell and shutdown token
fn spawn_signal_thread(controller: ModeController) -> Result<()> {
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new(ControlSignal::RAW).context("Failed to register signal handlers")?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for raw in &mut signals {
                if let Some(signal) = ControlSignal::from_raw(raw) {
                    controller.handle(signal);
                    if signal == ControlSignal::Terminate {
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn run(settings: &Settings) -> Result<()> {
    let mode = InterceptMode::new(settings.capture.start_enabled);
    let shutdown = ShutdownToken::new();
    spawn_signal_thread(ModeController::new(mode.clone(), shutdown.clone()))?;

    let gate = settings.gate();
    let notifier = settings.notifier().context("Failed to set up notifications")?;
    let engine = FilterEngine::start(settings, gate.as_ref(), notifier, mode)?;

    log::info!("input-filter running; SIGUSR1 enables, SIGUSR2 disables interception");
    engine.run(&shutdown)?;
    log::info!("input-filter stopped");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Handle list-devices flag (doesn't need settings)
    if args.list_devices {
        list_devices();
        return Ok(());
    }

    let settings = args.load_settings()?;

    if args.check_config {
        return check_config(&settings);
    }

    if settings.device.source.as_os_str().is_empty() {
        bail!("No source device configured");
    }

    run(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["input-filter", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
        assert!(!args.enabled);
        assert!(args.source.is_none());
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "input-filter",
            "--verbose",
            "--enabled",
            "--source",
            "/dev/input/event4",
        ]);

        assert!(args.verbose);
        assert!(args.enabled);
        assert_eq!(args.source, Some(PathBuf::from("/dev/input/event4")));
    }

    #[test]
    fn test_args_list_devices() {
        let args = Args::parse_from(["input-filter", "--list-devices"]);
        assert!(args.list_devices);
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let path = std::env::temp_dir().join(format!("input-filter-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "[device]\nsource = \"/dev/input/event2\"\n").unwrap();

        let config = path.to_string_lossy().into_owned();
        let args = Args::parse_from([
            "input-filter",
            "--config",
            config.as_str(),
            "--source",
            "/dev/input/event9",
            "--enabled",
        ]);
        let settings = args.load_settings().unwrap();
        assert_eq!(settings.device.source, PathBuf::from("/dev/input/event9"));
        assert!(settings.capture.start_enabled);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["input-filter", "--config", "/nonexistent/input-filter.toml"]);
        assert!(args.load_settings().is_err());
    }

    #[test]
    fn test_check_config_accepts_defaults() {
        assert!(check_config(&Settings::new()).is_ok());
    }
}
