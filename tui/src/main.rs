//! Popup TUI - Entry point
//!
//! # Usage
//!
//! ```bash
//! # Welcome message, default config
//! popup-tui
//!
//! # Every scenario, at 60 frames per second
//! popup-tui --scenario all --fps 60
//!
//! # Custom prompt config
//! popup-tui --config ./popups.toml
//!
//! # Verbose logging (written to the log file, never the screen)
//! RUST_LOG=popup_core=debug popup-tui
//! ```

use std::fs::{self, File};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use popup_core::{default_config_path, load_config_from_path};
use popup_tui::schedule::UpdateCheckSchedule;
use popup_tui::{App, AppOptions, Scenario};

/// Popup TUI - modal prompt queue over a terminal scene
#[derive(Parser, Debug)]
#[command(name = "popup-tui")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompts to queue at startup
    #[arg(short, long, value_enum, default_value_t = Scenario::Welcome)]
    scenario: Scenario,

    /// Target frames per second
    #[arg(long, env = "POPUP_FPS", default_value_t = 30)]
    fps: u32,

    /// Prompt configuration file
    #[arg(short, long, env = "POPUP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Update-check schedule file
    #[arg(long, env = "POPUP_SCHEDULE", value_name = "FILE")]
    schedule: Option<PathBuf>,

    /// Keep update-check choices in memory only
    #[arg(long)]
    no_persist: bool,

    /// Log file
    #[arg(long, env = "POPUP_LOG", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// `$XDG_STATE_HOME/popup-queue/popup-tui.log`, falling back to the data dir
fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_dir)
        .map(|p| p.join("popup-queue").join("popup-tui.log"))
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(path) = path.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = File::create(&path).with_context(|| format!("Failed to create log file: {path:?}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: popup-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  • Running in a non-interactive environment (CI, container)");
        eprintln!("  • SSH without -t flag");
        eprintln!("  • Piped stdin/stdout");
        std::process::exit(1);
    }

    let config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load prompt configuration")?;
    tracing::info!(source = %config.source(), "Configuration loaded");

    let options = AppOptions {
        fps: args.fps,
        scenario: args.scenario,
        schedule_path: if args.no_persist {
            None
        } else {
            args.schedule.clone().or_else(UpdateCheckSchedule::default_path)
        },
    };

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let size = crossterm::terminal::size()?;
    let mut app = App::new(size, config, &options)?;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!(error = %e, "Application error");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
