use std::{
    io::{self, Write},
    panic,
    path::PathBuf,
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    style::ResetColor,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{info, warn};
use tuirealm::{
    PollStrategy,
    terminal::{CrosstermTerminalAdapter, TerminalBridge},
};

use reminders_dashboard::{
    app::{App, JobRunner, Message},
    config::Config,
    logging::{init_logging, print_log_location},
    provider::{CommandProvider, ReminderProvider},
    realm::{RootId, apply_message, init_application, should_quit, take_jobs},
    theme::ThemePreset,
};

#[derive(Parser, Debug)]
#[command(
    name = "reminders-dashboard",
    about = "Terminal dashboard for your reminders",
    long_about = "Browse, filter and edit reminders from a `reminders`-compatible command line tool, as a list or as one column per list.",
    version = env!("REMINDERS_DASHBOARD_BUILD_VERSION"),
    author
)]
struct Cli {
    /// Config file to read and save instead of the default location.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,

    /// Theme preset overriding the config (default, light, mono).
    #[arg(long, value_name = "PRESET")]
    theme: Option<String>,
}

static TERMINAL_RESTORED: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match init_logging(cli.debug) {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err:#}");
            None
        }
    };
    if let Some(path) = log_path.as_ref() {
        install_panic_hook_with_log(path.clone());
    }

    let result = run_app(cli);
    if let Some(path) = log_path.as_ref() {
        print_log_location(path);
    }
    result
}

fn run_app(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = Config::load(config_path.as_deref());
    let theme_override = cli.theme.as_deref().and_then(|value| {
        let preset = ThemePreset::from_str(value).ok();
        if preset.is_none() {
            warn!("unknown theme preset '{}'; using config theme", value);
        }
        preset
    });

    let provider: Arc<dyn ReminderProvider> = Arc::new(
        CommandProvider::new(config.provider_command.clone())
            .with_timeout(config.provider_timeout()),
    );
    let (runner, mut results) = JobRunner::new(provider);

    let _guard = TerminalGuard;
    let mut terminal = setup_terminal()?;
    let (width, height) = crossterm::terminal::size().context("failed to read terminal size")?;

    let app = Arc::new(Mutex::new(App::new(
        config,
        config_path,
        theme_override,
        (width, height),
    )));
    let mut realm = init_application(Arc::clone(&app))?;
    info!("dashboard started");

    let mut redraw = true;
    while !should_quit(&app)? {
        for job in take_jobs(&app)? {
            runner.spawn(job);
        }

        if redraw {
            terminal
                .draw(|frame| realm.view(&RootId::Dashboard, frame, frame.area()))
                .context("failed to render frame")?;
            redraw = false;
        }

        let mut messages: Vec<Message> = realm
            .tick(PollStrategy::Once)
            .context("failed to process terminal events")?;
        loop {
            match results.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        if !messages.is_empty() {
            redraw = true;
        }
        for message in messages {
            apply_message(&app, message)?;
        }
    }

    let _ = execute!(io::stdout(), DisableBracketedPaste);
    let _ = terminal.disable_raw_mode();
    let _ = terminal.leave_alternate_screen();
    let _ = terminal.clear_screen();
    TERMINAL_RESTORED.store(true, Ordering::SeqCst);
    info!("dashboard closed");

    Ok(())
}

fn setup_terminal() -> Result<TerminalBridge<CrosstermTerminalAdapter>> {
    TERMINAL_RESTORED.store(false, Ordering::SeqCst);

    let mut terminal =
        TerminalBridge::new_crossterm().context("failed to initialize terminal bridge")?;
    terminal
        .enable_raw_mode()
        .context("failed to enable raw mode")?;
    terminal
        .enter_alternate_screen()
        .context("failed to enter alternate screen")?;
    execute!(io::stdout(), EnableBracketedPaste).context("failed to enable bracketed paste")?;

    Ok(terminal)
}

fn install_panic_hook_with_log(log_path: PathBuf) {
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        eprintln!();
        eprintln!("reminders-dashboard crashed; log file: {}", log_path.display());
        eprintln!();
        previous_hook(panic_info);
    }));
}

fn restore_terminal() -> Result<()> {
    if TERMINAL_RESTORED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let _ = disable_raw_mode();

    let mut stderr = io::stderr();
    let _ = execute!(
        stderr,
        LeaveAlternateScreen,
        DisableBracketedPaste,
        Show,
        ResetColor
    );
    let _ = stderr.flush();

    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore_terminal();
    }
}
