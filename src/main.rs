mod app;
mod config;
mod membership;
mod prefs;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::AppConfig;
use prefs::{FileBackend, MemoryBackend, PreferenceBackend, PreferenceStore, USER_NAME_KEY};

#[derive(Parser, Debug)]
#[command(name = "clubhouse")]
#[command(author = "Sean Fournier")]
#[command(version = "0.1.0")]
#[command(about = "Club news and your membership profile, in the terminal")]
struct Args {
    /// Print the saved member name (empty line if none)
    #[arg(long)]
    show_name: bool,

    /// Save a new member name
    #[arg(long, value_name = "NAME")]
    set_name: Option<String>,

    /// Print the home feed as JSON
    #[arg(long)]
    feed: bool,

    /// Store preferences in this directory instead of the default
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Keep preferences in memory only (nothing is written to disk)
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr keeps the TUI and CLI output clean)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    // Ephemeral runs never write, not even a default config
    let mut config = AppConfig::load(!args.ephemeral).unwrap_or_default();
    if let Some(dir) = args.data_dir.clone() {
        config.data_dir = Some(dir);
    }

    if args.feed {
        return print_feed(&config);
    }

    let store = open_store(&config, args.ephemeral).await?;

    // Handle CLI-only commands
    if args.show_name {
        return show_name(&store).await;
    }

    if let Some(name) = args.set_name {
        return set_name(&store, &config, &name).await;
    }

    // Run TUI
    run_tui(config, store).await
}

async fn open_store(config: &AppConfig, ephemeral: bool) -> Result<PreferenceStore> {
    let backend: Arc<dyn PreferenceBackend> = if ephemeral {
        Arc::new(MemoryBackend::new())
    } else {
        let dir = config.resolve_data_dir()?;
        let backend = FileBackend::open(&dir)
            .await
            .with_context(|| format!("Could not open preference store in {}", dir.display()))?;
        Arc::new(backend)
    };

    tracing::info!("Using preference store: {}", backend.describe());
    Ok(PreferenceStore::new(backend))
}

fn print_feed(config: &AppConfig) -> Result<()> {
    let output = serde_json::json!({
        "club": config.club_name,
        "announcements": config.announcements,
        "events": config.events,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn show_name(store: &PreferenceStore) -> Result<()> {
    let name = store.load(USER_NAME_KEY).await?;
    println!("{}", name);
    Ok(())
}

async fn set_name(store: &PreferenceStore, config: &AppConfig, name: &str) -> Result<()> {
    store.save(USER_NAME_KEY, name).await?;
    println!("Saved member name to {}", store.describe());

    if config.notifications {
        let body = if name.is_empty() {
            "Member name cleared".to_string()
        } else {
            format!("Welcome, {}", name)
        };
        // Not worth failing the save over
        if let Err(e) = notify(&config.club_name, &body) {
            tracing::warn!("Could not show notification: {}", e);
        }
    }
    Ok(())
}

async fn run_tui(config: AppConfig, store: PreferenceStore) -> Result<()> {
    ui::init_theme(theme::Theme::from_overrides(&config.theme));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, store);

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Poll off the runtime threads so storage tasks keep running
        let ready = tokio::task::block_in_place(|| {
            event::poll(std::time::Duration::from_millis(100))
        })?;

        if ready {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.can_quit_with(&key) {
                        return Ok(());
                    }
                    match key.code {
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => app.handle_key(key)?,
                    }
                }
            }
        }

        // Apply finished storage work
        app.tick();
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("avatar-default")
        .show()?;
    Ok(())
}
