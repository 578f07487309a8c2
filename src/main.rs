// ============================================================================
// MOODJOURNAL - Mood calendar, statistics and Markdown journal in the terminal
// ============================================================================
//
// MODULE STRUCTURE:
// - settings / telemetry      - Startup configuration and file logging
// - models / loader           - Data shapes and the cached JSON content loader
// - storage / draft           - Key/value persistence and the journal draft
// - debounce / filter         - Timers and the mood filter broadcast
// - calendar / modal          - Month grid, click handling and mood recording
// - statistics                - Monthly mood frequency and advice
// - markdown / editor         - Markdown rendering and the entry form
// - journal / export          - Entry list, search and JSON export
// - app / ui / input          - Event routing, drawing and key translation
// ============================================================================

mod app;
mod calendar;
mod debounce;
mod draft;
mod editor;
mod export;
mod filter;
mod input;
mod journal;
mod loader;
mod markdown;
mod modal;
mod models;
mod settings;
mod statistics;
mod storage;
mod telemetry;
mod ui;

use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use crate::app::{App, Services};
use crate::settings::Settings;

const TICK_RATE: Duration = Duration::from_millis(50);

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
    }
}

fn run() -> Result<()> {
    let settings = Settings::from_env()?;
    settings.ensure_dirs()?;
    let _guard = telemetry::init_subscriber(settings.debug, &settings.log_dir())?;
    info!(data_dir = %settings.data_dir.display(), "starting moodjournal");

    let services = Services::from_settings(&settings).context("Failed to set up storage")?;
    let mut app = App::new(services, Local::now().date_naive(), Instant::now());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        event::DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(e) = &res {
        error!(error = format!("{e:#}"), "event loop failed");
    }
    info!("moodjournal stopped");
    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::draw(frame, app, Instant::now()))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, Instant::now());
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse, Instant::now()),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.today = Local::now().date_naive();
            app.tick(Instant::now());
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
