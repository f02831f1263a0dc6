//! Tunnels: Supply Run. Collect every supply, then reach the hatch before the
//! guards find you.
mod components;
mod config;
mod game;
mod guard;
mod input;
mod level;
mod placement;
mod player;
mod render;
mod scheduler;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;
use game::{MoveResult, Session};
use input::{Command, InputAdapter};
use level::Map;
use render::Renderer;
use scheduler::{Scheduler, TimerChange};

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    let _log_guard = setup_logging(&config)?;

    let map = Map::tunnels().context("building the tunnels map")?;
    for pos in map.carved() {
        info!(x = pos.x, y = pos.y, "exit corridor carved");
    }

    let mut stdout = io::stdout();
    if let Err(err) = mount(&mut stdout) {
        let _ = unmount(&mut stdout);
        return Err(err).context("preparing the terminal");
    }
    let result = run(&mut stdout, &config, map);
    unmount(&mut stdout)?;
    result
}

fn mount(stdout: &mut Stdout) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    stdout.execute(Hide)?;
    Ok(())
}

fn unmount(stdout: &mut Stdout) -> io::Result<()> {
    stdout.execute(Show)?;
    stdout.execute(DisableMouseCapture)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    Ok(())
}

fn run(stdout: &mut Stdout, config: &Config, map: Map) -> Result<()> {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut session = Session::new(map, rng);
    let mut renderer = Renderer::new(session.map().width(), session.map().height());
    let mut input = InputAdapter::new(config.pad_visible());
    let mut scheduler = Scheduler::new();
    let frame_time = Duration::from_micros(1_000_000 / config.render_fps.max(1));

    info!(
        seed = ?config.seed,
        pad = input.pad().is_visible(),
        "game mounted"
    );
    sync_timer(&mut scheduler, &session);

    let mut painted: Option<u64> = None;
    let mut dirty = true;
    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Resize(_, _) => {
                    renderer.invalidate();
                    dirty = true;
                }
                event => {
                    if let Some(command) = input.translate(&event, renderer.pad_origin()) {
                        scheduler.push(command);
                    }
                }
            }
        }

        while let Some(command) = scheduler.pop() {
            match command {
                Command::Quit => {
                    scheduler.shutdown();
                    info!(
                        collected = session.collected(),
                        steps = session.steps(),
                        "game unmounted"
                    );
                    return Ok(());
                }
                Command::Reset => session.reset(),
                Command::TogglePad => {
                    input.toggle_pad();
                    dirty = true;
                }
                Command::Move(dir) => {
                    if let MoveResult::Moved { picked_up: true } = session.try_move(dir) {
                        debug!(collected = session.collected(), "supply picked up");
                    }
                }
            }
            sync_timer(&mut scheduler, &session);
        }

        if scheduler.guard_due(Instant::now()) {
            session.tick_guards();
            sync_timer(&mut scheduler, &session);
        }

        if dirty || painted != Some(session.revision()) {
            renderer.render(stdout, &session, input.pad().is_visible())?;
            painted = Some(session.revision());
            dirty = false;
        }

        let mut idle = frame_time.saturating_sub(frame_start.elapsed());
        if let Some(deadline) = scheduler.next_deadline() {
            idle = idle.min(deadline.saturating_duration_since(Instant::now()));
        }
        if !idle.is_zero() {
            thread::sleep(idle);
        }
    }
}

fn sync_timer<R: Rng>(scheduler: &mut Scheduler, session: &Session<R>) {
    let interval = session.guard_interval();
    let change = scheduler.sync(!session.outcome().is_terminal(), interval, Instant::now());
    if change == TimerChange::Restarted {
        info!(
            interval_ms = interval.as_millis() as u64,
            steps = session.steps(),
            "guards changed pace"
        );
    }
}

/// Log to a file only; the terminal belongs to the game.
fn setup_logging(config: &Config) -> Result<WorkerGuard> {
    let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "tunnels.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    info!("Log file: {}/tunnels.log", log_dir.display());
    Ok(guard)
}

/// Platform cache directory for logs.
fn get_log_directory() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Caches")
                .join("tunnels")
                .join("logs");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg_cache) = std::env::var_os("XDG_CACHE_HOME") {
            return PathBuf::from(xdg_cache).join("tunnels").join("logs");
        } else if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".cache").join("tunnels").join("logs");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(local_appdata) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local_appdata).join("tunnels").join("logs");
        }
    }

    std::env::temp_dir().join("tunnels").join("logs")
}
