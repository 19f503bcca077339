mod app;
mod client;
mod config;
mod feedback;
mod paste;
mod theme;
mod ui;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyCode, KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::{App, Popup};
use client::PredictClient;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "resumatch")]
#[command(version)]
#[command(about = "Drop a resume, get the predicted role, match score and AI feedback")]
struct Args {
    /// Analyze a file without the TUI and print the result as JSON
    #[arg(short, long, value_name = "FILE")]
    analyze: Option<PathBuf>,

    /// With --analyze: print the formatted feedback markup instead of JSON
    #[arg(long, requires = "analyze")]
    html: bool,

    /// Prediction server base URL (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TUI owns the terminal, so it logs to a file
    let _guard = init_logging(args.analyze.is_none());

    let config = AppConfig::load().unwrap_or_default();

    // --server only affects this run; the loaded config is what gets saved
    let mut effective = config.clone();
    if let Some(server) = args.server {
        effective.server_url = server;
    }
    let client = PredictClient::from_config(&effective);

    // Handle CLI-only commands
    if let Some(path) = args.analyze {
        return analyze_once(&client, &path, args.html).await;
    }

    let config_path = AppConfig::config_path().ok();
    run_tui(App::new(config, config_path, client)).await
}

fn init_logging(to_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !to_file {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        return None;
    }

    let log_dir = AppConfig::log_dir();
    // Without a writable log file the TUI runs unlogged rather than aborting
    let (non_blocking, guard, open_error) = match open_log_file(&log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (writer, guard, None)
        }
        Err(e) => {
            let (writer, guard) = tracing_appender::non_blocking(io::sink());
            (writer, guard, Some(e))
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(filter)
        .init();

    if let Some(e) = open_error {
        eprintln!("resumatch: logging disabled: {:#}", e);
    }
    Some(guard)
}

fn open_log_file(log_dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("resumatch")
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))
}

async fn analyze_once(client: &PredictClient, path: &Path, html: bool) -> Result<()> {
    tracing::info!("Analyzing {}", path.display());

    match client.predict(path).await {
        Ok(result) => {
            if html {
                println!("{}", feedback::format_feedback(&result.ai_feedback));
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Ok(())
        }
        Err(e) => {
            let output = serde_json::json!({ "error": e.to_string() });
            println!("{}", serde_json::to_string(&output)?);
            if e.is_transport() {
                tracing::error!("Analysis failed: {}", e);
            }
            std::process::exit(1);
        }
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    tracing::info!("Starting TUI against {}", app.server_url());

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
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

        // Poll without blocking the runtime so the upload task keeps running
        let ready = tokio::task::block_in_place(|| event::poll(std::time::Duration::from_millis(100)))
            .context("Failed to poll terminal events")?;

        if ready {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => {
                        // Handle key and catch any errors to prevent crashes
                        if let Err(e) = app.handle_key(key) {
                            tracing::error!("Key handling failed: {}", e);
                            app.set_status(format!("Error: {}", e));
                        }
                    }
                },
                Event::Paste(text) => app.handle_paste(&text),
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    let area = Rect::new(0, 0, size.width, size.height);
                    app.handle_mouse(mouse, ui::drop_zone_area(area));
                }
                _ => {}
            }
        }

        // Drain finished requests, expire status messages
        app.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        assert!(open_log_file(&log_dir).is_ok());
        assert!(log_dir.join("resumatch.log").exists());
    }

    #[test]
    fn test_open_log_file_reports_unusable_directory() {
        // A regular file where the log directory should be
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = open_log_file(&blocker.join("resumatch")).unwrap_err();
        assert!(err.to_string().contains("Failed to create log directory"));
    }
}
