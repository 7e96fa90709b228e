mod app;
mod ui;

use anyhow::{bail, Result};
use app::{poll_event, App, AppAction};
use clap::Parser;
use crossterm::event::Event;
use pathspeed::cli::Args;
use pathspeed::settings::TestConfiguration;
use pathspeed::speedtest::{HttpTransport, SpeedTest, TestPhase};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ui::draw_ui;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let transport = HttpTransport::new(args.endpoints())?;
    let config = args.test_configuration();

    if args.headless {
        init_tracing_stderr();
        return run_headless(transport, config, args.json).await;
    }

    if let Some(path) = args.log_file.as_deref() {
        init_tracing_file(path)?;
    }

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let result = run_app(&mut terminal, App::new(transport, config)).await;

    ratatui::restore();
    result
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

// The terminal UI owns stdout/stderr, so logs only go to a file.
fn init_tracing_file(path: &Path) -> Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

async fn run_headless(transport: HttpTransport, config: TestConfiguration, json: bool) -> Result<()> {
    tracing::info!(server = %transport.endpoints().probe_url, "starting speed test");
    let speedtest = SpeedTest::new(transport, config);
    let mut snapshots = speedtest.subscribe();

    let printer = tokio::spawn(async move {
        let mut last = TestPhase::Idle;
        while snapshots.changed().await.is_ok() {
            let phase = snapshots.borrow_and_update().phase();
            if phase != last {
                match phase {
                    TestPhase::Ping => println!("measuring latency..."),
                    TestPhase::Download => println!("testing download..."),
                    TestPhase::Upload => println!("testing upload..."),
                    TestPhase::Idle | TestPhase::Complete | TestPhase::Failed => {}
                }
                last = phase;
            }
        }
    });

    let snapshot = speedtest.run_test().await?;
    printer.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("ping:     {}", snapshot.ping);
        println!("jitter:   {}", snapshot.jitter);
        println!("download: {}", snapshot.download_speed);
        println!("upload:   {}", snapshot.upload_speed);
    }

    if snapshot.is_error {
        bail!("speed test failed");
    }
    Ok(())
}

async fn run_app(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        app.poll_snapshot();
        terminal.draw(|frame| draw_ui(frame, &app))?;

        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(30))? {
            if let Some(action) = app.handle_key_event(key) {
                match action {
                    AppAction::Quit => break,
                    AppAction::StartTest => app.start_test(),
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
