use clap::Parser;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockbrief_core::domain::SessionState;
use stockbrief_core::{SelectionHandler, StockError};

mod render;

#[derive(Debug, Parser)]
#[command(name = "stockbrief", about = "Stock Analysis Application")]
struct Args {
    /// Ticker symbol, e.g. AAPL. Without it an interactive prompt starts.
    #[arg(long)]
    ticker: Option<String>,

    /// One of 1d, 5d, 1mo, 6mo, 1y.
    #[arg(long, default_value = "1mo")]
    time_frame: String,

    /// Most recent history rows to print.
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = stockbrief_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let handler = SelectionHandler::from_settings(&settings)?;
    let mut state = SessionState::new();

    match args.ticker.as_deref() {
        Some(ticker) => {
            let outcome = handler
                .handle_selection(&mut state, ticker, &args.time_frame)
                .await;
            println!("{}", render::render_state(&state, args.rows));
            if let Err(err) = outcome {
                report(&err);
                return Ok(ExitCode::FAILURE);
            }
        }
        None => interactive(&handler, &mut state, args.rows).await?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn interactive(
    handler: &SelectionHandler,
    state: &mut SessionState,
    rows: usize,
) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(render::help().as_bytes()).await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => stdout.write_all(render::help().as_bytes()).await?,
            Command::Show => {
                stdout
                    .write_all(render::render_state(state, rows).as_bytes())
                    .await?
            }
            Command::Select { ticker, time_frame } => {
                if let Err(err) = handler.handle_selection(state, &ticker, &time_frame).await {
                    report(&err);
                }
                let out = format!("{}\n", render::render_state(state, rows));
                stdout.write_all(out.as_bytes()).await?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Quit,
    Help,
    Show,
    Select { ticker: String, time_frame: String },
}

// Missing parts are passed through empty so the handler reports them.
fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let first = parts.next().unwrap_or_default();
    match first.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        "show" => Command::Show,
        _ => Command::Select {
            ticker: first.to_string(),
            time_frame: parts.next().unwrap_or_default().to_string(),
        },
    }
}

fn report(err: &StockError) {
    if matches!(err, StockError::Upstream { .. }) {
        sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
    }
    tracing::warn!(kind = err.kind(), error = %err, "selection failed");
}

fn init_sentry(settings: &stockbrief_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
