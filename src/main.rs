mod cli;
mod error;
mod models;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::warn;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::cli::{Cli, Format, Source};
use crate::utils::host::SnapshotHost;
use crate::utils::locale::Locale;
use crate::utils::popup::{open_popup, render_html, render_json, render_text, PopupState};

#[tokio::main]
async fn main() -> Result<()> {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();

    let cli = Cli::parse();

    // Diagnostics go to the terminal; the checklist itself goes to stdout.
    TermLogger::init(
        cli.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialise logging")?;

    let state = load(&cli.source).await;

    // Unticks the subjects the user left out.
    let mut included = state.inclusion();
    if matches!(state, PopupState::Loaded(_)) {
        for subject in &cli.exclude {
            if !included.uncheck(subject) {
                warn!("No subject named `{}` to exclude", subject);
            }
        }
    }

    let locale = Locale::build();
    let output = match cli.format {
        Format::Text => render_text(&state, &included, locale),
        Format::Html => render_html(&state, &included, locale),
        Format::Json => render_json(&state, &included, locale).context("Failed to serialise grades")?,
    };
    println!("{}", output);

    Ok(())
}

async fn load(source: &Source) -> PopupState {
    match source {
        Source::Snapshot { file, url } => open_popup(&SnapshotHost::new(file, url.clone())).await,
        #[cfg(feature = "chromium")]
        Source::Chromium { endpoint } => {
            match crate::utils::host::ChromiumHost::connect(endpoint).await {
                Ok(host) => open_popup(&host).await,
                Err(e) => {
                    log::error!("Error connecting to {}: {}", endpoint, e);
                    PopupState::Failed(e.to_string())
                }
            }
        }
    }
}
