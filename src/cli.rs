use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "koobavg", version, about = "Subject and overall grade averages from the Mykoob period grades page")]
pub struct Cli {
    #[command(subcommand)]
    pub source: Source,

    /// How to print the checklist.
    #[arg(long, value_enum, env = "KOOB_FORMAT", default_value_t = Format::Text, global = true)]
    pub format: Format,

    /// Leave a subject out of the overall average (repeatable).
    #[arg(long = "exclude", value_name = "SUBJECT", global = true)]
    pub exclude: Vec<String>,

    /// Diagnostic log level (off, error, warn, info, debug, trace).
    #[arg(long, env = "KOOB_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Subcommand)]
pub enum Source {
    /// Read a grades page saved from the browser.
    Snapshot {
        file: PathBuf,

        /// Address the page was saved from, if the file does not record it.
        #[arg(long, value_parser = parse_url)]
        url: Option<String>,
    },
    /// Read the grades tab of a Chromium started with --remote-debugging-port.
    #[cfg(feature = "chromium")]
    Chromium {
        #[arg(long, env = "KOOB_CDP_ENDPOINT", default_value = "http://127.0.0.1:9222")]
        endpoint: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Html,
    Json,
}

// Validated, but kept verbatim so the page check sees exactly what was given.
fn parse_url(value: &str) -> Result<String, url::ParseError> {
    Url::parse(value).map(|_| value.to_string())
}
