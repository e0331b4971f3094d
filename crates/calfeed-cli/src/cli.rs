//! CLI argument definitions for calfeed.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` | Serve the calendar feed over HTTP |
//! | `render` | Build the feed once and write it to a file or stdout |
//! | `probe` | Check upstream endpoints and print the diagnostics report |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--lookahead-days` | `LOOKAHEAD_DAYS` or `365` | Days after today covered by the feed |
//!
//! Every other setting comes from the environment (`FMP_API_KEY`, `CACHE_TTL`,
//! `INCLUDE_ALL_EARNINGS`, ...), optionally through a `.env` file.
//!
//! # Examples
//!
//! ```bash
//! # Serve on the configured host and port, building the feed up front
//! calfeed serve --warm
//!
//! # Write a one-off calendar with every reported earnings event
//! calfeed render --all --output calendar.ics
//!
//! # Check the API key and upstream reachability
//! calfeed probe --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// US economic and earnings calendar feed.
#[derive(Debug, Parser)]
#[command(
    name = "calfeed",
    author,
    version,
    about = "US economic releases and earnings as one iCalendar feed",
    long_about = "calfeed merges the Financial Modeling Prep economic and earnings calendars \
into a single subscribable .ics feed.\n\
\n\
Use 'calfeed <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Days after today covered by the feed.
    #[arg(long, global = true)]
    pub lookahead_days: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the feed, health and diagnostics endpoints.
    Serve(ServeArgs),
    /// Build the feed once.
    Render(RenderArgs),
    /// Probe upstream endpoints.
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address, overriding `HOST`.
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port, overriding `PORT`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Build the feed before accepting connections.
    #[arg(long, default_value_t = false)]
    pub warm: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Output file; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Include every reported earnings event regardless of universe.
    #[arg(long, default_value_t = false)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Pretty-print the JSON report.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from(["calfeed", "serve", "--port", "8080", "--warm"]);

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.port, Some(8080));
                assert!(args.host.is_none());
                assert!(args.warm);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn lookahead_is_global() {
        let cli = Cli::parse_from(["calfeed", "render", "--all", "--lookahead-days", "30"]);

        assert_eq!(cli.lookahead_days, Some(30));
        assert!(matches!(cli.command, Command::Render(RenderArgs { all: true, .. })));
    }

    #[test]
    fn rejects_negative_port() {
        assert!(Cli::try_parse_from(["calfeed", "serve", "--port", "-1"]).is_err());
    }
}
