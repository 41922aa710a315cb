//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Search, browse and download manga chapters from several sources.
///
/// Selection state (active sources, chosen manga, chapter range) lives in a
/// session file, so commands can be chained across invocations:
/// `search`, then `select`, then `range`, then `download`.
#[derive(Parser, Debug)]
#[command(name = "manga-fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (default: $XDG_CONFIG_HOME/manga-fetcher/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Session file (default: $XDG_STATE_HOME/manga-fetcher/session.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub session_file: Option<PathBuf>,

    /// Download root directory (default: ./downloads)
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List sources and which are active
    Sources,

    /// Turn a source on or off for searches
    Toggle {
        /// Source name (e.g. kisslove)
        source: String,
    },

    /// Search the active sources
    Search(SearchArgs),

    /// Show details and chapters of a manga
    Info(InfoArgs),

    /// List recently updated manga on kisslove
    Latest {
        /// Listing page (1-based)
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Items per page
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: Option<u32>,
    },

    /// List today's trending manga on kisslove
    Trending,

    /// Make a manga the active selection
    Select(SelectArgs),

    /// Inspect or change the chapter range of the active manga
    Range {
        #[command(subcommand)]
        action: RangeAction,
    },

    /// Download the selected chapter range
    Download(DownloadArgs),

    /// Show or set the theme name
    Theme {
        /// New theme name; prints the current theme when omitted
        name: Option<String>,
    },

    /// Print the persisted session as JSON
    Session,
}

/// Arguments for `search`.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    /// Search terms
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Result page (1-based)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

/// Arguments for `info`.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct InfoArgs {
    /// Source the manga belongs to
    #[arg(short, long)]
    pub source: String,

    /// Manga slug on that source
    pub slug: String,
}

/// Arguments for `select`.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct SelectArgs {
    /// Source the manga belongs to
    #[arg(short, long)]
    pub source: String,

    /// Manga slug on that source
    pub slug: String,

    /// Display title; fetched from the source when omitted
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Range subcommands; positions are 1-based.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RangeAction {
    /// Set the first chapter of the range
    Start {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
    },
    /// Set the last chapter of the range
    End {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
    },
    /// Click a chapter: sets start, then end, then starts over
    Click {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
    },
    /// Select all chapters again
    Clear,
    /// List chapters with range and download markers
    Show,
}

/// Arguments for `download`.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct DownloadArgs {
    /// Manga slug to select first; the active selection is used when omitted
    #[arg(requires = "source")]
    pub slug: Option<String>,

    /// Source of `slug`
    #[arg(short, long, requires = "slug")]
    pub source: Option<String>,

    /// Display title for `slug`; fetched from the source when omitted
    #[arg(short, long, requires = "slug")]
    pub title: Option<String>,

    /// Range start to apply before downloading
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub start: Option<u64>,

    /// Range end to apply before downloading
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub end: Option<u64>,

    /// Package each finished chapter as CBZ
    #[arg(long)]
    pub cbz: bool,
}
