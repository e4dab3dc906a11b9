//! CLI - Command Line Interface for anistream
//!
//! Every action is scriptable and all output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Browse and search
//! anistream search "frieren"
//! anistream top --page 2
//! anistream info frieren-beyond-journeys-end-18542
//!
//! # Resolve and play an episode
//! anistream sources frieren-beyond-journeys-end-18542 -e 1 --server vidcloud
//! anistream play 'frieren-beyond-journeys-end-18542$episode$107257' -Q 1080p
//!
//! # Community
//! anistream suggest "Frieren"
//! anistream comments post 'frieren$episode$1' "that ending" --spoiler
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network or provider error
    NetworkError = 3,
    /// Required service not configured
    NotConfigured = 4,
    /// Server returned no sources
    NoSources = 5,
    /// Player could not be started
    PlayerFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// anistream - anime discovery and episode playback from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "anistream",
    version,
    about = "Anime discovery and episode playback from the terminal",
    long_about = "Browse and search an anime streaming provider, resolve episodes \
                  into playable sources, and hand them to mpv or VLC.\n\n\
                  Every command prints JSON when stdout is not a terminal.",
    after_help = "EXAMPLES:\n\
                  anistream search frieren                 Search the catalogue\n\
                  anistream sources <anime-id> -e 1        Resolve episode 1\n\
                  anistream play <episode-id> -s streamsb  Play from another server\n\
                  anistream servers --json                 List known servers",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search anime by title
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Top airing anime
    Top(PageCmd),

    /// Recently released episodes
    Recent(PageCmd),

    /// Anime details and episode list
    #[command(visible_alias = "i")]
    Info(InfoCmd),

    /// List known streaming servers
    Servers(ServersCmd),

    /// Resolve an episode into a playable source
    #[command(visible_alias = "src")]
    Sources(EpisodeCmd),

    /// Resolve an episode and fetch its HLS manifest
    Probe(EpisodeCmd),

    /// Resolve an episode and play it locally
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Ask for similar anime
    Suggest(SuggestCmd),

    /// Read or write episode comments
    #[command(subcommand)]
    Comments(CommentsCmd),
}

// =============================================================================
// Catalogue Commands
// =============================================================================

/// Search anime by title
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Title or keywords
    #[arg(required = true)]
    pub query: String,

    /// Result page (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Filter by kind (TV, Movie, OVA, ...)
    #[arg(long, short = 't')]
    pub kind: Option<String>,
}

/// Paginated catalogue listing
#[derive(Args, Debug)]
pub struct PageCmd {
    /// Result page (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// Anime details
#[derive(Args, Debug)]
pub struct InfoCmd {
    /// Provider anime id
    #[arg(required = true)]
    pub anime_id: String,

    /// Hide filler episodes
    #[arg(long)]
    pub no_filler: bool,
}

/// List servers
#[derive(Args, Debug)]
pub struct ServersCmd {}

// =============================================================================
// Playback Commands
// =============================================================================

/// Episode selection shared by sources/probe/play
#[derive(Args, Debug)]
pub struct EpisodeCmd {
    /// Episode id, or an anime id when --episode is given
    #[arg(required = true)]
    pub target: String,

    /// Episode number; makes TARGET an anime id
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,

    /// Streaming server (see `anistream servers`)
    #[arg(long, short = 's')]
    pub server: Option<String>,

    /// Explicit quality label (e.g. 1080p); default picks auto
    #[arg(long, short = 'Q')]
    pub quality: Option<String>,
}

/// Play an episode
#[derive(Args, Debug)]
pub struct PlayCmd {
    #[command(flatten)]
    pub episode: EpisodeCmd,

    /// Local player to use
    #[arg(long, value_enum)]
    pub player: Option<PlayerChoice>,

    /// Return once the player starts instead of waiting for it to exit
    #[arg(long)]
    pub detach: bool,
}

/// Local player selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerChoice {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

// =============================================================================
// Community Commands
// =============================================================================

/// Similar anime suggestions
#[derive(Args, Debug)]
pub struct SuggestCmd {
    /// Anime title to find neighbours for
    #[arg(required = true)]
    pub title: String,
}

#[derive(Subcommand, Debug)]
pub enum CommentsCmd {
    /// List comments of an episode
    List(CommentsListCmd),

    /// Post a comment or reply
    Post(CommentsPostCmd),
}

/// List comments
#[derive(Args, Debug)]
pub struct CommentsListCmd {
    /// Episode id
    #[arg(required = true)]
    pub episode_id: String,

    /// Show replies of this comment instead of top-level comments
    #[arg(long)]
    pub replies_to: Option<String>,

    /// Reveal spoiler text
    #[arg(long)]
    pub show_spoilers: bool,
}

/// Post a comment
#[derive(Args, Debug)]
pub struct CommentsPostCmd {
    /// Episode id
    #[arg(required = true)]
    pub episode_id: String,

    /// Comment text
    #[arg(required = true)]
    pub text: String,

    /// Mark as spoiler
    #[arg(long)]
    pub spoiler: bool,

    /// Reply to this comment id
    #[arg(long, short = 'r')]
    pub reply_to: Option<String>,

    /// Author id (overrides [identity] in config)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Author display name
    #[arg(long)]
    pub user_name: Option<String>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a list: JSON envelope, or one display line per item
    pub fn print_list<T: Serialize + std::fmt::Display>(&self, items: &[T]) -> anyhow::Result<()> {
        if self.json {
            return self.print(items);
        }
        for item in items {
            println!("{}", item);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Episode ID Validation
// =============================================================================

/// Validate a provider id (non-empty, no whitespace)
pub fn validate_id(id: &str) -> Result<&str, &'static str> {
    let id = id.trim();
    if id.is_empty() {
        Err("Id must not be empty")
    } else if id.chars().any(char::is_whitespace) {
        Err("Id must not contain whitespace")
    } else {
        Ok(id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_error() {
        assert!(Cli::try_parse_from(["anistream"]).is_err());
    }

    #[test]
    fn test_search_command() {
        let cli = Cli::parse_from(["anistream", "search", "frieren", "-p", "2"]);
        match cli.command {
            Command::Search(cmd) => {
                assert_eq!(cmd.query, "frieren");
                assert_eq!(cmd.page, 2);
                assert_eq!(cmd.limit, 20);
            }
            other => panic!("Expected Search command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["anistream", "--json", "-vv", "--quiet", "servers"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_sources_with_episode_number() {
        let cli = Cli::parse_from([
            "anistream", "sources", "frieren-18542", "-e", "3", "-s", "streamsb", "-Q", "720p",
        ]);
        match cli.command {
            Command::Sources(cmd) => {
                assert_eq!(cmd.target, "frieren-18542");
                assert_eq!(cmd.episode, Some(3));
                assert_eq!(cmd.server.as_deref(), Some("streamsb"));
                assert_eq!(cmd.quality.as_deref(), Some("720p"));
            }
            other => panic!("Expected Sources command, got {:?}", other),
        }
    }

    #[test]
    fn test_play_flattened_episode() {
        let cli = Cli::parse_from(["anistream", "play", "ep-1", "--player", "vlc", "--detach"]);
        match cli.command {
            Command::Play(cmd) => {
                assert_eq!(cmd.episode.target, "ep-1");
                assert_eq!(cmd.player, Some(PlayerChoice::Vlc));
                assert!(cmd.detach);
            }
            other => panic!("Expected Play command, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_post() {
        let cli = Cli::parse_from([
            "anistream", "comments", "post", "ep-1", "nice", "--spoiler", "-r", "c-9",
        ]);
        match cli.command {
            Command::Comments(CommentsCmd::Post(cmd)) => {
                assert!(cmd.spoiler);
                assert_eq!(cmd.reply_to.as_deref(), Some("c-9"));
            }
            other => panic!("Expected comments post, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id(" frieren$episode$1 "), Ok("frieren$episode$1"));
        assert!(validate_id("").is_err());
        assert!(validate_id("two words").is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::NoSources), 5);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
    }
}
