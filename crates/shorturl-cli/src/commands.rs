//! Commands accepted at the interactive prompt.

use clap::{Parser, Subcommand};

/// One line typed at the prompt
#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Shorten a URL (asks you to log in first if needed)
    Shorten { url: String },

    /// Create a link from the form; uses the pre-filled URL when none is given
    Create {
        url: Option<String>,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Expiry date, e.g. 2025-12-31
        #[arg(long)]
        expires: Option<String>,
    },

    /// Log in
    Login { username: Option<String> },

    /// Create an account
    Register,

    /// Log out
    Logout,

    /// Show the dashboard
    #[command(alias = "dashboard")]
    Stats,

    /// List your links
    #[command(alias = "ls")]
    Links,

    /// Show one link
    Show { id: i64 },

    /// Change a link
    Edit {
        id: i64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        expires: Option<String>,
    },

    /// Delete a link
    #[command(alias = "rm")]
    Delete { id: i64 },

    /// Click analytics for a link
    Analytics {
        id: i64,
        /// Number of recent clicks to list
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Only count clicks from the last N days
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=36500))]
        days: Option<i64>,
    },

    /// Follow a short code through the server redirect
    Open { code: String },

    /// Show the signed-in account
    Whoami,

    /// List accounts (admin)
    Users,

    /// Change an account's role (admin)
    Role { user_id: i64, role: String },

    /// Enable or disable an account (admin)
    Toggle { user_id: i64 },

    /// Show available commands
    Help,

    /// Leave the client
    #[command(alias = "exit")]
    Quit,
}

/// Split and parse a prompt line. Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let words = shlex::split(line).ok_or_else(|| "Unbalanced quotes".to_string())?;
    if words.is_empty() {
        return Ok(None);
    }
    CommandLine::try_parse_from(words)
        .map(|parsed| Some(parsed.command))
        .map_err(|e| e.to_string())
}
