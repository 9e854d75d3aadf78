//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// VoiceMemo - record and replay short voice notes
#[derive(Parser, Debug)]
#[command(name = "voice-memo")]
#[command(version)]
#[command(about = "Record voice memos from the microphone and play them back")]
#[command(long_about = None)]
pub struct Cli {
    /// Recordings directory (overrides config)
    #[arg(long, global = true, value_name = "DIR", env = "VOICE_MEMO_DIR")]
    pub storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a memo until Ctrl+C or the time limit
    Record {
        /// Stop automatically after this long (e.g., 30s, 1m, 2m30s)
        #[arg(short = 'd', long, value_name = "TIME")]
        duration: Option<String>,
    },
    /// Play a recording (the most recent one by default)
    Play {
        /// File name as shown by `list`
        name: Option<String>,
    },
    /// List recordings, oldest first
    List,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "storage_dir",
    "file_stem",
    "naming",
    "max_duration",
    "log_level",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record() {
        let cli = Cli::parse_from(["voice-memo", "record"]);
        assert!(matches!(cli.command, Commands::Record { duration: None }));
    }

    #[test]
    fn cli_parses_record_duration() {
        let cli = Cli::parse_from(["voice-memo", "record", "-d", "30s"]);
        match cli.command {
            Commands::Record { duration } => assert_eq!(duration.as_deref(), Some("30s")),
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn cli_parses_play_name() {
        let cli = Cli::parse_from(["voice-memo", "play", "input-1.wav"]);
        match cli.command {
            Commands::Play { name } => assert_eq!(name.as_deref(), Some("input-1.wav")),
            other => panic!("Expected Play, got {:?}", other),
        }
    }

    #[test]
    fn cli_parses_play_latest() {
        let cli = Cli::parse_from(["voice-memo", "play"]);
        assert!(matches!(cli.command, Commands::Play { name: None }));
    }

    #[test]
    fn storage_dir_is_global() {
        let cli = Cli::parse_from(["voice-memo", "list", "--storage-dir", "/tmp/memos"]);
        assert_eq!(cli.storage_dir, Some(PathBuf::from("/tmp/memos")));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn cli_requires_a_command() {
        assert!(Cli::try_parse_from(["voice-memo"]).is_err());
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voice-memo", "config", "set", "naming", "overwrite"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "naming");
            assert_eq!(value, "overwrite");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("storage_dir"));
        assert!(is_valid_config_key("max_duration"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
