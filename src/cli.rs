//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和子命令
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "partix")]
#[command(version)]
#[command(about = "Realm-scoped identity store: groups, roles, users and permission grants")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub(crate) config: PathBuf,
}

pub(crate) const DEFAULT_CONFIG_FILE: &str = "partix.toml";

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to partix.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },

    /// List the realms held by the store
    Realms,

    /// Print the groups, roles, users and permissions of one realm
    Dump {
        /// Realm name
        #[arg(short, long)]
        realm: String,
    },

    /// Load the reference realm "AMS" into the store
    Seed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dump_with_custom_config() {
        let cli = Cli::parse_from(["partix", "dump", "--realm", "AMS", "-c", "/tmp/p.toml"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/p.toml"));
        assert!(matches!(cli.command, Commands::Dump { ref realm } if realm == "AMS"));
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["partix", "realms"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(matches!(cli.command, Commands::Realms));
    }

    #[test]
    fn test_dump_requires_realm() {
        assert!(Cli::try_parse_from(["partix", "dump"]).is_err());
    }
}
