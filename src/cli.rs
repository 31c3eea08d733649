use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{
    CompletionsCommand, ConfigureCommand, PartitionsCommand, PolicyCommand, RotateCommand,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "sts-rotator", version, about = "Rotate AWS STS credentials and console sign-in URLs for managed accounts", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = "default",
        help = "Configuration profile name"
    )]
    pub profile: String,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Rotate credentials for one account")]
    Rotate(RotateCommand),
    #[command(about = "Render an IAM policy document from a role definition")]
    Policy(PolicyCommand),
    #[command(about = "Show partition configuration")]
    Partitions(PartitionsCommand),
    #[command(about = "Configure rotation settings")]
    Configure(ConfigureCommand),
    #[command(about = "Generate shell completion scripts for sts-rotator")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;

        match self.command {
            Commands::Rotate(cmd) => cmd.execute(&profile).await,
            Commands::Policy(cmd) => cmd.execute().await,
            Commands::Partitions(cmd) => cmd.execute(),
            Commands::Configure(cmd) => cmd.execute(&profile).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RotateKind;
    use clap::{CommandFactory, error::ErrorKind};

    #[test]
    fn test_rotate_defaults() {
        let cli = Cli::try_parse_from(["sts-rotator", "rotate", "acct-1"]).unwrap();
        assert_eq!(cli.profile, "default");
        match cli.command {
            Commands::Rotate(cmd) => {
                assert_eq!(cmd.account, "acct-1");
                assert_eq!(cmd.namespace, None);
                assert_eq!(cmd.kind, RotateKind::Due);
            }
            _ => panic!("Expected Rotate command"),
        }
    }

    #[test]
    fn test_rotate_with_kind_and_namespace() {
        let cli = Cli::try_parse_from([
            "sts-rotator",
            "rotate",
            "acct-1",
            "--kind",
            "console",
            "-n",
            "managed",
        ])
        .unwrap();
        match cli.command {
            Commands::Rotate(cmd) => {
                assert_eq!(cmd.kind, RotateKind::Console);
                assert_eq!(cmd.namespace.as_deref(), Some("managed"));
            }
            _ => panic!("Expected Rotate command"),
        }
    }

    #[test]
    fn test_rotate_invalid_kind() {
        let result = Cli::try_parse_from(["sts-rotator", "rotate", "acct-1", "--kind", "both"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rotate_requires_account() {
        let result = Cli::try_parse_from(["sts-rotator", "rotate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_short_flag() {
        let cli = Cli::try_parse_from(["sts-rotator", "-p", "staging", "partitions"]).unwrap();
        assert_eq!(cli.profile, "staging");
    }

    #[test]
    fn test_partitions_optional_argument() {
        let cli = Cli::try_parse_from(["sts-rotator", "partitions", "restricted"]).unwrap();
        match cli.command {
            Commands::Partitions(cmd) => assert_eq!(cmd.partition.as_deref(), Some("restricted")),
            _ => panic!("Expected Partitions command"),
        }
    }

    #[test]
    fn test_policy_command_parsing() {
        let cli = Cli::try_parse_from(["sts-rotator", "policy", "role.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Policy(_)));
    }

    #[test]
    fn test_subcommand_required() {
        let result = Cli::try_parse_from(["sts-rotator"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_structure_validation() {
        let cmd = Cli::command();
        cmd.debug_assert();
    }

    #[test]
    fn test_help_flag_works() {
        let result = Cli::try_parse_from(["sts-rotator", "--help"]);
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::DisplayHelp);
        } else {
            panic!("Expected help output");
        }
    }

    #[test]
    fn test_verbose_flag_multiple() {
        let cli = Cli::try_parse_from(["sts-rotator", "-vvv", "partitions"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }
}
