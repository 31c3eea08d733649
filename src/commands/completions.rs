use clap::{Args, CommandFactory};
use clap_complete::Shell;
use std::io;

use crate::cli::Cli;

#[derive(Debug, Clone, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum, help = "Target shell for completion script")]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(self) {
        let mut cmd = Cli::command();
        let app_name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, app_name, &mut io::stdout());
    }

    #[cfg(test)]
    pub fn generate_to_string(&self) -> String {
        let mut cmd = Cli::command();
        let app_name = cmd.get_name().to_string();
        let mut buffer = Vec::new();
        clap_complete::generate(self.shell, &mut cmd, app_name, &mut buffer);
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completion() {
        let result = CompletionsCommand { shell: Shell::Bash }.generate_to_string();
        assert!(result.contains("COMPREPLY"));
        assert!(result.contains("sts-rotator"));
    }

    #[test]
    fn test_zsh_completion() {
        let result = CompletionsCommand { shell: Shell::Zsh }.generate_to_string();
        assert!(result.contains("#compdef sts-rotator"));
    }

    #[test]
    fn test_fish_completion() {
        let result = CompletionsCommand { shell: Shell::Fish }.generate_to_string();
        assert!(result.contains("complete -c sts-rotator"));
    }

    #[test]
    fn test_completion_contains_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
            let result = CompletionsCommand { shell }.generate_to_string();

            for subcommand in ["rotate", "policy", "partitions", "configure", "completions"] {
                assert!(
                    result.contains(subcommand),
                    "{subcommand} command should be in {shell} completions"
                );
            }
        }
    }

    #[test]
    fn test_completion_contains_global_options() {
        let result = CompletionsCommand { shell: Shell::Bash }.generate_to_string();
        assert!(result.contains("--profile"));
        assert!(result.contains("--verbose"));
    }
}
