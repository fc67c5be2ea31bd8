use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "orderpref",
    about = "Per-user order template and signature preferences",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Create the preference table, or upgrade an existing one.
    Install,
    /// Drop the preference table and all stored preferences.
    Uninstall,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List available template files.
    Templates {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// List signature files belonging to a user name.
    Signatures {
        /// Session user name the signature files are named after.
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a user's stored preference.
    Show {
        #[arg(long)]
        user: i64,
    },
    /// Change a user's template and/or signature.
    Set {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        signature: Option<String>,
    },
    /// Open the preference tab for a user and print the form.
    Form {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_install_subcommand() {
        let cli = Cli::try_parse_from(["orderpref", "install"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Install);
    }

    #[test]
    fn requires_subcommand() {
        assert!(Cli::try_parse_from(["orderpref"]).is_err());
    }

    #[test]
    fn parses_set_with_partial_fields() {
        let cli = Cli::try_parse_from(["orderpref", "set", "--user", "4", "--template", "a.odt"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Set {
                user: 4,
                template: Some("a.odt".into()),
                signature: None,
            }
        );
    }

    #[test]
    fn parses_signatures_with_user_name() {
        let cli = Cli::try_parse_from(["orderpref", "signatures", "--user-name", "alice", "--json"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Signatures {
                user_name: "alice".into(),
                json: true,
            }
        );
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["orderpref", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }
}
