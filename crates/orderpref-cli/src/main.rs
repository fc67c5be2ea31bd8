mod cli;
mod config;
mod prefs;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Version => print_version(),
        cli::Command::Install => run_install(&config)?,
        cli::Command::Uninstall => run_uninstall(&config)?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cmd => prefs::handle(cmd, &config).await?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("orderpref {}", env!("CARGO_PKG_VERSION"));
}

fn run_install(config: &config::Config) -> Result<()> {
    let repo = storage::repo_from_config(config)?;
    repo.install()?;
    println!("Preference table installed");
    Ok(())
}

fn run_uninstall(config: &config::Config) -> Result<()> {
    let Some(repo) = storage::existing_repo_from_config(config)? else {
        println!("No preference database, nothing to remove");
        return Ok(());
    };
    repo.uninstall()?;
    println!("Preference table removed");
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(&config.resolved()?)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderpref_core::preferences::{PreferenceRepository, UserId};

    #[tokio::test]
    async fn uninstall_then_install_leaves_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = config::Config {
            database: Some(dir.path().join("prefs.db")),
            ..config::Config::default()
        };
        run_install(&cfg).expect("install");
        let repo = storage::repo_from_config(&cfg).expect("repo");
        repo.ensure_exists(UserId(1)).await.expect("create");
        drop(repo);

        run_uninstall(&cfg).expect("uninstall");
        run_install(&cfg).expect("reinstall");

        let repo = storage::repo_from_config(&cfg).expect("repo");
        assert!(repo.find_by_user(UserId(1)).await.expect("find").is_none());
    }

    #[test]
    fn uninstall_without_database_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh").join("prefs.db");
        let cfg = config::Config {
            database: Some(path.clone()),
            ..config::Config::default()
        };
        run_uninstall(&cfg).expect("uninstall");
        assert!(!path.exists());
    }
}
