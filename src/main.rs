//! VoiceMemo CLI entry point

use std::process::ExitCode;

use clap::Parser;

use voice_memo::cli::{
    app::{load_merged_config, run_list, run_play, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    logging::init_tracing,
    presenter::Presenter,
};
use voice_memo::domain::config::AppConfig;
use voice_memo::domain::recording::Duration;
use voice_memo::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    let cli_config = AppConfig {
        storage_dir: cli
            .storage_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned()),
        ..Default::default()
    };
    let config = load_merged_config(cli_config).await;
    init_tracing(config.log_level_or_default());

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Record { duration } => {
            let duration = match duration.as_deref().map(str::parse::<Duration>) {
                Some(Ok(d)) => Some(d),
                Some(Err(e)) => {
                    presenter.error(&e.to_string());
                    return ExitCode::from(EXIT_USAGE_ERROR);
                }
                None => None,
            };
            run_record(&config, duration).await
        }
        Commands::Play { name } => run_play(&config, name).await,
        Commands::List => run_list(&config),
    }
}
