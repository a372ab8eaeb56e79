mod app_error;
mod chat;
mod cli;
mod config;
mod evaluation;
mod extract;
mod generation;
mod logger;

#[cfg(test)]
mod generation_test;

use crate::app_error::AppError;
use crate::chat::api::{ChatApi, ChatClient};
use crate::cli::CliArgs;
use crate::config::Config;
use crate::generation::RetryPolicy;
use crate::logger::Logger;
use std::process::exit;

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(_) => {
            println!("Evaluation completed successfully.");
            exit(0);
        }
        Err(e) => {
            eprintln!("An error occurred: {e}");
            exit(1);
        }
    }
}

async fn run() -> Result<(), AppError> {
    let cli_args = cli::parse_cli_args()?;

    let logger = Logger::new("evaluation")?;
    println!("Log directory: {}", logger.log_dir().display());

    let config = Config::load(&cli_args)?;
    let client = ChatClient::new(config.api_url.clone(), config.api_key.clone());
    let policy = RetryPolicy::with_max_attempts(cli_args.max_attempts);

    let mut failed = 0usize;
    let mut total = 0usize;

    for platform in &cli_args.platforms {
        for algorithm in &cli_args.algorithms {
            total += 1;
            println!("\n=== {platform} {algorithm} ===");

            if let Err(e) =
                run_pair(&client, &config, &logger, platform, algorithm, &cli_args, &policy).await
            {
                eprintln!("{platform} {algorithm}: {e}");
                let _ = logger.log_text(
                    &format!("{platform}-{algorithm}-error.txt"),
                    &e.to_string(),
                );
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(AppError::JobsFailed { failed, total });
    }
    Ok(())
}

async fn run_pair(
    api: &dyn ChatApi,
    config: &Config,
    logger: &Logger,
    platform: &str,
    algorithm: &str,
    cli_args: &CliArgs,
    policy: &RetryPolicy,
) -> Result<(), AppError> {
    let samples = generation::generate_samples(
        api,
        config,
        logger,
        platform,
        algorithm,
        &cli_args.levels,
        policy,
    )
    .await?;

    evaluation::run(api, config, logger, platform, algorithm, &samples).await?;
    Ok(())
}
