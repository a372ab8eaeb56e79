use crate::app_error::AppError;
use std::path::PathBuf;

const DEFAULT_CATALOG: &str = "eval-config/catalog.json";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub platforms: Vec<String>,
    pub algorithms: Vec<String>,
    pub levels: Vec<String>,
    pub root: PathBuf,
    pub catalog: PathBuf,
    pub max_attempts: u32,
}

pub fn parse_cli_args() -> Result<CliArgs, AppError> {
    parse_args(std::env::args().skip(1))
}

pub fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, AppError> {
    let mut platforms = Vec::new();
    let mut algorithms = Vec::new();
    let mut levels: Option<Vec<String>> = None;
    let mut root = PathBuf::from(".");
    let mut catalog = PathBuf::from(DEFAULT_CATALOG);
    let mut max_attempts = DEFAULT_MAX_ATTEMPTS;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--platform" => platforms.push(require_value(&mut args, "--platform")?),
            "--algorithm" => algorithms.push(require_value(&mut args, "--algorithm")?),
            "--levels" => {
                let value = require_value(&mut args, "--levels")?;
                let parsed: Vec<String> = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if parsed.is_empty() {
                    return Err(AppError::Config(
                        "--levels requires a comma-separated list of levels".to_string(),
                    ));
                }
                levels = Some(parsed);
            }
            "--root" => root = PathBuf::from(require_value(&mut args, "--root")?),
            "--catalog" => catalog = PathBuf::from(require_value(&mut args, "--catalog")?),
            "--max-attempts" => {
                let value = require_value(&mut args, "--max-attempts")?;
                max_attempts = value.parse().map_err(|_| {
                    AppError::Config(format!("Invalid value for --max-attempts: {value}"))
                })?;
                if max_attempts == 0 {
                    return Err(AppError::Config(
                        "--max-attempts must be at least 1".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::Config(format!("Unknown argument: {arg}")));
            }
        }
    }

    if platforms.is_empty() {
        return Err(AppError::Config(
            "At least one --platform is required.".to_string(),
        ));
    }
    if algorithms.is_empty() {
        return Err(AppError::Config(
            "At least one --algorithm is required.".to_string(),
        ));
    }

    Ok(CliArgs {
        platforms,
        algorithms,
        levels: levels.unwrap_or_else(default_levels),
        root,
        catalog,
        max_attempts,
    })
}

fn default_levels() -> Vec<String> {
    ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect()
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::Config(format!("Missing value for {flag} argument")))
}
