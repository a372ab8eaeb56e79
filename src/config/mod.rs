use crate::app_error::AppError;
use crate::cli::CliArgs;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};


pub const DEFAULT_API_URL: &str = "https://api.coze.com/open_api/v2/chat";

const API_KEY_ENV: &str = "COZE_API_KEY";
const API_KEY_FILE: &str = "eval-config/coze-key.txt";

/// On-disk catalog: platform bots, the evaluator bot, and algorithm
/// display names. Kept out of the source so tests and operators can
/// substitute their own tables.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_api_url")]
    api_url: String,
    bots: HashMap<String, String>,
    evaluator_bot: String,
    algorithms: HashMap<String, String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    bots: HashMap<String, String>,
    evaluator_bot: String,
    algorithms: HashMap<String, String>,
    root: PathBuf,
}

impl Config {
    pub fn load(args: &CliArgs) -> Result<Self, AppError> {
        let api_key = match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => read_file(Path::new(API_KEY_FILE))
                .map_err(|_| {
                    AppError::Config(format!(
                        "No API key found: set {API_KEY_ENV} or create {API_KEY_FILE}"
                    ))
                })?
                .trim()
                .to_string(),
        };
        Self::load_with_key(args, api_key)
    }

    pub fn load_with_key(args: &CliArgs, api_key: String) -> Result<Self, AppError> {
        let raw = read_file(&args.catalog)?;
        let catalog: CatalogFile = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!(
                "Failed to parse catalog '{}': {e}",
                args.catalog.display()
            ))
        })?;

        Ok(Self {
            api_url: catalog.api_url,
            api_key,
            bots: catalog.bots,
            evaluator_bot: catalog.evaluator_bot,
            algorithms: catalog.algorithms,
            root: args.root.clone(),
        })
    }

    pub fn bot_id(&self, platform: &str) -> Result<&str, AppError> {
        self.bots
            .get(platform)
            .map(String::as_str)
            .ok_or_else(|| AppError::Config(format!("Unknown platform: {platform}")))
    }

    pub fn evaluator_bot_id(&self) -> &str {
        &self.evaluator_bot
    }

    pub fn algorithm_name(&self, key: &str) -> Result<&str, AppError> {
        self.algorithms
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AppError::Config(format!("Unknown algorithm: {key}")))
    }

    /// Staged prompt fragment for one tip level. Re-read on every call so
    /// edits to the tip files take effect between jobs.
    pub fn tip_text(&self, platform: &str, algorithm: &str, level: &str) -> Result<String, AppError> {
        read_file(
            &self
                .root
                .join("tips")
                .join(platform)
                .join(algorithm)
                .join(level),
        )
    }

    pub fn reference_code(&self, platform: &str, algorithm: &str) -> Result<String, AppError> {
        read_file(&self.root.join("code").join(platform).join(algorithm))
    }

    /// The fixed instruction appended below the tip text.
    pub fn instruction(&self, algorithm: &str) -> Result<String, AppError> {
        let name = self.algorithm_name(algorithm)?;
        Ok(format!(
            "Refer to the above tips to help me generate the {name} algorithm completed code."
        ))
    }
}

fn read_file(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|e| AppError::io(path, e))
}
