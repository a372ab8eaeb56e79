use crate::app_error::AppError;
use crate::chat::{self, api::ChatApi};
use crate::config::Config;
use crate::extract;
use crate::logger::Logger;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One code sample per tip level, in level order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSample {
    Code(String),
    Failed { attempts: u32 },
}

impl GeneratedSample {
    /// Text that stands in for this sample in the evaluator prompt. A
    /// failed level renders as an explicit marker so the 1-based ordinals
    /// of the remaining samples stay aligned with their levels.
    pub fn render(&self) -> String {
        match self {
            GeneratedSample::Code(code) => code.clone(),
            GeneratedSample::Failed { attempts } => {
                format!("[code generation failed after {attempts} attempts]")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff with jitter derived from system time nanos (no RNG dependency).
        let shift = attempt.saturating_sub(1).min(10);
        let base = self.base_delay.saturating_mul(1u32 << shift);
        let capped = if base > self.max_delay {
            self.max_delay
        } else {
            base
        };
        capped + jitter_duration(self.base_delay)
    }
}

fn jitter_duration(base: Duration) -> Duration {
    // 0..(base/2)
    let nanos_now: u128 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u128)
        .unwrap_or(0);

    let half = base.as_nanos() / 2;
    if half == 0 {
        return Duration::from_millis(0);
    }
    let bound = half.min(u128::from(u64::MAX));
    let jitter_nanos = nanos_now % bound;
    Duration::from_nanos(jitter_nanos as u64)
}

/// Runs the generation loop for one (platform, algorithm) pair: one sample
/// per level, each produced by a bounded retry against the platform's bot.
pub async fn generate_samples(
    api: &dyn ChatApi,
    config: &Config,
    logger: &Logger,
    platform: &str,
    algorithm: &str,
    levels: &[String],
    policy: &RetryPolicy,
) -> Result<Vec<GeneratedSample>, AppError> {
    let bot_id = config.bot_id(platform)?;
    let instruction = config.instruction(algorithm)?;
    let mut samples = Vec::with_capacity(levels.len());

    for level in levels {
        let tip = config.tip_text(platform, algorithm, level)?;
        let query = format!("{tip}\n{instruction}");

        let log_prefix = format!("{platform}-{algorithm}-{level}");
        let sample = generate_level(api, bot_id, &query, logger, &log_prefix, policy).await?;
        println!("{platform} {algorithm} {level}");

        if let GeneratedSample::Failed { attempts } = &sample {
            eprintln!(
                "{platform} {algorithm} level {level}: no fenced code after {attempts} attempts"
            );
        }
        samples.push(sample);
    }

    Ok(samples)
}

pub(crate) async fn generate_level(
    api: &dyn ChatApi,
    bot_id: &str,
    query: &str,
    logger: &Logger,
    log_prefix: &str,
    policy: &RetryPolicy,
) -> Result<GeneratedSample, AppError> {
    for attempt in 1..=policy.max_attempts {
        let attempt_prefix = format!("{log_prefix}-attempt-{attempt}");

        match chat::exchange(api, bot_id, query, logger, &attempt_prefix).await {
            Ok(response) => match response.first_answer() {
                Some(answer) => {
                    if let Some(code) = extract::extract_code(answer) {
                        return Ok(GeneratedSample::Code(code));
                    }
                    println!(
                        "Attempt {attempt}/{}: answer contained no fenced code block",
                        policy.max_attempts
                    );
                }
                None => {
                    println!(
                        "Attempt {attempt}/{}: no answer message in response",
                        policy.max_attempts
                    );
                }
            },
            // Transport and protocol failures consume an attempt rather
            // than aborting the level.
            Err(e @ (AppError::Network(_) | AppError::Protocol(_))) => {
                println!("Attempt {attempt}/{} failed: {e}", policy.max_attempts);
            }
            Err(e) => return Err(e),
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff_delay(attempt)).await;
        }
    }

    Ok(GeneratedSample::Failed {
        attempts: policy.max_attempts,
    })
}
