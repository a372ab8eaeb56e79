use crate::app_error::AppError;
use crate::chat::{self, api::ChatApi};
use crate::config::Config;
use crate::generation::GeneratedSample;
use crate::logger::Logger;

/// Builds the aggregate prompt for the evaluator bot: the reference code,
/// then each sample under its 1-based ordinal in level order. The ordinal
/// labels are load-bearing; the evaluator's verdict refers to them.
pub fn build_evaluator_prompt(reference_code: &str, samples: &[GeneratedSample]) -> String {
    let mut prompt = format!(
        "This is the standard reference code:\n{reference_code}\nNext, a few codes to be evaluated.\n"
    );
    for (i, sample) in samples.iter().enumerate() {
        prompt.push_str(&format!("The code {}:\n{}\n", i + 1, sample.render()));
    }
    prompt
}

/// Submits the reference code plus all generated samples to the evaluator
/// bot, once, and returns its verdict. Failures here leave the generated
/// samples untouched in the run's log directory.
pub async fn run(
    api: &dyn ChatApi,
    config: &Config,
    logger: &Logger,
    platform: &str,
    algorithm: &str,
    samples: &[GeneratedSample],
) -> Result<String, AppError> {
    let reference = config.reference_code(platform, algorithm)?;
    let prompt = build_evaluator_prompt(&reference, samples);

    println!("{prompt}");
    logger.log_text(&format!("{platform}-{algorithm}-evaluator-prompt.txt"), &prompt)?;

    let response = chat::exchange(
        api,
        config.evaluator_bot_id(),
        &prompt,
        logger,
        &format!("{platform}-{algorithm}-evaluator"),
    )
    .await?;

    let answers: Vec<&str> = response.answers().collect();
    if answers.is_empty() {
        return Err(AppError::Protocol(
            "evaluator response contained no answer message".to_string(),
        ));
    }

    let verdict = answers.join("\n");
    println!("{verdict}");
    logger.log_text(&format!("{platform}-{algorithm}-verdict.txt"), &verdict)?;

    Ok(verdict)
}
