use crate::app_error::AppError;
use crate::chat::api::{ChatApi, ChatMessage, ChatResponse};
use crate::cli::CliArgs;
use crate::config::Config;
use crate::generation::{generate_level, generate_samples, GeneratedSample, RetryPolicy};
use crate::logger::Logger;
use std::fs;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Replays a fixed sequence of responses, repeating the last one forever,
/// and records every (bot_id, query) it receives.
struct SequenceChatApi {
    responses: Vec<Result<ChatResponse, String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl SequenceChatApi {
    fn new(responses: Vec<Result<ChatResponse, String>>) -> Self {
        Self {
            responses,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChatApi for SequenceChatApi {
    fn send<'a>(
        &'a self,
        bot_id: &'a str,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, AppError>> + Send + 'a>> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len().min(self.responses.len() - 1);
        calls.push((bot_id.to_string(), query.to_string()));
        let resp = self.responses[index].clone().map_err(AppError::Network);
        Box::pin(async { resp })
    }
}

fn response_with(messages: Vec<(&str, &str)>) -> ChatResponse {
    ChatResponse {
        raw_body: "{}".to_string(),
        messages: messages
            .into_iter()
            .map(|(message_type, content)| ChatMessage {
                message_type: message_type.to_string(),
                content: content.to_string(),
            })
            .collect(),
    }
}

fn fenced_answer(code: &str) -> ChatResponse {
    response_with(vec![("answer", &format!("```rust\n{code}\n```"))])
}

fn zero_delay_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_level_succeeds_on_first_valid_answer() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Logger::new_in(temp_dir.path(), "t").unwrap();

    // A non-answer message before the answer must not confuse the loop.
    let api = SequenceChatApi::new(vec![Ok(response_with(vec![
        ("follow_up", "want more?"),
        ("answer", "Sure!\n```python\nprint(1)\n```"),
    ]))]);

    let sample = generate_level(
        &api,
        "bot-1",
        "query",
        &logger,
        "Pregel-CC-1",
        &zero_delay_policy(3),
    )
    .await
    .unwrap();

    assert_eq!(sample, GeneratedSample::Code("print(1)\n".to_string()));
    assert_eq!(api.call_count(), 1);
}

#[tokio::test]
async fn test_level_retries_until_code_appears() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Logger::new_in(temp_dir.path(), "t").unwrap();

    let api = SequenceChatApi::new(vec![
        Ok(response_with(vec![("answer", "no code here")])),
        Ok(response_with(vec![("follow_up", "hm")])),
        Ok(fenced_answer("int x = 0;")),
    ]);

    let sample = generate_level(
        &api,
        "bot-1",
        "query",
        &logger,
        "Pregel-CC-1",
        &zero_delay_policy(5),
    )
    .await
    .unwrap();

    assert_eq!(sample, GeneratedSample::Code("int x = 0;\n".to_string()));
    assert_eq!(api.call_count(), 3);
}

#[tokio::test]
async fn test_level_fails_deterministically_after_cap() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Logger::new_in(temp_dir.path(), "t").unwrap();

    let api = SequenceChatApi::new(vec![Ok(response_with(vec![("answer", "prose only")]))]);

    let sample = generate_level(
        &api,
        "bot-1",
        "query",
        &logger,
        "Pregel-CC-1",
        &zero_delay_policy(3),
    )
    .await
    .unwrap();

    assert_eq!(sample, GeneratedSample::Failed { attempts: 3 });
    assert_eq!(api.call_count(), 3);
}

#[tokio::test]
async fn test_network_errors_consume_attempts() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Logger::new_in(temp_dir.path(), "t").unwrap();

    let api = SequenceChatApi::new(vec![Err("connection reset".to_string())]);

    let sample = generate_level(
        &api,
        "bot-1",
        "query",
        &logger,
        "Pregel-CC-1",
        &zero_delay_policy(2),
    )
    .await
    .unwrap();

    assert_eq!(sample, GeneratedSample::Failed { attempts: 2 });
    assert_eq!(api.call_count(), 2);
}

#[tokio::test]
async fn test_samples_collected_in_level_order() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    fs::write(
        base.join("catalog.json"),
        r#"{
            "bots": { "Pregel": "bot-pregel" },
            "evaluator_bot": "bot-evaluator",
            "algorithms": { "CC": "Connected Component" }
        }"#,
    )
    .unwrap();
    let tip_dir = base.join("tips/Pregel/CC");
    fs::create_dir_all(&tip_dir).unwrap();
    fs::write(tip_dir.join("1"), "tip one").unwrap();
    fs::write(tip_dir.join("2"), "tip two").unwrap();

    let args = CliArgs {
        platforms: vec!["Pregel".to_string()],
        algorithms: vec!["CC".to_string()],
        levels: vec!["1".to_string(), "2".to_string()],
        root: base.to_path_buf(),
        catalog: base.join("catalog.json"),
        max_attempts: 3,
    };
    let config = Config::load_with_key(&args, "k".to_string()).unwrap();
    let logger = Logger::new_in(base, "t").unwrap();

    let api = SequenceChatApi::new(vec![
        Ok(fenced_answer("level one code")),
        Ok(fenced_answer("level two code")),
    ]);

    let samples = generate_samples(
        &api,
        &config,
        &logger,
        "Pregel",
        "CC",
        &args.levels,
        &zero_delay_policy(3),
    )
    .await
    .unwrap();

    assert_eq!(
        samples,
        vec![
            GeneratedSample::Code("level one code\n".to_string()),
            GeneratedSample::Code("level two code\n".to_string()),
        ]
    );

    // Every request targets the platform bot and embeds the tip plus the
    // fixed instruction.
    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "bot-pregel");
    assert!(calls[0].1.starts_with("tip one\n"));
    assert!(calls[0].1.contains("Connected Component"));
    assert!(calls[1].1.starts_with("tip two\n"));
}

#[tokio::test]
async fn test_missing_tip_aborts_pair() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    fs::write(
        base.join("catalog.json"),
        r#"{
            "bots": { "Pregel": "bot-pregel" },
            "evaluator_bot": "bot-evaluator",
            "algorithms": { "CC": "Connected Component" }
        }"#,
    )
    .unwrap();

    let args = CliArgs {
        platforms: vec!["Pregel".to_string()],
        algorithms: vec!["CC".to_string()],
        levels: vec!["1".to_string()],
        root: base.to_path_buf(),
        catalog: base.join("catalog.json"),
        max_attempts: 3,
    };
    let config = Config::load_with_key(&args, "k".to_string()).unwrap();
    let logger = Logger::new_in(base, "t").unwrap();

    let api = SequenceChatApi::new(vec![Ok(fenced_answer("unused"))]);

    let result = generate_samples(
        &api,
        &config,
        &logger,
        "Pregel",
        "CC",
        &args.levels,
        &zero_delay_policy(3),
    )
    .await;

    assert!(matches!(result, Err(AppError::Io { .. })));
    assert_eq!(api.call_count(), 0);
}

#[test]
fn test_failed_sample_renders_sentinel() {
    let sample = GeneratedSample::Failed { attempts: 4 };
    assert_eq!(sample.render(), "[code generation failed after 4 attempts]");
}

#[test]
fn test_backoff_delay_grows_and_caps() {
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(400),
    };
    // Jitter is bounded by base_delay / 2.
    let jitter_bound = Duration::from_millis(50);

    assert!(policy.backoff_delay(1) < Duration::from_millis(100) + jitter_bound);
    assert!(policy.backoff_delay(2) >= Duration::from_millis(200));
    assert!(policy.backoff_delay(10) <= Duration::from_millis(400) + jitter_bound);
}
