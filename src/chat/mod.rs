pub mod api;


use crate::app_error::AppError;
use crate::logger::Logger;
use api::{ChatApi, ChatResponse};
use serde_json::json;
use std::time::Instant;

/// One logged request/response exchange against a chat bot. The raw
/// response body goes to stdout and the run's log directory so an operator
/// can follow the session without attaching a debugger.
pub async fn exchange(
    api: &dyn ChatApi,
    bot_id: &str,
    query: &str,
    logger: &Logger,
    log_prefix: &str,
) -> Result<ChatResponse, AppError> {
    logger.log_text(&format!("{log_prefix}-query.txt"), query)?;
    logger.log_json(
        &format!("{log_prefix}-query.json"),
        &json!({ "botId": bot_id, "query": query }),
    )?;

    let start_time = Instant::now();
    let result = api.send(bot_id, query).await;
    let duration = start_time.elapsed();

    match result {
        Ok(response) => {
            println!(
                "Chat call to bot {bot_id} took {:.3}s",
                duration.as_secs_f64()
            );
            println!("{}", response.raw_body);
            logger.log_text(&format!("{log_prefix}-response.txt"), &response.raw_body)?;
            Ok(response)
        }
        Err(e) => {
            logger.log_text(&format!("{log_prefix}-response.txt"), &format!("ERROR\n{e}"))?;
            Err(e)
        }
    }
}
