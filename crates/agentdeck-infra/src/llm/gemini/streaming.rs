//! SSE streaming for `streamGenerateContent?alt=sse`.
//!
//! Every `data:` payload is a full [`GeminiResponse`] carrying the next text
//! fragment. `usageMetadata` is cumulative, so only the last reported value
//! is emitted, right before `Done`.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};

use agentdeck_types::llm::{LlmError, StreamEvent, Usage};

use super::types::GeminiResponse;
use super::{classify_error, retry_after_ms};

/// Open an SSE connection for the prepared request and map its chunks to
/// [`StreamEvent`]s. The connection is only opened on first poll.
pub fn create_gemini_stream(
    builder: reqwest::RequestBuilder,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let mut source = EventSource::new(builder)
            .map_err(|e| LlmError::Unknown(format!("failed to open stream: {e}")))?;
        let mut usage: Option<Usage> = None;

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    let parsed = parse_chunk(&message.data);
                    if parsed.is_err() {
                        source.close();
                    }
                    let (text, reported) = parsed?;
                    if reported.is_some() {
                        usage = reported;
                    }
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text };
                    }
                }
                Err(EventSourceError::StreamEnded) => break,
                Err(err) => {
                    source.close();
                    Err::<(), _>(map_stream_error(err).await)?;
                }
            }
        }

        if let Some(usage) = usage {
            yield StreamEvent::Usage(usage);
        }
        yield StreamEvent::Done;
    })
}

/// Text fragment and usage (if reported) of one SSE payload.
fn parse_chunk(data: &str) -> Result<(String, Option<Usage>), LlmError> {
    let chunk: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| LlmError::Unknown(format!("failed to parse stream chunk: {e}")))?;

    if let Some(reason) = chunk.block_reason() {
        return Err(LlmError::ContentFiltered(reason));
    }

    let usage = chunk.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
    });
    Ok((chunk.text(), usage))
}

async fn map_stream_error(err: EventSourceError) -> LlmError {
    match err {
        EventSourceError::InvalidStatusCode(status, response) => {
            let retry_after = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            classify_error(status.as_u16(), &body, retry_after)
        }
        other => LlmError::Unknown(format!("stream error: {other}")),
    }
}
