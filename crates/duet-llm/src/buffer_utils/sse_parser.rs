use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;

use super::buffering::CircularLineBuffer;
use crate::error::{Result, TransportError};
use crate::streaming::{StreamEvent, TokenStream};

/// Strategy pattern for parsing the `data:` payloads of different providers
pub trait SseLineParser: Send {
    /// Provider name used in error messages
    fn provider(&self) -> &'static str;

    /// Parse one data payload into stream events. A `Done` event marks the
    /// provider's completion frame; it is held back and re-emitted once at
    /// the very end of the stream.
    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Completion bookkeeping across frames
#[derive(Default)]
struct FrameState {
    finished: bool,
    finish_reason: Option<String>,
    marker_seen: bool,
}

impl FrameState {
    fn process<P: SseLineParser>(&mut self, parser: &mut P, line: &str) -> Result<Vec<StreamEvent>> {
        // blank separators, `:` keep-alive comments, `event:`/`id:` fields
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(Vec::new());
        };
        let data = data.trim_start();

        if parser.is_done_marker(data) {
            self.marker_seen = true;
            return Ok(Vec::new());
        }

        let mut events = parser.parse_data_line(data)?;
        events.retain(|event| match event {
            StreamEvent::Done { finish_reason } => {
                self.finished = true;
                if finish_reason.is_some() {
                    self.finish_reason = finish_reason.clone();
                }
                false
            }
            _ => true,
        });
        Ok(events)
    }

    fn is_complete(&self) -> bool {
        self.finished || self.marker_seen
    }
}

/// Generic SSE stream parser using circular buffer.
///
/// Yields each parsed event as soon as its line is complete, then exactly one
/// `Done`. Ends with `IncompleteStream` when the body closes before the
/// provider signalled completion, and with `Connection` when no bytes arrive
/// within `idle_timeout`. Nothing is yielded after an error.
pub fn parse_sse_stream<S, B, E, P>(
    bytes: S,
    mut parser: P,
    idle_timeout: Option<Duration>,
) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut state = FrameState::default();
        let mut eof = false;

        while !eof && !state.marker_seen {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, byte_chunks.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(TransportError::Connection(format!(
                            "{} stream idle for more than {:?}",
                            parser.provider(),
                            limit
                        )));
                        return;
                    }
                },
                None => byte_chunks.next().await,
            };

            match next {
                Some(Ok(bytes)) => buffer.extend(bytes.as_ref()),
                Some(Err(e)) => {
                    yield Err(TransportError::Connection(format!("Stream error: {}", e)));
                    return;
                }
                None => {
                    buffer.close();
                    eof = true;
                }
            }

            while let Some(line_result) = buffer.next_line() {
                match line_result.and_then(|line| state.process(&mut parser, &line)) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("{} frame rejected: {}", parser.provider(), e);
                        yield Err(e);
                        return;
                    }
                }
                if state.marker_seen {
                    break;
                }
            }
        }

        if state.is_complete() {
            yield Ok(StreamEvent::Done { finish_reason: state.finish_reason });
        } else {
            yield Err(TransportError::IncompleteStream(format!(
                "{} stream closed without a completion frame",
                parser.provider()
            )));
        }
    })
}
