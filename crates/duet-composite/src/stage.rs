use duet_llm::{ChatMessage, ChatOptions, ChatRequest, ChatTransport, StreamEvent, TransportError};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::{CompositeError, StageFailure};
use crate::types::{CompositeEvent, Phase, StageResult, StreamChunk};

pub type EventSender = mpsc::Sender<CompositeEvent>;

const PING_MESSAGE: &str = "Connection test";
const PING_MAX_TOKENS: u32 = 5;

/// Stream one request through a transport and forward its text as chunks.
///
/// Text is appended to the stage result before the chunk is sent, so the
/// accumulated text always covers everything the consumer has seen. Usage is
/// committed only once the end-of-stream marker arrives. Each read races the
/// channel closing, so a dropped receiver releases the stream at once.
pub(crate) async fn drive_stage(
    phase: Phase,
    transport: &dyn ChatTransport,
    request: ChatRequest,
    event_tx: &EventSender,
) -> Result<StageResult, CompositeError> {
    let started = Instant::now();
    let fail = |cause: TransportError| {
        tracing::error!(phase = %phase, error = %cause, "Stage transport failed");
        CompositeError::Stage(StageFailure::new(phase, cause))
    };

    tracing::info!(
        phase = %phase,
        provider = transport.provider(),
        model = %request.model,
        "Stage started"
    );

    let mut stream = transport.stream(request).await.map_err(fail)?;
    let mut full_text = String::new();
    let mut pending_usage = None;
    let mut finished = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = event_tx.closed() => {
                tracing::debug!(phase = %phase, "Receiver dropped while waiting for a frame");
                return Err(CompositeError::Cancelled);
            }
            event = stream.next() => event,
        };
        let Some(event) = event else { break };

        let text = match event.map_err(fail)? {
            StreamEvent::Delta { content } => content,
            StreamEvent::Reasoning { content } if phase == Phase::Reasoning => content,
            StreamEvent::Reasoning { content } => {
                tracing::debug!(phase = %phase, len = content.len(), "Dropping reasoning from answer model");
                continue;
            }
            StreamEvent::Usage { usage } => {
                pending_usage = Some(usage);
                continue;
            }
            StreamEvent::Done { finish_reason } => {
                tracing::debug!(phase = %phase, finish_reason = ?finish_reason, "End of stream");
                finished = true;
                break;
            }
        };

        full_text.push_str(&text);
        send(event_tx, CompositeEvent::Chunk(StreamChunk::delta(phase, text))).await?;
    }

    if !finished {
        return Err(fail(TransportError::IncompleteStream(format!(
            "{} stream closed without an end-of-stream marker",
            transport.provider()
        ))));
    }

    send(event_tx, CompositeEvent::Chunk(StreamChunk::terminal(phase))).await?;

    let elapsed = started.elapsed();
    tracing::info!(
        phase = %phase,
        chars = full_text.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        usage_available = pending_usage.is_some(),
        "Stage finished"
    );

    Ok(StageResult {
        phase,
        full_text,
        usage: pending_usage,
        elapsed,
    })
}

/// Send an event; a closed channel means the consumer is gone
pub(crate) async fn send(event_tx: &EventSender, event: CompositeEvent) -> Result<(), CompositeError> {
    event_tx
        .send(event)
        .await
        .map_err(|_| CompositeError::Cancelled)
}

/// Send a tiny request and wait for the first frame.
///
/// Succeeds once the endpoint accepted the credentials and model and started
/// streaming; the rest of the response is dropped.
pub(crate) async fn ping(transport: &dyn ChatTransport, model: &str) -> Result<Duration, TransportError> {
    let started = Instant::now();
    let request = ChatRequest::new(model, vec![ChatMessage::user(PING_MESSAGE)])
        .with_options(ChatOptions::new().max_tokens(PING_MAX_TOKENS));

    let mut stream = transport.stream(request).await?;
    match stream.next().await {
        Some(Err(e)) => Err(e),
        None => Err(TransportError::IncompleteStream(format!(
            "{} closed the connection check stream without a frame",
            transport.provider()
        ))),
        Some(Ok(_)) => {
            let elapsed = started.elapsed();
            tracing::info!(
                provider = transport.provider(),
                model = %model,
                elapsed_ms = elapsed.as_millis() as u64,
                "Connection check passed"
            );
            Ok(elapsed)
        }
    }
}
