#![allow(dead_code)]

use async_trait::async_trait;
use duet_composite::{CompositeEvent, Phase, StreamChunk};
use duet_llm::{ChatRequest, ChatTransport, StreamEvent, TokenStream, TransportError, UsageStats};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

type Script = Vec<Result<StreamEvent, TransportError>>;

/// In-memory transport that replays a fixed event script and records requests
pub struct ScriptedTransport {
    script: Script,
    open_error: Option<TransportError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            open_error: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport whose `stream` call itself fails
    pub fn failing(error: TransportError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn stream(&self, request: ChatRequest) -> duet_llm::error::Result<TokenStream> {
        self.requests.lock().unwrap().push(request);
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let events = futures::stream::iter(self.script.clone());
        match self.delay {
            Some(delay) => Ok(Box::pin(events.then(move |event| async move {
                tokio::time::sleep(delay).await;
                event
            }))),
            None => Ok(Box::pin(events)),
        }
    }
}

/// Sets its flag when dropped
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Transport producing deltas forever; reports when its stream is released
pub struct EndlessTransport {
    pub released: Arc<AtomicBool>,
}

impl EndlessTransport {
    pub fn new() -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ChatTransport for EndlessTransport {
    fn provider(&self) -> &'static str {
        "endless"
    }

    async fn stream(&self, _request: ChatRequest) -> duet_llm::error::Result<TokenStream> {
        let guard = DropFlag(Arc::clone(&self.released));
        Ok(Box::pin(futures::stream::unfold(guard, |guard| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Some((
                Ok(StreamEvent::Delta {
                    content: "thinking ".to_string(),
                }),
                guard,
            ))
        })))
    }
}

/// Transport sending one delta, then going silent without closing
pub struct StalledTransport {
    pub released: Arc<AtomicBool>,
}

impl StalledTransport {
    pub fn new() -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ChatTransport for StalledTransport {
    fn provider(&self) -> &'static str {
        "stalled"
    }

    async fn stream(&self, _request: ChatRequest) -> duet_llm::error::Result<TokenStream> {
        let guard = DropFlag(Arc::clone(&self.released));
        let head = futures::stream::iter(vec![delta("Let me think")]);
        let silence = futures::stream::pending::<Result<StreamEvent, TransportError>>().map(move |event| {
            let _held = &guard;
            event
        });
        Ok(Box::pin(head.chain(silence)))
    }
}

pub fn delta(text: &str) -> Result<StreamEvent, TransportError> {
    Ok(StreamEvent::Delta {
        content: text.to_string(),
    })
}

pub fn thought(text: &str) -> Result<StreamEvent, TransportError> {
    Ok(StreamEvent::Reasoning {
        content: text.to_string(),
    })
}

pub fn usage(prompt: u32, completion: u32, total: u32) -> Result<StreamEvent, TransportError> {
    Ok(StreamEvent::Usage {
        usage: UsageStats::new(prompt, completion, total),
    })
}

pub fn done() -> Result<StreamEvent, TransportError> {
    Ok(StreamEvent::Done {
        finish_reason: Some("stop".to_string()),
    })
}

/// Drain a run until its channel closes
pub async fn collect(mut rx: mpsc::Receiver<CompositeEvent>) -> Vec<CompositeEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn chunks(events: &[CompositeEvent]) -> Vec<StreamChunk> {
    events.iter().filter_map(|e| e.chunk().cloned()).collect()
}

pub fn text_of(chunks: &[StreamChunk], phase: Phase) -> String {
    chunks
        .iter()
        .filter(|c| c.phase == phase)
        .map(|c| c.delta_text.as_str())
        .collect()
}
