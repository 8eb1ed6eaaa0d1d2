use duet_llm::TransportError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::builder::CompositeBuilder;
use crate::error::CompositeError;
use crate::stage::{send, EventSender};
use crate::stages::{AnswerStage, ReasoningStage};
use crate::types::{CompositeEvent, CompositeResult};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Lifecycle of one run. `Failed` is reachable from either running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RunningReasoning,
    RunningAnswer,
    Done,
    Failed,
}

struct RunTracker<'a> {
    run_id: &'a str,
    state: RunState,
}

impl<'a> RunTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) {
        tracing::info!(run_id = %self.run_id, from = ?self.state, to = ?next, "Run state change");
        self.state = next;
    }

    fn fail(&mut self, error: &CompositeError) {
        tracing::warn!(run_id = %self.run_id, from = ?self.state, error = %error, "Run failed");
        self.state = RunState::Failed;
    }
}

/// Outcome of probing both endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub reasoning: Result<Duration, TransportError>,
    pub answer: Result<Duration, TransportError>,
}

impl ConnectionReport {
    pub fn is_ok(&self) -> bool {
        self.reasoning.is_ok() && self.answer.is_ok()
    }
}

/// Two-stage composite: a reasoning model thinks, an answer model answers.
///
/// Holds only immutable configuration, so one instance serves any number of
/// concurrent runs.
#[derive(Clone)]
pub struct Composite {
    reasoning: Arc<ReasoningStage>,
    answer: Arc<AnswerStage>,
    channel_capacity: usize,
}

impl Composite {
    pub fn new(reasoning: ReasoningStage, answer: AnswerStage) -> Self {
        Self {
            reasoning: Arc::new(reasoning),
            answer: Arc::new(answer),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn builder() -> CompositeBuilder {
        CompositeBuilder::new()
    }

    /// Capacity of the event channel handed out by [`Composite::spawn_run`]; at least 1
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn reasoning_model(&self) -> &str {
        self.reasoning.model()
    }

    pub fn answer_model(&self) -> &str {
        self.answer.model()
    }

    /// Ping both endpoints concurrently with a minimal request
    pub async fn check_connections(&self) -> ConnectionReport {
        let (reasoning, answer) = tokio::join!(
            self.reasoning.check_connection(),
            self.answer.check_connection()
        );
        ConnectionReport { reasoning, answer }
    }

    /// Spawn a run in the background, return its event receiver.
    ///
    /// The receiver sees `Started`, the chunks of both stages, then exactly
    /// one `Completed` or `Failed`. Dropping it cancels the run.
    pub fn spawn_run(&self, question: impl Into<String>) -> mpsc::Receiver<CompositeEvent> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let composite = self.clone();
        let question = question.into();

        tokio::spawn(async move {
            let started = Instant::now();
            match composite.execute(&question, &tx).await {
                Ok(result) => {
                    let _ = tx.send(CompositeEvent::Completed(result)).await;
                }
                Err(CompositeError::Cancelled) => {
                    tracing::info!("Receiver dropped, run abandoned");
                }
                Err(error) => {
                    let _ = tx
                        .send(CompositeEvent::Failed {
                            error,
                            elapsed: started.elapsed(),
                        })
                        .await;
                }
            }
        });

        rx
    }

    /// Run both stages, forwarding chunks into `event_tx`.
    ///
    /// Emits `Started` and the chunks but not the final `Completed`/`Failed`
    /// event; the outcome is returned instead.
    pub async fn execute(
        &self,
        question: &str,
        event_tx: &EventSender,
    ) -> Result<CompositeResult, CompositeError> {
        if question.trim().is_empty() {
            return Err(CompositeError::EmptyQuestion);
        }

        let start_time = Instant::now();
        let started_at = chrono::Utc::now();
        let run_id = format!("run_{}", uuid::Uuid::new_v4());
        let mut tracker = RunTracker::new(&run_id);

        send(
            event_tx,
            CompositeEvent::Started {
                run_id: run_id.clone(),
                timestamp: started_at.timestamp_millis(),
            },
        )
        .await?;

        tracker.advance(RunState::RunningReasoning);
        let reasoning = match self.reasoning.produce(question, event_tx).await {
            Ok(result) => result,
            Err(error) => {
                tracker.fail(&error);
                return Err(error);
            }
        };

        tracker.advance(RunState::RunningAnswer);
        let answer = match self
            .answer
            .produce(question, &reasoning.full_text, event_tx)
            .await
        {
            Ok(result) => result,
            Err(error) => {
                tracker.fail(&error);
                return Err(error);
            }
        };

        tracker.advance(RunState::Done);

        let result = CompositeResult {
            run_id: run_id.clone(),
            started_at,
            reasoning,
            answer,
            total_elapsed: start_time.elapsed(),
        };

        let usage = result.usage();
        tracing::info!(
            run_id = %run_id,
            total_ms = result.total_elapsed.as_millis() as u64,
            total_tokens = usage.usage.total_tokens,
            usage_complete = usage.is_complete(),
            "Run completed"
        );

        Ok(result)
    }
}
