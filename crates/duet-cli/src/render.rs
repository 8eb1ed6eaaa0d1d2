// Terminal renderers for composite events

use duet_composite::{ChunkEncoder, CompositeEvent, CompositeResult, Phase, StageResult};
use std::io::{self, Write};
use std::time::Duration;

/// Writes one composite event to an output
pub trait Render {
    fn render(&mut self, event: &CompositeEvent) -> io::Result<()>;
}

/// Human-readable output: a section per phase, then timing and token counts
pub struct TextRenderer<W: Write> {
    out: W,
    current: Option<Phase>,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, current: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(phase: Phase) -> &'static str {
        match phase {
            Phase::Reasoning => "Reasoning:",
            Phase::Answer => "Answer:",
        }
    }

    fn write_stage(&mut self, stage: &StageResult) -> io::Result<()> {
        let tokens = match stage.usage {
            Some(usage) => format!(
                "{} tokens ({} prompt, {} completion)",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            ),
            None => "usage unavailable".to_string(),
        };
        writeln!(
            self.out,
            "  {:<10} {:>8}  {}",
            stage.phase.as_str(),
            format_duration(stage.elapsed),
            tokens
        )
    }

    fn write_summary(&mut self, result: &CompositeResult) -> io::Result<()> {
        let aggregate = result.usage();

        writeln!(self.out, "\n---")?;
        self.write_stage(&result.reasoning)?;
        self.write_stage(&result.answer)?;

        let mut total = format!("{} tokens", aggregate.usage.total_tokens);
        if !aggregate.is_complete() {
            let missing: Vec<&str> = aggregate.unavailable.iter().map(Phase::as_str).collect();
            total.push_str(&format!(" (no usage reported for {})", missing.join(", ")));
        }
        writeln!(
            self.out,
            "  {:<10} {:>8}  {}",
            "total",
            format_duration(result.total_elapsed),
            total
        )
    }
}

impl<W: Write> Render for TextRenderer<W> {
    fn render(&mut self, event: &CompositeEvent) -> io::Result<()> {
        match event {
            CompositeEvent::Started { .. } => {}
            CompositeEvent::Chunk(chunk) if chunk.is_final => {
                if self.current == Some(chunk.phase) {
                    writeln!(self.out)?;
                }
            }
            CompositeEvent::Chunk(chunk) => {
                if self.current != Some(chunk.phase) {
                    if self.current.is_some() {
                        writeln!(self.out)?;
                    }
                    writeln!(self.out, "{}", Self::header(chunk.phase))?;
                    self.current = Some(chunk.phase);
                }
                write!(self.out, "{}", chunk.delta_text)?;
            }
            CompositeEvent::Completed(result) => self.write_summary(result)?,
            CompositeEvent::Failed { error, elapsed } => {
                writeln!(self.out)?;
                writeln!(
                    self.out,
                    "[incomplete] run failed after {}: {}",
                    format_duration(*elapsed),
                    error
                )?;
            }
        }
        self.out.flush()
    }
}

/// OpenAI-compatible `chat.completion.chunk` frames
pub struct SseRenderer<W: Write> {
    out: W,
    encoder: ChunkEncoder,
}

impl<W: Write> SseRenderer<W> {
    pub fn new(out: W, encoder: ChunkEncoder) -> Self {
        Self { out, encoder }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for SseRenderer<W> {
    fn render(&mut self, event: &CompositeEvent) -> io::Result<()> {
        if let Some(frame) = self.encoder.encode(event) {
            self.out.write_all(frame.as_bytes())?;
            self.out.flush()?;
        }
        Ok(())
    }
}

pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
