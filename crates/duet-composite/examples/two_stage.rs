// Example: DeepSeek R1 thinks, Gemini answers
//
// Run with:
//   export DUET_REASONING_API_KEY=sk-...
//   export DUET_ANSWER_API_KEY=...
//   cargo run --example two_stage -p duet-composite -- "What is 2+2?"

use duet_composite::{Composite, CompositeEvent, Phase, Settings};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.is_empty() {
        "What is 2+2?".to_string()
    } else {
        question
    };

    let settings = Settings::load()?;
    let composite = Composite::from_settings(&settings)?;

    println!("Question: {}\n", question);

    let mut rx = composite.spawn_run(question);
    let mut current = None;

    while let Some(event) = rx.recv().await {
        match event {
            CompositeEvent::Chunk(chunk) => {
                if current != Some(chunk.phase) {
                    match chunk.phase {
                        Phase::Reasoning => println!("💭 Reasoning:"),
                        Phase::Answer => println!("\n\n💬 Answer:"),
                    }
                    current = Some(chunk.phase);
                }
                print!("{}", chunk.delta_text);
                std::io::stdout().flush()?;
            }
            CompositeEvent::Completed(result) => {
                let usage = result.usage();
                println!("\n\n✅ Done in {:.2?}", result.total_elapsed);
                println!("   Tokens: {}", usage.usage.total_tokens);
            }
            CompositeEvent::Failed { error, elapsed } => {
                println!("\n\n❌ Failed after {:.2?}: {}", elapsed, error);
            }
            CompositeEvent::Started { .. } => {}
        }
    }

    Ok(())
}
