use duet_llm::{ChatMessage, ChatRequest, ClientFactory, ProviderConfig, StreamEvent};
use futures::StreamExt;
use std::error::Error;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let api_key = std::env::var("GEMINI_API_KEY")?;
    let transport = ClientFactory::create_transport(ProviderConfig::gemini(api_key))?;

    let request = ChatRequest::new(
        "gemini-2.0-flash",
        vec![
            ChatMessage::system("Answer in one paragraph."),
            ChatMessage::user("Explain how photosynthesis works."),
        ],
    );

    let mut stream = transport.stream(request).await?;
    let mut last_usage = None;
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Delta { content } => {
                print!("{}", content);
                std::io::stdout().flush()?;
            }
            // Gemini repeats cumulative usage on every frame
            StreamEvent::Usage { usage } => last_usage = Some(usage),
            _ => {}
        }
    }

    if let Some(usage) = last_usage {
        println!("\n\n[{} prompt + {} completion tokens]", usage.prompt_tokens, usage.completion_tokens);
    }

    Ok(())
}
