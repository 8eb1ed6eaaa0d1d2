use duet_llm::{ChatMessage, ChatOptions, ChatRequest, ChatTransport, OpenAICompatibleClient, StreamEvent};
use futures::StreamExt;
use std::error::Error;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let api_key = std::env::var("DEEPSEEK_API_KEY")?;
    let client = OpenAICompatibleClient::builder()
        .api_key(api_key)
        .endpoint("https://api.deepseek.com")
        .build()?;

    let request = ChatRequest::new(
        "deepseek-reasoner",
        vec![ChatMessage::user("Why is the sky blue?")],
    )
    .with_options(ChatOptions::new().max_tokens(1024));

    let mut stream = client.stream(request).await?;
    let mut reasoning_displayed = false;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Reasoning { content } => {
                if !reasoning_displayed {
                    println!("[REASONING]");
                    reasoning_displayed = true;
                }
                print!("{}", content);
                std::io::stdout().flush()?;
            }
            StreamEvent::Delta { content } => {
                if reasoning_displayed {
                    println!("\n\n[RESPONSE]");
                    reasoning_displayed = false;
                }
                print!("{}", content);
                std::io::stdout().flush()?;
            }
            StreamEvent::Usage { usage } => {
                println!("\n\nTokens: {} total", usage.total_tokens);
            }
            StreamEvent::Done { finish_reason } => {
                println!("Done ({}).", finish_reason.unwrap_or_default());
            }
        }
    }

    Ok(())
}
