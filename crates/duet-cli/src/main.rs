use std::io::{self, BufRead};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use duet_cli::{CliArgs, OutputMode, Render, SseRenderer, TextRenderer};
use duet_composite::{ChunkEncoder, Composite, CompositeEvent, ConnectionReport, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    let settings = Settings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&settings);

    tracing::info!(
        reasoning_model = %settings.reasoning_model(),
        answer_model = %settings.answer_model,
        answer_provider = ?settings.answer_provider,
        proxy = settings.proxy.is_some(),
        "Configuration loaded"
    );

    let composite = Composite::from_settings(&settings)?;

    if args.check {
        let report = composite.check_connections().await;
        print_report(&composite, &report);
        if !report.is_ok() {
            anyhow::bail!("Connection check failed");
        }
        return Ok(());
    }

    let question = match args.question() {
        Some(question) => question,
        None => read_question()?,
    };

    let stdout = io::stdout();
    let mut renderer: Box<dyn Render> = match args.mode() {
        OutputMode::Text => Box::new(TextRenderer::new(stdout.lock())),
        OutputMode::Sse => Box::new(SseRenderer::new(
            stdout.lock(),
            ChunkEncoder::new(composite.reasoning_model(), composite.answer_model()),
        )),
    };

    let mut rx = composite.spawn_run(question);
    let mut failure = None;

    while let Some(event) = rx.recv().await {
        renderer.render(&event)?;
        if let CompositeEvent::Failed { error, .. } = event {
            failure = Some(error);
        }
    }

    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn read_question() -> anyhow::Result<String> {
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        lines.push(line?);
    }

    let question = lines.join("\n");
    if question.trim().is_empty() {
        anyhow::bail!("No question given (pass it as arguments or on stdin, see --help)");
    }
    Ok(question)
}

fn print_report(composite: &Composite, report: &ConnectionReport) {
    let rows = [
        ("reasoning", composite.reasoning_model(), &report.reasoning),
        ("answer", composite.answer_model(), &report.answer),
    ];

    for (phase, model, outcome) in rows {
        match outcome {
            Ok(elapsed) => println!("{:<10} {:<28} ok ({:.2?})", phase, model, elapsed),
            Err(e) => println!("{:<10} {:<28} FAILED: {}", phase, model, e),
        }
    }
}

fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries the answer; logs go to stderr
    match settings.log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
    }
}
