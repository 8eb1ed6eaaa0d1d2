use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Headed sections for reasoning and answer, then statistics
    #[default]
    Text,
    /// `data: {...}` frames ending with `data: [DONE]`
    Sse,
}

/// Ask the reasoning model to think about a question, then stream the answer
/// model's reply. Reads the question from stdin when none is given.
#[derive(Parser, Debug)]
#[command(name = "duet")]
#[command(version, long_about = None)]
pub struct CliArgs {
    /// Print OpenAI-compatible chat.completion.chunk frames
    #[arg(long)]
    pub sse: bool,

    /// Test both endpoints and exit
    #[arg(long)]
    pub check: bool,

    /// Question words, joined with spaces
    #[arg(value_name = "QUESTION")]
    pub words: Vec<String>,
}

impl CliArgs {
    pub fn mode(&self) -> OutputMode {
        if self.sse {
            OutputMode::Sse
        } else {
            OutputMode::Text
        }
    }

    /// The question given on the command line, if any
    pub fn question(&self) -> Option<String> {
        let question = self.words.join(" ");
        if question.trim().is_empty() {
            None
        } else {
            Some(question)
        }
    }
}
