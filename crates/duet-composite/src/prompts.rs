// Prompt wording for both stages and the single-pass answer template

use serde::{Deserialize, Serialize};

pub const QUESTION_PLACEHOLDER: &str = "{question}";
pub const REASONING_PLACEHOLDER: &str = "{reasoning}";

pub const DEFAULT_REASONING_INSTRUCTION: &str = "Analyze the following question with a chain of thought. \
Think step by step and lay out your reasoning before reaching any conclusion.";

pub const DEFAULT_ANSWER_INSTRUCTION: &str = "You are given a question together with an analysis written by another model. \
Use the analysis to write the final answer. Summarize and refine it; do not repeat it verbatim.";

pub const DEFAULT_ANSWER_TEMPLATE: &str = "Here is the original question:\n{question}\n\n\
Here is another model's reasoning process:\n{reasoning}\n\n\
Based on this reasoning, give a complete and detailed answer that fully addresses the question.";

/// Instructions sent to each stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System message for the reasoning model; empty means none is sent
    pub reasoning_instruction: String,
    /// System message for the answer model; empty means none is sent
    pub answer_instruction: String,
    /// User message for the answer model, with `{question}` and `{reasoning}`
    pub answer_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            reasoning_instruction: DEFAULT_REASONING_INSTRUCTION.to_string(),
            answer_instruction: DEFAULT_ANSWER_INSTRUCTION.to_string(),
            answer_template: DEFAULT_ANSWER_TEMPLATE.to_string(),
        }
    }
}

impl PromptConfig {
    pub fn with_reasoning_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.reasoning_instruction = instruction.into();
        self
    }

    pub fn with_answer_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.answer_instruction = instruction.into();
        self
    }

    pub fn with_answer_template(mut self, template: impl Into<String>) -> Self {
        self.answer_template = template.into();
        self
    }

    /// Name of the first placeholder the answer template lacks
    pub fn missing_placeholder(&self) -> Option<&'static str> {
        [QUESTION_PLACEHOLDER, REASONING_PLACEHOLDER]
            .into_iter()
            .find(|placeholder| !self.answer_template.contains(placeholder))
    }

    pub fn render_answer_prompt(&self, question: &str, reasoning: &str) -> String {
        render_template(&self.answer_template, question, reasoning)
    }
}

/// Substitute `{question}` and `{reasoning}` in one left-to-right pass.
///
/// Substituted text is never rescanned, so braces inside the question or the
/// reasoning survive untouched. Other braces in the template are literal.
pub fn render_template(template: &str, question: &str, reasoning: &str) -> String {
    let mut out = String::with_capacity(template.len() + question.len() + reasoning.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
            out.push_str(question);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(REASONING_PLACEHOLDER) {
            out.push_str(reasoning);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}
