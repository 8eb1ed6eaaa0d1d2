pub mod answer;
pub mod reasoning;

pub use answer::AnswerStage;
pub use reasoning::ReasoningStage;
