pub mod args;
pub mod render;

pub use args::{CliArgs, OutputMode};
pub use render::{Render, SseRenderer, TextRenderer};
