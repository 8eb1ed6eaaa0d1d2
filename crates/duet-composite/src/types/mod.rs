pub mod events;
pub mod result;

pub use events::{CompositeEvent, Phase, StreamChunk};
pub use result::{AggregateUsage, CompositeResult, StageResult};
