use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token accounting reported by a provider at the end of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl UsageStats {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

impl Add for UsageStats {
    type Output = UsageStats;

    fn add(self, rhs: UsageStats) -> UsageStats {
        UsageStats {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

impl AddAssign for UsageStats {
    fn add_assign(&mut self, rhs: UsageStats) {
        *self = *self + rhs;
    }
}
