use chrono::{DateTime, Utc};
use duet_llm::UsageStats;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::Phase;

/// Outcome of one stage that reached its end-of-stream marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub phase: Phase,
    pub full_text: String,
    /// Absent when the provider never reported usage
    pub usage: Option<UsageStats>,
    pub elapsed: Duration,
}

/// Summed usage across both stages.
///
/// Stages without usage contribute zero and are listed in `unavailable`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateUsage {
    pub usage: UsageStats,
    pub unavailable: Vec<Phase>,
}

impl AggregateUsage {
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// Result of a successful composite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub reasoning: StageResult,
    pub answer: StageResult,
    pub total_elapsed: Duration,
}

impl CompositeResult {
    pub fn usage(&self) -> AggregateUsage {
        let mut aggregate = AggregateUsage::default();
        for stage in [&self.reasoning, &self.answer] {
            match stage.usage {
                Some(usage) => aggregate.usage += usage,
                None => aggregate.unavailable.push(stage.phase),
            }
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(phase: Phase, usage: Option<UsageStats>) -> StageResult {
        StageResult {
            phase,
            full_text: String::new(),
            usage,
            elapsed: Duration::from_millis(5),
        }
    }

    fn result(reasoning: Option<UsageStats>, answer: Option<UsageStats>) -> CompositeResult {
        CompositeResult {
            run_id: "run_1".to_string(),
            started_at: Utc::now(),
            reasoning: stage(Phase::Reasoning, reasoning),
            answer: stage(Phase::Answer, answer),
            total_elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_usage_sums_both_stages() {
        let aggregate = result(
            Some(UsageStats::new(10, 100, 110)),
            Some(UsageStats::new(120, 20, 140)),
        )
        .usage();

        assert_eq!(aggregate.usage, UsageStats::new(130, 120, 250));
        assert!(aggregate.is_complete());
    }

    #[test]
    fn test_missing_usage_is_reported() {
        let aggregate = result(Some(UsageStats::new(10, 100, 110)), None).usage();

        assert_eq!(aggregate.usage.total_tokens, 110);
        assert_eq!(aggregate.unavailable, vec![Phase::Answer]);
    }
}
