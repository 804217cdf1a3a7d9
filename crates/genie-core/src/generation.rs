//! Generation Records
//!
//! Validated request input, the provider's content bundle, and the
//! immutable record persisted after a successful generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::UserId;

/// Posts the provider must return per bundle
pub const POST_COUNT: usize = 5;

/// Hashtags the provider must return per bundle
pub const HASHTAG_COUNT: usize = 10;

/// Schedule slots (one per day of the week) per bundle
pub const SCHEDULE_SLOTS: usize = 7;

/// Validated input triple for a generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInput {
    pub niche: String,
    pub topic: String,
    pub tone: String,
}

impl GenerationInput {
    /// Trim each field independently; all three must be non-empty.
    /// Returns the name of the first blank field on failure.
    pub fn parse(niche: &str, topic: &str, tone: &str) -> Result<Self, &'static str> {
        let niche = niche.trim();
        if niche.is_empty() {
            return Err("niche");
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err("topic");
        }
        let tone = tone.trim();
        if tone.is_empty() {
            return Err("tone");
        }

        Ok(Self {
            niche: niche.into(),
            topic: topic.into(),
            tone: tone.into(),
        })
    }
}

/// One slot in the 7-day posting schedule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Day label (e.g. "Monday")
    pub day: String,

    /// Posting time (e.g. "8:00 PM")
    pub time: String,

    /// Which post to publish, or a standing instruction
    pub post: String,
}

/// Structured output of one provider call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub posts: Vec<String>,
    pub hashtags: Vec<String>,
    pub schedule: Vec<ScheduleSlot>,
}

impl ContentBundle {
    /// Check the bundle against the provider contract (5 posts, 10
    /// hashtags, 7 schedule slots). There are no partial results: a
    /// bundle either has exactly this shape or is unusable.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.posts.len() != POST_COUNT {
            return Err(format!(
                "expected {POST_COUNT} posts, got {}",
                self.posts.len()
            ));
        }
        if self.hashtags.len() != HASHTAG_COUNT {
            return Err(format!(
                "expected {HASHTAG_COUNT} hashtags, got {}",
                self.hashtags.len()
            ));
        }
        if self.schedule.len() != SCHEDULE_SLOTS {
            return Err(format!(
                "expected {SCHEDULE_SLOTS} schedule slots, got {}",
                self.schedule.len()
            ));
        }
        Ok(())
    }
}

/// Immutable record of a fulfilled generation. Created only by the gate
/// after a successful provider call; never updated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,

    /// Owning user
    pub user_id: UserId,

    /// What was asked for
    pub input: GenerationInput,

    /// What the provider returned
    pub bundle: ContentBundle,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new(
        user_id: UserId,
        input: GenerationInput,
        bundle: ContentBundle,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            input,
            bundle,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: &str) -> ScheduleSlot {
        ScheduleSlot {
            day: day.into(),
            time: "8:00 PM".into(),
            post: "Post 1".into(),
        }
    }

    #[test]
    fn test_parse_trims_fields() {
        let input = GenerationInput::parse("  fitness  ", " protein", "casual ").unwrap();
        assert_eq!(input.niche, "fitness");
        assert_eq!(input.topic, "protein");
        assert_eq!(input.tone, "casual");
    }

    #[test]
    fn test_parse_rejects_blank_fields() {
        assert_eq!(GenerationInput::parse("", "protein", "casual"), Err("niche"));
        assert_eq!(
            GenerationInput::parse("fitness", "   ", "casual"),
            Err("topic")
        );
        assert_eq!(GenerationInput::parse("fitness", "protein", ""), Err("tone"));
    }

    #[test]
    fn test_bundle_shape() {
        let bundle = ContentBundle {
            posts: vec!["p".into(); POST_COUNT],
            hashtags: vec!["#h".into(); HASHTAG_COUNT],
            schedule: (0..SCHEDULE_SLOTS).map(|_| slot("Monday")).collect(),
        };
        assert!(bundle.check_shape().is_ok());

        let short = ContentBundle {
            posts: vec!["p".into(); 3],
            ..bundle.clone()
        };
        assert!(short.check_shape().unwrap_err().contains("posts"));

        let thin = ContentBundle {
            hashtags: vec!["#h".into(); 2],
            ..bundle
        };
        assert!(thin.check_shape().unwrap_err().contains("hashtags"));
    }
}
