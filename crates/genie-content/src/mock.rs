//! Mock Content Provider
//!
//! For testing and offline development. Returns a canned bundle with
//! the exact contract shape, or a canned failure when configured to.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use genie_core::{
    error::{GenieError, Result},
    generation::{ContentBundle, GenerationInput, ScheduleSlot, HASHTAG_COUNT, POST_COUNT},
    provider::ContentProvider,
};

/// Mock provider with a canned bundle and a failure toggle
pub struct MockProvider {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a provider whose every call fails
    pub fn failing() -> Self {
        let provider = Self::new();
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    /// Toggle failure behavior at runtime
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many times `generate` was invoked
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The canned bundle, themed on the request input
    fn canned_bundle(input: &GenerationInput) -> ContentBundle {
        let schedule = [
            ("Monday", "8:00 PM", "Post 1"),
            ("Tuesday", "12:00 PM", "Post 2"),
            ("Wednesday", "6:00 PM", "Post 3"),
            ("Thursday", "10:00 AM", "Post 4"),
            ("Friday", "7:00 PM", "Post 5"),
            ("Saturday", "2:00 PM", "Repost best performing content"),
            ("Sunday", "11:00 AM", "Behind-the-scenes content"),
        ];

        ContentBundle {
            posts: (1..=POST_COUNT)
                .map(|i| {
                    format!(
                        "Post {i}: {} insights on {} in a {} voice.",
                        input.niche, input.topic, input.tone
                    )
                })
                .collect(),
            hashtags: (1..=HASHTAG_COUNT)
                .map(|i| format!("#{}{i}", input.niche.replace(' ', "")))
                .collect(),
            schedule: schedule
                .iter()
                .map(|(day, time, post)| ScheduleSlot {
                    day: (*day).into(),
                    time: (*time).into(),
                    post: (*post).into(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn generate(&self, input: &GenerationInput) -> Result<ContentBundle> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(GenieError::Provider("mock provider failure".into()));
        }

        Ok(Self::canned_bundle(input))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail.load(Ordering::SeqCst))
    }
}
