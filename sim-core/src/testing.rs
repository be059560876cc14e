//! Test doubles and helpers.
//!
//! `MockBackend` stands in for the generation client so dialogue tests can
//! script replies, fail on demand, or hang forever to exercise the timeout
//! path. `TestHarness` bundles a session wired to a mock with built-in
//! config. Used by the integration tests; handy for downstream consumers
//! too, so it lives in the crate proper.

use crate::balance::ConfigStore;
use crate::day::DaySegment;
use crate::dialogue::TextBackend;
use crate::session::GameSession;
use crate::stats::{StatStore, STAT_MAX, STAT_MIN};
use localai::GenerateRequest;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

enum Mode {
    /// Pop scripted replies in order; empty script reports an empty
    /// completion.
    Scripted,
    /// Every call fails with a network error.
    AlwaysFail,
    /// Never completes. For timeout tests.
    Never,
}

/// A scriptable [`TextBackend`].
pub struct MockBackend {
    enabled: bool,
    mode: Mode,
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<u32>,
}

impl MockBackend {
    pub fn scripted(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            mode: Mode::Scripted,
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn always_fail() -> Self {
        Self {
            enabled: true,
            mode: Mode::AlwaysFail,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn never_responds() -> Self {
        Self {
            enabled: true,
            mode: Mode::Never,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            mode: Mode::Scripted,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// How many generate calls have been issued (retries included).
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl TextBackend for MockBackend {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn generate<'a>(
        &'a self,
        _request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, localai::Error>> + Send + 'a>> {
        *self.calls.lock().unwrap() += 1;
        Box::pin(async move {
            match self.mode {
                Mode::Scripted => self
                    .replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or(localai::Error::Empty),
                Mode::AlwaysFail => Err(localai::Error::Network("mock failure".to_string())),
                Mode::Never => std::future::pending().await,
            }
        })
    }
}

/// A session wired to a mock backend and built-in config.
pub struct TestHarness {
    pub session: GameSession,
    pub backend: Arc<MockBackend>,
}

impl TestHarness {
    /// Backend disabled; everything resolves synchronously.
    pub fn offline() -> Self {
        Self::with_backend(MockBackend::disabled())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let mut config = ConfigStore::builtin();
        config.ai.backend.enabled = backend.enabled;
        // Keep async tests fast.
        config.ai.backend.timeout_secs = 1;
        Self::with_config(config, backend)
    }

    pub fn with_config(config: ConfigStore, backend: MockBackend) -> Self {
        let backend = Arc::new(backend);
        let session = GameSession::with_backend(config, Arc::clone(&backend) as Arc<dyn TextBackend>);
        Self { session, backend }
    }

    /// Skip forward until the session sits in the given segment. Panics if
    /// a non-skippable segment blocks the way; tick through those instead.
    pub fn skip_to(&mut self, segment: DaySegment) {
        for _ in 0..DaySegment::ORDER.len() {
            if self.session.segment() == segment {
                return;
            }
            if self.session.skip().is_none() {
                // Non-skippable; burn the clock.
                let remaining = 1e9;
                self.session.tick(remaining);
            }
        }
        assert_eq!(self.session.segment(), segment, "never reached {segment:?}");
    }
}

#[track_caller]
pub fn assert_segment(session: &GameSession, expected: DaySegment) {
    assert_eq!(
        session.segment(),
        expected,
        "expected segment {:?}, found {:?} on day {}",
        expected,
        session.segment(),
        session.day_number()
    );
}

/// Assert every bounded stat is inside its range. Cheap enough to sprinkle
/// after any sequence of mutations.
#[track_caller]
pub fn assert_bounded(stats: &StatStore) {
    let s = stats.stats();
    for (name, value) in [("mood", s.mood), ("hunger", s.hunger), ("energy", s.energy)] {
        assert!(
            (STAT_MIN..=STAT_MAX).contains(&value),
            "{name} out of range: {value}"
        );
    }
    assert!(s.money_cents >= 0, "negative wallet: {}", s.money_cents);
    assert!(
        (STAT_MIN..=STAT_MAX).contains(&stats.mom()),
        "mom relationship out of range"
    );
    for (id, score) in &stats.relationships().friends {
        assert!(
            (STAT_MIN..=STAT_MAX).contains(score),
            "relationship {id} out of range: {score}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_to_crosses_non_skippable_segments() {
        let mut harness = TestHarness::offline();
        harness.skip_to(DaySegment::Night);
        assert_segment(&harness.session, DaySegment::Night);
        assert_bounded(harness.session.stats());
    }

    #[tokio::test]
    async fn test_scripted_backend_pops_in_order() {
        let backend = MockBackend::scripted(["first", "second"]);
        let request = GenerateRequest::new("", "hi");
        assert_eq!(backend.generate(&request).await.unwrap(), "first");
        assert_eq!(backend.generate(&request).await.unwrap(), "second");
        assert!(backend.generate(&request).await.is_err());
        assert_eq!(backend.call_count(), 3);
    }
}
