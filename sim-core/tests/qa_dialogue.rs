//! Dialogue engine behavior across the backend seam: disabled-backend
//! stubs, generated replies, timeout fallback, cancellation, and the
//! denylist policy.

use sim_core::dialogue::LineSource;
use sim_core::testing::{MockBackend, TestHarness};
use sim_core::ConfigStore;
use std::time::{Duration, Instant};

async fn wait_for_reply(harness: &mut TestHarness, max: Duration) -> Vec<sim_core::SpokenLine> {
    let start = Instant::now();
    while start.elapsed() < max {
        tokio::time::sleep(Duration::from_millis(25)).await;
        let lines = harness.session.poll();
        if !lines.is_empty() {
            return lines;
        }
        if !harness.session.reply_pending() {
            break;
        }
    }
    Vec::new()
}

#[test]
fn disabled_backend_answers_inline_and_never_blocks() {
    // Plain #[test]: no runtime exists, so this also proves the disabled
    // path spawns nothing.
    let mut harness = TestHarness::offline();
    let line = harness
        .session
        .say("zara", "did you see that")
        .expect("inline reply");
    assert_eq!(line.source, LineSource::Fallback);
    assert!(!line.text.is_empty());
    assert!(!harness.session.reply_pending());
    assert_eq!(harness.backend.call_count(), 0);
}

#[tokio::test]
async fn generated_reply_arrives_through_poll() {
    let mut harness = TestHarness::with_backend(MockBackend::scripted(["ok but have you slept"]));
    let before = harness.session.stats().relationship("zara");

    let inline = harness.session.say("zara", "long day");
    assert!(inline.is_none(), "enabled backend replies asynchronously");

    let lines = wait_for_reply(&mut harness, Duration::from_secs(2)).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source, LineSource::Generated);
    assert_eq!(lines[0].text, "ok but have you slept");
    // A reply warms the friendship.
    assert_eq!(harness.session.stats().relationship("zara"), before + 2);
}

#[tokio::test]
async fn failing_backend_retries_once_then_falls_back() {
    let mut harness = TestHarness::with_backend(MockBackend::always_fail());
    harness.session.say("zara", "hello?");

    let lines = wait_for_reply(&mut harness, Duration::from_secs(2)).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source, LineSource::Fallback);
    assert!(!lines[0].text.is_empty());
    assert_eq!(harness.backend.call_count(), 2, "exactly one retry");
}

#[tokio::test]
async fn unresponsive_backend_times_out_into_fallback() {
    // Harness timeout is 1s. A hung call gets no retry, so the fallback
    // must land within the timeout plus polling slack.
    let mut harness = TestHarness::with_backend(MockBackend::never_responds());
    let start = Instant::now();
    harness.session.say("zara", "are you there");

    let lines = wait_for_reply(&mut harness, Duration::from_secs(5)).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source, LineSource::Fallback);
    assert!(
        start.elapsed() < Duration::from_millis(1500),
        "fallback took {:?}",
        start.elapsed()
    );
    assert_eq!(harness.backend.call_count(), 1, "timeouts are not retried");
}

#[tokio::test]
async fn cancelled_request_discards_the_late_result() {
    let mut harness = TestHarness::with_backend(MockBackend::scripted(["too late"]));
    let before = harness.session.stats().relationship("zara");
    harness.session.say("zara", "never mind");
    // Closing the conversation invalidates the in-flight request.
    harness.session.close_dialogue();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let lines = harness.session.poll();
    assert!(lines.is_empty(), "stale result must be dropped");
    assert_eq!(harness.session.stats().relationship("zara"), before);
}

#[tokio::test]
async fn denylisted_reply_is_substituted_and_recorded() {
    let mut config = ConfigStore::builtin();
    config.ai.denylist = vec!["fryer grease".to_string()];
    let mut harness = TestHarness::with_config(
        config,
        MockBackend::scripted(["drink the Fryer Grease, it builds character"]),
    );
    harness.session.say("zara", "any advice");

    let lines = wait_for_reply(&mut harness, Duration::from_secs(2)).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source, LineSource::Fallback);
    assert!(!lines[0].text.to_lowercase().contains("fryer grease"));

    let hits = harness.session.policy_hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].matched, "fryer grease");
}

#[tokio::test]
async fn long_replies_are_truncated_to_the_cap() {
    let mut config = ConfigStore::builtin();
    config.ai.max_reply_chars = 20;
    let mut harness = TestHarness::with_config(
        config,
        MockBackend::scripted(["a very long reply that rambles on far past the cap"]),
    );
    harness.session.say("zara", "tell me everything");

    let lines = wait_for_reply(&mut harness, Duration::from_secs(2)).await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].text.chars().count() <= 20, "got: {}", lines[0].text);
}

#[test]
fn ignored_friends_leave_messages_on_read() {
    let mut harness = TestHarness::offline();
    for _ in 0..10 {
        harness.session.stats_mut().relationship_delta("lukas", -5);
    }
    let line = harness.session.say("lukas", "hey").expect("inline");
    assert_eq!(line.text, "...");
    assert!(harness
        .session
        .events()
        .was_triggered_today("ignored_by:lukas"));
}

#[test]
fn scripted_conversation_expands_state_into_lines() {
    let mut harness = TestHarness::offline();
    let turn = harness.session.talk("mom.neutral").expect("builtin node");
    assert_eq!(turn.speaker, "Mom");
    assert!(turn.lines[0].contains("day 1"));
    assert!(!turn.choices.is_empty());

    let next = harness
        .session
        .choose(&turn.choices[0].id)
        .expect("valid choice")
        .expect("leads somewhere");
    assert_eq!(next.node_id, "mom.goodnight");
}
