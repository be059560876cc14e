//! End-to-end checks on the day cycle: segment ordering, skip rules, the
//! forced-rest floors, and stat bounds across multiple played days.

use sim_core::day::DaySegment;
use sim_core::stats::{PlayerStats, StatDelta};
use sim_core::testing::{assert_bounded, assert_segment, TestHarness};
use sim_core::{HeadlessConfig, HeadlessGame};

#[test]
fn segments_always_follow_the_fixed_order() {
    let mut harness = TestHarness::offline();
    let mut previous = harness.session.segment();
    assert_eq!(previous, DaySegment::Dawn);

    // Three full days, advancing by skip-or-tick only.
    for _ in 0..(3 * DaySegment::ORDER.len()) {
        let change = match harness.session.skip() {
            Some(change) => change,
            None => loop {
                if let Some(change) = harness.session.tick(60.0) {
                    break change;
                }
            },
        };
        assert_eq!(change.from, previous);
        assert_eq!(change.to, previous.successor());
        previous = change.to;
    }
    assert_eq!(harness.session.day_number(), 4);
    assert_segment(&harness.session, DaySegment::Dawn);
}

#[test]
fn skip_does_not_touch_non_skippable_segments() {
    let mut harness = TestHarness::offline();
    harness.skip_to(DaySegment::Morning);

    harness.session.tick(10.0);
    assert!(harness.session.skip().is_none());
    assert_segment(&harness.session, DaySegment::Morning);
}

#[test]
fn low_energy_in_the_afternoon_forces_rest() {
    let mut harness = TestHarness::offline();
    harness.skip_to(DaySegment::Afternoon);

    harness.session.stats_mut().set_stats_for_test(PlayerStats {
        energy: 4,
        ..PlayerStats::default()
    });
    let change = harness.session.tick(0.1).expect("floor transition");
    assert_eq!(change.to, DaySegment::Sleep);
    let summary = change.summary.expect("sleep carries a summary");
    assert!(summary.forced_rest);
    assert!(harness.session.events().was_triggered_today("forced_rest"));
    assert_eq!(harness.session.events().total_occurrences("forced_rest"), 1);
}

#[test]
fn low_mood_in_the_evening_forces_rest() {
    let mut harness = TestHarness::offline();
    harness.skip_to(DaySegment::Evening);

    harness.session.stats_mut().set_stats_for_test(PlayerStats {
        mood: 10,
        ..PlayerStats::default()
    });
    let change = harness.session.tick(0.1).expect("floor transition");
    assert_eq!(change.to, DaySegment::Sleep);
}

#[test]
fn overnight_recovery_is_applied_and_clamped() {
    let mut harness = TestHarness::offline();
    harness.session.stats_mut().set_stats_for_test(PlayerStats {
        energy: 95,
        mood: 98,
        hunger: 3,
        ..PlayerStats::default()
    });
    harness.skip_to(DaySegment::Sleep);
    harness.session.skip().expect("sleep is skippable");

    assert_eq!(harness.session.day_number(), 2);
    // energy 95 + 30 and mood 98 + 5 clamp at 100; hunger 3 - 8 clamps at 0.
    assert_eq!(harness.session.stats().energy(), 100);
    assert_eq!(harness.session.stats().mood(), 100);
    assert_eq!(harness.session.stats().hunger(), 0);
    assert_bounded(harness.session.stats());
}

#[test]
fn starving_days_compound_mood_losses() {
    let mut harness = TestHarness::offline();
    harness.session.stats_mut().set_stats_for_test(PlayerStats {
        mood: 40,
        hunger: 5,
        ..PlayerStats::default()
    });
    harness
        .session
        .stats_mut()
        .apply(&StatDelta::new().mood(-10));
    // -10 scaled by 1.5 below the hunger threshold.
    assert_eq!(harness.session.stats().mood(), 25);
}

#[tokio::test]
async fn a_week_of_headless_play_stays_in_bounds() {
    let harness = TestHarness::offline();
    let mut game = HeadlessGame::with_session(
        harness.session,
        HeadlessConfig {
            days: 7,
            save_path: None,
            chat: true,
        },
    );
    game.run().await.expect("seven quiet days");

    assert_eq!(game.session().day_number(), 8);
    assert_bounded(game.session().stats());
    // Playing the quiz every morning has to move German along.
    assert!(game.session().stats().german().level > 1);
}
