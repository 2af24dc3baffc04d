use chrono::{Duration, Utc};
use uuid::Uuid;
use wordpace_core::{
    apply_review, Algorithm, Card, Quality, SchedulingStrategy, Sm2, EF_MIN, LEARNING_STEPS,
};

fn fresh_card() -> Card {
    Card::new(Uuid::new_v4(), Uuid::new_v4(), Algorithm::Sm2)
}

#[test]
fn easy_from_new() {
    let card = fresh_card();
    let before = Utc::now();

    let out = apply_review(card, Quality::Easy);
    let c = out.updated_card;

    // First success jumps to the second learning step; the Easy delta is
    // exactly zero at q=4, so the ease factor stays at its default.
    assert_eq!(c.repetitions, 1);
    assert_eq!(c.interval_days, LEARNING_STEPS[1]);
    assert!((c.ease_factor - 2.5).abs() < 1e-6);
    assert!(c.due_at >= before + Duration::days(1));
    assert_eq!(c.quality_history, vec![Quality::Easy]);
    assert_eq!(c.lapses, 0);
    assert!(c.last_reviewed_at.is_some());
    assert!((out.review.interval_applied - 1.0).abs() < 1e-6);
}

#[test]
fn good_graduates_after_second_step() {
    let mut card = fresh_card();
    card.repetitions = 1;
    card.interval_days = 1.0;

    let out = apply_review(card, Quality::Good);
    let c = out.updated_card;

    // No learning step beyond index 1, so the card graduates at one day.
    assert_eq!(c.repetitions, 2);
    assert_eq!(c.interval_days, 1.0);
    assert!((c.ease_factor - 2.36).abs() < 1e-4);
}

#[test]
fn graduated_interval_grows_by_ease() {
    let mut card = fresh_card();
    card.repetitions = 3;
    card.interval_days = 6.0;

    let out = apply_review(card, Quality::Good);
    let c = out.updated_card;

    assert_eq!(c.repetitions, 4);
    assert_eq!(c.interval_days, (6.0f32 * 2.5).round());
    assert!((c.ease_factor - 2.36).abs() < 1e-4);
}

#[test]
fn failure_resets_to_ten_minute_step() {
    let mut card = fresh_card();
    card.repetitions = 3;
    card.interval_days = 6.0;
    card.ease_factor = 2.36;
    let before = Utc::now();

    let out = apply_review(card, Quality::Hard);
    let c = out.updated_card;

    assert_eq!(c.repetitions, 0);
    assert_eq!(c.interval_days, LEARNING_STEPS[0]);
    assert!((c.ease_factor - 2.16).abs() < 1e-4);
    assert_eq!(c.lapses, 1);
    // Sub-day precision: due again in ten minutes, not tomorrow.
    assert!(c.due_at >= before + Duration::minutes(10));
    assert!(c.due_at < before + Duration::minutes(11));
}

#[test]
fn again_from_any_state_resets() {
    let mut card = fresh_card();
    card.repetitions = 7;
    card.interval_days = 42.0;

    let out = apply_review(card, Quality::Again);
    let c = out.updated_card;

    assert_eq!(c.repetitions, 0);
    assert_eq!(c.interval_days, LEARNING_STEPS[0]);
    assert!((c.ease_factor - 2.3).abs() < 1e-5);
    assert_eq!(c.lapses, 1);
}

#[test]
fn ease_factor_never_drops_below_floor() {
    let mut card = fresh_card();
    let sequence = [
        Quality::Again,
        Quality::Again,
        Quality::Hard,
        Quality::Good,
        Quality::Again,
        Quality::Good,
        Quality::Hard,
        Quality::Again,
        Quality::Good,
        Quality::Easy,
    ];
    for q in sequence {
        let out = apply_review(card, q);
        card = out.updated_card;
        assert!(card.ease_factor >= EF_MIN);
    }
    assert_eq!(card.quality_history.len(), 10);
    assert_eq!(card.lapses, 6);
}

#[test]
fn good_success_at_floor_stays_at_floor() {
    let mut card = fresh_card();
    card.repetitions = 3;
    card.interval_days = 4.0;
    card.ease_factor = EF_MIN;

    // q=3 carries a -0.14 delta; the floor absorbs it.
    let out = apply_review(card, Quality::Good);
    assert_eq!(out.updated_card.ease_factor, EF_MIN);
}

#[test]
fn lapses_accumulate_across_failures() {
    let mut card = fresh_card();
    for expected in 1..=3u32 {
        let out = apply_review(card, Quality::Again);
        card = out.updated_card;
        assert_eq!(card.lapses, expected);
    }
    let out = apply_review(card, Quality::Good);
    // A success never decrements the lifetime count.
    assert_eq!(out.updated_card.lapses, 3);
}

#[test]
fn computation_reads_only_persisted_fields() {
    let mut reviewed = fresh_card();
    reviewed.repetitions = 2;
    reviewed.interval_days = 1.0;
    reviewed.ease_factor = 2.36;

    // A card rebuilt from just the persisted scheduling fields must produce
    // the same next computation: no hidden state.
    let mut rebuilt = Card::new(reviewed.user_id, reviewed.vocab_id, Algorithm::Sm2);
    rebuilt.repetitions = reviewed.repetitions;
    rebuilt.interval_days = reviewed.interval_days;
    rebuilt.ease_factor = reviewed.ease_factor;
    rebuilt.lapses = 5;
    rebuilt.quality_history = vec![Quality::Again, Quality::Good, Quality::Good];

    let now = Utc::now();
    let a = Sm2.next_review(&reviewed, Quality::Good, now);
    let b = Sm2.next_review(&rebuilt, Quality::Good, now);
    assert_eq!(a, b);
}

#[test]
fn strategy_resolves_from_algorithm_tag() {
    let card = fresh_card();
    let now = Utc::now();
    let via_tag = card.algorithm.strategy().next_review(&card, Quality::Good, now);
    let direct = Sm2.next_review(&card, Quality::Good, now);
    assert_eq!(via_tag, direct);
}
