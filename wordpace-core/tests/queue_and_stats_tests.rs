use chrono::{Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;
use wordpace_core::{
    daily_streak, due_cards, is_due, learning_cards, new_cards, per_user_totals, queue_counts,
    review_cards, summarize, Algorithm, Card, Quality, Review, DEFAULT_NEW_LIMIT,
};

fn card_for(user: Uuid) -> Card {
    Card::new(user, Uuid::new_v4(), Algorithm::Sm2)
}

#[test]
fn due_selection_is_exact() {
    let user = Uuid::new_v4();
    let now = Utc::now();

    let mut past = card_for(user);
    past.repetitions = 3;
    past.due_at = now - Duration::hours(1);

    let mut future = card_for(user);
    future.repetitions = 3;
    future.due_at = now + Duration::hours(1);

    assert!(is_due(&past, now));
    assert!(!is_due(&future, now));

    let v = vec![past.clone(), future.clone()];
    let due = due_cards(&v, now);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, past.id);
}

#[test]
fn due_selection_does_not_consult_suspension() {
    // A suspended card whose timestamp has passed still shows up in the due
    // set; session builders filter on top.
    let user = Uuid::new_v4();
    let now = Utc::now();

    let mut suspended = card_for(user);
    suspended.due_at = now - Duration::hours(2);
    suspended.suspended = true;

    let due = due_cards(&[suspended.clone()], now);
    assert_eq!(due.len(), 1);
}

#[test]
fn new_cards_cap_and_order() {
    let user = Uuid::new_v4();
    let mut v = Vec::new();
    for _ in 0..25 {
        v.push(card_for(user));
    }
    let mut shelved = card_for(user);
    shelved.suspended = true;
    v.insert(3, shelved);

    let picked = new_cards(&v, DEFAULT_NEW_LIMIT);
    assert_eq!(picked.len(), 20);
    assert!(picked.iter().all(|c| c.repetitions == 0 && !c.suspended));

    // Input order preserved; the suspended card at index 3 is skipped.
    let expected: Vec<_> = v
        .iter()
        .filter(|c| !c.suspended)
        .take(20)
        .map(|c| c.id)
        .collect();
    let got: Vec<_> = picked.iter().map(|c| c.id).collect();
    assert_eq!(got, expected);
}

#[test]
fn bucket_boundary_at_two_repetitions() {
    // repetitions == 2 is graduated for interval math but still bucketed as
    // learning; selection only treats >= 3 as review.
    let user = Uuid::new_v4();
    let mut boundary = card_for(user);
    boundary.repetitions = 2;

    let v = vec![boundary.clone()];
    assert_eq!(learning_cards(&v).len(), 1);
    assert_eq!(review_cards(&v).len(), 0);
}

#[test]
fn buckets_split_by_repetitions_and_suspension() {
    let user = Uuid::new_v4();

    let fresh = card_for(user);
    let mut learning = card_for(user);
    learning.repetitions = 1;
    let mut graduated = card_for(user);
    graduated.repetitions = 3;
    let mut shelved = card_for(user);
    shelved.repetitions = 3;
    shelved.suspended = true;

    let v = vec![
        fresh.clone(),
        learning.clone(),
        graduated.clone(),
        shelved.clone(),
    ];

    assert_eq!(new_cards(&v, DEFAULT_NEW_LIMIT).len(), 1);
    assert_eq!(learning_cards(&v).len(), 1);
    assert_eq!(review_cards(&v).len(), 1);
}

#[test]
fn queue_counts_match_buckets() {
    let user = Uuid::new_v4();

    let fresh = card_for(user);
    let mut learning = card_for(user);
    let mut graduated = card_for(user);

    let now = Utc::now();
    learning.repetitions = 2;
    learning.due_at = now + Duration::days(1);
    graduated.repetitions = 4;
    graduated.due_at = now - Duration::days(1);

    let v = vec![fresh, learning, graduated];
    let counts = queue_counts(&v, now, DEFAULT_NEW_LIMIT);
    assert_eq!(counts.new_count, 1);
    assert_eq!(counts.learning, 1);
    assert_eq!(counts.review, 1);
    // The fresh card is due at creation, the graduated one overdue.
    assert_eq!(counts.due, 2);
}

#[test]
fn stats_totals_accuracy_and_streak() {
    let user = Uuid::new_v4();
    let card = card_for(user);
    let now = Utc::now();

    let r0 = Review::new(card.id, Quality::Easy, now - Duration::days(2), 1.0, 2.6);
    let r1 = Review::new(card.id, Quality::Good, now - Duration::days(1), 2.0, 2.6);
    let r2 = Review::new(card.id, Quality::Again, now, 10.0 / 1440.0, 2.4);

    let s = summarize(&[r0.clone(), r1.clone(), r2.clone()]);
    assert_eq!(s.totals.total, 3);
    assert_eq!(s.totals.again, 1);
    assert_eq!(s.totals.good, 1);
    assert_eq!(s.totals.easy, 1);
    assert!((s.totals.accuracy() - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(s.per_day.len(), 3);

    let streak = daily_streak(&[r0, r1, r2], now.date_naive());
    assert_eq!(streak, 3);
}

#[test]
fn per_user_totals_group_by_owner() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a_card = card_for(alice);
    let b_card = card_for(bob);
    let now = Utc::now();

    let reviews = vec![
        Review::new(a_card.id, Quality::Good, now, 1.0, 2.5),
        Review::new(a_card.id, Quality::Again, now, 10.0 / 1440.0, 2.3),
        Review::new(b_card.id, Quality::Easy, now, 1.0, 2.6),
    ];
    let card_to_user: HashMap<_, _> = vec![(a_card.id, alice), (b_card.id, bob)]
        .into_iter()
        .collect();

    let map = per_user_totals(&reviews, &card_to_user);
    assert_eq!(map[&alice].total, 2);
    assert_eq!(map[&bob].total, 1);
    assert_eq!(map[&bob].easy, 1);
}
