use crate::Card;
use chrono::{DateTime, Utc};

pub fn is_due(card: &Card, now: DateTime<Utc>) -> bool {
    now >= card.due_at
}

/// Cards whose due timestamp has passed. Suspension is not consulted here;
/// suspended cards drop out of the new/learning/review buckets instead.
pub fn due_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    cards.iter().filter(|c| is_due(c, now)).cloned().collect()
}

/// Unseen cards, capped at `max_new`, input order preserved.
pub fn new_cards(cards: &[Card], max_new: usize) -> Vec<Card> {
    cards
        .iter()
        .filter(|c| c.repetitions == 0 && !c.suspended)
        .take(max_new)
        .cloned()
        .collect()
}

pub fn learning_cards(cards: &[Card]) -> Vec<Card> {
    cards
        .iter()
        .filter(|c| c.repetitions > 0 && c.repetitions < 3 && !c.suspended)
        .cloned()
        .collect()
}

pub fn review_cards(cards: &[Card]) -> Vec<Card> {
    cards
        .iter()
        .filter(|c| c.repetitions >= 3 && !c.suspended)
        .cloned()
        .collect()
}
