use crate::{queue, Card, CardId, Quality, Review, UserId};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default)]
pub struct Totals {
    pub total: u32,
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl Totals {
    pub fn record(&mut self, q: &Quality) {
        self.total += 1;
        match q {
            Quality::Again => self.again += 1,
            Quality::Hard => self.hard += 1,
            Quality::Good => self.good += 1,
            Quality::Easy => self.easy += 1,
        }
    }

    /// Passed reviews (quality >= 3) over all reviews.
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.good + self.easy) as f32 / self.total as f32
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StatsSummary {
    pub totals: Totals,
    pub per_day: BTreeMap<NaiveDate, Totals>,
}

pub fn summarize(reviews: &[Review]) -> StatsSummary {
    let mut summary = StatsSummary::default();
    for r in reviews {
        summary.totals.record(&r.quality);
        let d = r.reviewed_at.date_naive();
        summary.per_day.entry(d).or_default().record(&r.quality);
    }
    summary
}

pub fn daily_streak(reviews: &[Review], today: NaiveDate) -> u32 {
    let per_day = summarize(reviews).per_day;
    let mut streak = 0u32;
    let mut day = today;
    loop {
        if per_day.get(&day).map(|t| t.total > 0).unwrap_or(false) {
            streak += 1;
            day -= Duration::days(1);
        } else {
            break;
        }
    }
    streak
}

pub fn per_user_totals(
    reviews: &[Review],
    card_to_user: &HashMap<CardId, UserId>,
) -> HashMap<UserId, Totals> {
    let mut map: HashMap<UserId, Totals> = HashMap::new();
    for r in reviews {
        if let Some(user_id) = card_to_user.get(&r.card_id) {
            map.entry(*user_id).or_default().record(&r.quality);
        }
    }
    map
}

/// The numbers shown before a session starts: how many cards sit in each
/// selection bucket right now.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub new_count: usize,
    pub learning: usize,
    pub review: usize,
    pub due: usize,
}

pub fn queue_counts(cards: &[Card], now: DateTime<Utc>, max_new: usize) -> QueueCounts {
    QueueCounts {
        new_count: queue::new_cards(cards, max_new).len(),
        learning: queue::learning_cards(cards).len(),
        review: queue::review_cards(cards).len(),
        due: queue::due_cards(cards, now).len(),
    }
}
