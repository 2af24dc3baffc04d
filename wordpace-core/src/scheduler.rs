use crate::{Algorithm, Card, Quality, Review, EF_MIN, LEARNING_STEPS};
use chrono::{DateTime, Duration, Utc};

/// Scheduling fields recomputed for one review. The caller persists these
/// back onto the stored card.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewOutcome {
    /// Days until the next review; fractional for learning steps.
    pub new_interval: f32,
    pub new_ease_factor: f32,
    pub new_repetitions: u32,
    pub next_review: DateTime<Utc>,
}

/// A scheduling algorithm. Cards pick their strategy via their `algorithm`
/// tag, so variants can coexist in one collection.
pub trait SchedulingStrategy: Send + Sync {
    /// Pure computation over the card's current scheduling state. Does not
    /// touch lapses or history; `apply_review` owns that part of the contract.
    fn next_review(&self, card: &Card, quality: Quality, now: DateTime<Utc>) -> ReviewOutcome;
}

pub struct Sm2;

fn floor_ef(x: f32) -> f32 {
    x.max(EF_MIN)
}

impl SchedulingStrategy for Sm2 {
    fn next_review(&self, card: &Card, quality: Quality, now: DateTime<Utc>) -> ReviewOutcome {
        let q = quality.as_score();
        let reps = card.repetitions as usize;

        let new_interval;
        let new_ease_factor;
        let new_repetitions;

        if q < 3 {
            // Failed: back to the first learning step.
            new_interval = LEARNING_STEPS[0];
            new_ease_factor = floor_ef(card.ease_factor - 0.2);
            new_repetitions = 0;
        } else {
            new_interval = if reps == 0 {
                LEARNING_STEPS[(reps + 1).min(LEARNING_STEPS.len() - 1)]
            } else if reps == 1 {
                if reps + 1 < LEARNING_STEPS.len() {
                    LEARNING_STEPS[reps + 1]
                } else {
                    // No further learning step: graduate at one day.
                    1.0
                }
            } else {
                // Graduated (repetitions >= 2): interval grows by the ease
                // factor. Note the review bucket boundary is >= 3.
                (card.interval_days * card.ease_factor).round()
            };
            new_repetitions = card.repetitions + 1;

            let miss = (5 - q) as f32;
            new_ease_factor = floor_ef(card.ease_factor + (0.1 - miss * (0.08 + miss * 0.02)));
        }

        ReviewOutcome {
            new_interval,
            new_ease_factor,
            new_repetitions,
            next_review: now + interval_duration(new_interval),
        }
    }
}

impl Algorithm {
    pub fn strategy(&self) -> &'static dyn SchedulingStrategy {
        match self {
            Algorithm::Sm2 => &Sm2,
        }
    }
}

/// Fractional-day interval to a chrono duration. Millisecond granularity
/// keeps the 10-minute learning step exact.
pub fn interval_duration(days: f32) -> Duration {
    Duration::milliseconds((days as f64 * 86_400_000.0).round() as i64)
}

pub struct ScheduleOutcome {
    pub updated_card: Card,
    pub review: Review,
}

/// Applies one rated review to a card copy: runs the card's strategy, then
/// settles the rest of the update (lapse count on failure, history append,
/// review timestamp, recomputed scheduling fields). Persisting the returned
/// card and review row stays with the caller.
pub fn apply_review(mut card: Card, quality: Quality) -> ScheduleOutcome {
    let now = Utc::now();
    let out = card.algorithm.strategy().next_review(&card, quality, now);

    if !quality.is_pass() {
        card.lapses += 1;
    }
    card.repetitions = out.new_repetitions;
    card.interval_days = out.new_interval;
    card.ease_factor = out.new_ease_factor;
    card.due_at = out.next_review;
    card.quality_history.push(quality);
    card.last_reviewed_at = Some(now);

    let review = Review::new(card.id, quality, now, out.new_interval, out.new_ease_factor);

    ScheduleOutcome {
        updated_card: card,
        review,
    }
}
