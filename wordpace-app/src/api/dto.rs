use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wordpace_core::{Card, Quality, QueueCounts};

#[derive(Serialize)]
pub struct CardOut {
    pub id: Uuid,
    pub vocab_id: Uuid,
    pub user_id: Uuid,
    pub algorithm: String,
    pub repetitions: u32,
    pub interval_days: f32,
    pub ease_factor: f32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub lapses: u32,
    pub suspended: bool,
}

impl From<Card> for CardOut {
    fn from(c: Card) -> Self {
        Self {
            id: c.id,
            vocab_id: c.vocab_id,
            user_id: c.user_id,
            algorithm: c.algorithm.as_str().to_string(),
            repetitions: c.repetitions,
            interval_days: c.interval_days,
            ease_factor: c.ease_factor,
            due_at: c.due_at,
            last_reviewed_at: c.last_reviewed_at,
            lapses: c.lapses,
            suspended: c.suspended,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateCardIn {
    pub user_id: Uuid,
    pub vocab_id: Uuid,
}

#[derive(Deserialize)]
pub struct ReviewIn {
    pub card_id: Uuid,
    pub quality: String,
}

#[derive(Deserialize)]
pub struct SuspendIn {
    pub suspended: bool,
}

#[derive(Serialize)]
pub struct QueueOut {
    pub new_count: usize,
    pub learning: usize,
    pub review: usize,
    pub due: usize,
}

impl From<QueueCounts> for QueueOut {
    fn from(c: QueueCounts) -> Self {
        Self {
            new_count: c.new_count,
            learning: c.learning,
            review: c.review,
            due: c.due,
        }
    }
}

pub fn parse_quality(s: &str) -> Option<Quality> {
    match s.to_lowercase().as_str() {
        "1" | "a" | "again" => Some(Quality::Again),
        "2" | "h" | "hard" => Some(Quality::Hard),
        "3" | "g" | "good" => Some(Quality::Good),
        "4" | "e" | "easy" => Some(Quality::Easy),
        _ => None,
    }
}
