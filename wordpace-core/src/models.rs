use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CardId = Uuid;
pub type VocabId = Uuid;
pub type UserId = Uuid;
pub type ReviewId = Uuid;

pub const EF_MIN: f32 = 1.3;
pub const EF_DEFAULT: f32 = 2.5;

/// Fixed learning steps in days: 10 minutes, then 1 day.
pub const LEARNING_STEPS: [f32; 2] = [10.0 / 1440.0, 1.0];

/// Cap applied when callers select new cards without an explicit limit.
pub const DEFAULT_NEW_LIMIT: usize = 20;

/// Learner rating for a completed review. Scores 1-2 fail, 3-4 pass.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Again,
    Hard,
    Good,
    Easy,
}

impl Quality {
    pub fn as_score(&self) -> i32 {
        match self {
            Quality::Again => 1,
            Quality::Hard => 2,
            Quality::Good => 3,
            Quality::Easy => 4,
        }
    }

    pub fn from_score(score: i32) -> Option<Self> {
        match score {
            1 => Some(Quality::Again),
            2 => Some(Quality::Hard),
            3 => Some(Quality::Good),
            4 => Some(Quality::Easy),
            _ => None,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.as_score() >= 3
    }
}

/// Tag selecting the scheduling strategy that governs a card.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Sm2,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sm2 => "sm2",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "sm2" => Some(Algorithm::Sm2),
            _ => None,
        }
    }
}

/// Per-user, per-vocabulary-item scheduling record. Vocabulary content lives
/// in an external catalog; `vocab_id` is opaque here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub vocab_id: VocabId,
    pub user_id: UserId,
    pub algorithm: Algorithm,

    pub repetitions: u32,
    /// Current gap in days. Fractional for learning steps (10 min = 10/1440).
    pub interval_days: f32,
    pub ease_factor: f32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub lapses: u32,
    /// Every rating ever submitted, oldest first. Append-only.
    pub quality_history: Vec<Quality>,
    pub suspended: bool,

    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(user_id: UserId, vocab_id: VocabId, algorithm: Algorithm) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vocab_id,
            user_id,
            algorithm,
            repetitions: 0,
            interval_days: 0.0,
            ease_factor: EF_DEFAULT,
            due_at: now,
            last_reviewed_at: None,
            lapses: 0,
            quality_history: Vec::new(),
            suspended: false,
            created_at: now,
        }
    }

    pub fn is_new(&self) -> bool {
        self.repetitions == 0
    }
}

/// One applied review, appended per card.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub card_id: CardId,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
    pub interval_applied: f32,
    pub ef_after: f32,
}

impl Review {
    pub fn new(
        card_id: CardId,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
        interval_applied: f32,
        ef_after: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            quality,
            reviewed_at,
            interval_applied,
            ef_after,
        }
    }
}
