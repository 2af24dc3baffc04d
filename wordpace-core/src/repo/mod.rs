use crate::{Algorithm, Card, CardId, CoreError, Review, UserId, VocabId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;

#[async_trait]
pub trait Repository: Send + Sync {
    // Cards
    async fn create_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
        algorithm: Algorithm,
    ) -> Result<Card, CoreError>;

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError>;
    async fn find_card(&self, user_id: UserId, vocab_id: VocabId)
        -> Result<Option<Card>, CoreError>;
    async fn list_cards(&self, user_id: Option<UserId>) -> Result<Vec<Card>, CoreError>;
    async fn update_card(&self, card: &Card) -> Result<Card, CoreError>;

    /// Persists a reviewed card only if the stored record's
    /// `last_reviewed_at` still matches `expected_last_review`. Racing review
    /// submissions for one card lose with `Conflict` instead of silently
    /// clobbering each other.
    async fn update_card_reviewed(
        &self,
        card: &Card,
        expected_last_review: Option<DateTime<Utc>>,
    ) -> Result<Card, CoreError>;

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError>;
    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError>;

    // Reviews
    async fn insert_review(&self, review: &Review) -> Result<(), CoreError>;
    async fn list_reviews_for_card(&self, card_id: CardId) -> Result<Vec<Review>, CoreError>;
    async fn list_reviews_for_user(&self, user_id: UserId) -> Result<Vec<Review>, CoreError>;
}
