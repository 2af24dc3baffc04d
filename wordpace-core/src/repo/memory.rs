use crate::{Algorithm, Card, CardId, CoreError, Review, UserId, VocabId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryRepo {
    cards: RwLock<HashMap<CardId, Card>>,
    reviews: RwLock<HashMap<CardId, Vec<Review>>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::repo::Repository for MemoryRepo {
    async fn create_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
        algorithm: Algorithm,
    ) -> Result<Card, CoreError> {
        let card = Card::new(user_id, vocab_id, algorithm);
        let mut m = self.cards.write();
        if m.values()
            .any(|c| c.user_id == user_id && c.vocab_id == vocab_id)
        {
            return Err(CoreError::Conflict("card already exists for vocab item"));
        }
        m.insert(card.id, card.clone());
        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        self.cards
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn find_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
    ) -> Result<Option<Card>, CoreError> {
        Ok(self
            .cards
            .read()
            .values()
            .find(|c| c.user_id == user_id && c.vocab_id == vocab_id)
            .cloned())
    }

    async fn list_cards(&self, user_id: Option<UserId>) -> Result<Vec<Card>, CoreError> {
        let cards = self.cards.read();
        let mut v: Vec<Card> = cards.values().cloned().collect();
        if let Some(uid) = user_id {
            v.retain(|c| c.user_id == uid);
        }
        v.sort_by_key(|c| c.created_at);
        Ok(v)
    }

    async fn update_card(&self, card: &Card) -> Result<Card, CoreError> {
        let mut m = self.cards.write();
        if !m.contains_key(&card.id) {
            return Err(CoreError::NotFound("card"));
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn update_card_reviewed(
        &self,
        card: &Card,
        expected_last_review: Option<DateTime<Utc>>,
    ) -> Result<Card, CoreError> {
        let mut m = self.cards.write();
        let Some(current) = m.get(&card.id) else {
            return Err(CoreError::NotFound("card"));
        };
        if current.last_reviewed_at != expected_last_review {
            return Err(CoreError::Conflict("card reviewed concurrently"));
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        self.cards
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("card"))?;
        self.reviews.write().remove(&id);
        Ok(())
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let mut m = self.cards.write();
        let Some(card) = m.get_mut(&id) else {
            return Err(CoreError::NotFound("card"));
        };
        card.suspended = suspended;
        Ok(())
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        let mut m = self.reviews.write();
        m.entry(review.card_id).or_default().push(review.clone());
        Ok(())
    }

    async fn list_reviews_for_card(&self, card_id: CardId) -> Result<Vec<Review>, CoreError> {
        Ok(self
            .reviews
            .read()
            .get(&card_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_reviews_for_user(&self, user_id: UserId) -> Result<Vec<Review>, CoreError> {
        let ids: Vec<CardId> = {
            let cards = self.cards.read();
            cards
                .values()
                .filter(|c| c.user_id == user_id)
                .map(|c| c.id)
                .collect()
        };
        let reviews = self.reviews.read();
        let mut v: Vec<Review> = ids
            .iter()
            .filter_map(|id| reviews.get(id))
            .flat_map(|r| r.iter().cloned())
            .collect();
        v.sort_by_key(|r| r.reviewed_at);
        Ok(v)
    }
}
