use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use wordpace_core::{
    repo::Repository, Algorithm, Card, CardId, CoreError, Quality, Review, UserId, VocabId,
};

pub struct PostgresRepo {
    pool: PgPool,
}

impl PostgresRepo {
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|_| CoreError::Storage("pg connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        // Mirrors migrations (id generation done in app)
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS cards (
          id                uuid PRIMARY KEY,
          user_id           uuid NOT NULL,
          vocab_id          uuid NOT NULL,
          algorithm         text NOT NULL DEFAULT 'sm2',
          repetitions       integer NOT NULL DEFAULT 0,
          interval_days     real    NOT NULL DEFAULT 0,
          ease_factor       real    NOT NULL DEFAULT 2.5,
          due_at            timestamptz NOT NULL,
          last_reviewed_at  timestamptz,
          lapses            integer NOT NULL DEFAULT 0,
          quality_history   smallint[] NOT NULL DEFAULT '{}',
          suspended         boolean NOT NULL DEFAULT false,
          created_at        timestamptz NOT NULL,
          UNIQUE(user_id, vocab_id)
        );

        CREATE TABLE IF NOT EXISTS reviews (
          id               uuid PRIMARY KEY,
          card_id          uuid NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
          quality          smallint NOT NULL,
          reviewed_at      timestamptz NOT NULL,
          interval_applied real NOT NULL,
          ef_after         real NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_user_due ON cards (user_id, due_at);
        CREATE INDEX IF NOT EXISTS idx_reviews_card_time ON reviews (card_id, reviewed_at);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("pg schema"))?;
        }
        Ok(())
    }
}

const CARD_COLUMNS: &str = "id,user_id,vocab_id,algorithm,repetitions,interval_days,ease_factor,\
                            due_at,last_reviewed_at,lapses,quality_history,suspended,created_at";

#[async_trait::async_trait]
impl Repository for PostgresRepo {
    // ===== Cards =====
    async fn create_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
        algorithm: Algorithm,
    ) -> Result<Card, CoreError> {
        // one card per (user, vocab) pre-check
        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM cards WHERE user_id=$1 AND vocab_id=$2 LIMIT 1",
        )
        .bind(user_id)
        .bind(vocab_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read card"))?
        .is_some();
        if exists {
            return Err(CoreError::Conflict("card already exists for vocab item"));
        }

        let card = Card::new(user_id, vocab_id, algorithm);
        sqlx::query(
            r#"
            INSERT INTO cards (
              id, user_id, vocab_id, algorithm, repetitions, interval_days, ease_factor,
              due_at, last_reviewed_at, lapses, quality_history, suspended, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(card.id)
        .bind(card.user_id)
        .bind(card.vocab_id)
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i32)
        .bind(card.interval_days)
        .bind(card.ease_factor)
        .bind(card.due_at)
        .bind(card.last_reviewed_at)
        .bind(card.lapses as i32)
        .bind(history_to_i16(&card.quality_history))
        .bind(card.suspended)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg insert card"))?;

        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id=$1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn find_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
    ) -> Result<Option<Card>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id=$1 AND vocab_id=$2"
        ))
        .bind(user_id)
        .bind(vocab_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read card"))?;
        row.map(row_into_card).transpose()
    }

    async fn list_cards(&self, user_id: Option<UserId>) -> Result<Vec<Card>, CoreError> {
        let rows = if let Some(uid) = user_id {
            sqlx::query(&format!(
                "SELECT {CARD_COLUMNS} FROM cards WHERE user_id=$1 ORDER BY created_at ASC"
            ))
            .bind(uid)
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list cards"))?
        } else {
            sqlx::query(&format!(
                "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list cards"))?
        };
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_card(row)?);
        }
        Ok(v)
    }

    async fn update_card(&self, card: &Card) -> Result<Card, CoreError> {
        let res = sqlx::query(
            r#"
            UPDATE cards SET
              algorithm=$1, repetitions=$2, interval_days=$3, ease_factor=$4, due_at=$5,
              last_reviewed_at=$6, lapses=$7, quality_history=$8, suspended=$9
            WHERE id=$10
            "#,
        )
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i32)
        .bind(card.interval_days)
        .bind(card.ease_factor)
        .bind(card.due_at)
        .bind(card.last_reviewed_at)
        .bind(card.lapses as i32)
        .bind(history_to_i16(&card.quality_history))
        .bind(card.suspended)
        .bind(card.id)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg update card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(card.clone())
    }

    async fn update_card_reviewed(
        &self,
        card: &Card,
        expected_last_review: Option<DateTime<Utc>>,
    ) -> Result<Card, CoreError> {
        // Optimistic write; IS NOT DISTINCT FROM gives NULL-safe equality.
        let res = sqlx::query(
            r#"
            UPDATE cards SET
              algorithm=$1, repetitions=$2, interval_days=$3, ease_factor=$4, due_at=$5,
              last_reviewed_at=$6, lapses=$7, quality_history=$8, suspended=$9
            WHERE id=$10 AND last_reviewed_at IS NOT DISTINCT FROM $11
            "#,
        )
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i32)
        .bind(card.interval_days)
        .bind(card.ease_factor)
        .bind(card.due_at)
        .bind(card.last_reviewed_at)
        .bind(card.lapses as i32)
        .bind(history_to_i16(&card.quality_history))
        .bind(card.suspended)
        .bind(card.id)
        .bind(expected_last_review)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg update card"))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM cards WHERE id=$1 LIMIT 1")
                .bind(card.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("pg read card"))?
                .is_some();
            return Err(if exists {
                CoreError::Conflict("card reviewed concurrently")
            } else {
                CoreError::NotFound("card")
            });
        }
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        let res = sqlx::query("DELETE FROM cards WHERE id=$1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg del card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let res = sqlx::query("UPDATE cards SET suspended=$1 WHERE id=$2")
            .bind(suspended)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg suspend"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    // ===== Reviews =====
    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO reviews (id,card_id,quality,reviewed_at,interval_applied,ef_after)
               VALUES ($1,$2,$3,$4,$5,$6)"#,
        )
        .bind(review.id)
        .bind(review.card_id)
        .bind(review.quality.as_score() as i16)
        .bind(review.reviewed_at)
        .bind(review.interval_applied)
        .bind(review.ef_after)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg insert review"))?;
        Ok(())
    }

    async fn list_reviews_for_card(&self, card_id: CardId) -> Result<Vec<Review>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
               FROM reviews WHERE card_id=$1 ORDER BY reviewed_at ASC"#,
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg list reviews"))?;
        rows.into_iter().map(row_into_review).collect()
    }

    async fn list_reviews_for_user(&self, user_id: UserId) -> Result<Vec<Review>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT r.id,r.card_id,r.quality,r.reviewed_at,r.interval_applied,r.ef_after
               FROM reviews r JOIN cards c ON c.id = r.card_id
               WHERE c.user_id=$1 ORDER BY r.reviewed_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg list reviews"))?;
        rows.into_iter().map(row_into_review).collect()
    }
}

// ===== helpers =====
fn history_to_i16(history: &[Quality]) -> Vec<i16> {
    history.iter().map(|q| q.as_score() as i16).collect()
}

fn history_from_i16(scores: Vec<i16>) -> Result<Vec<Quality>, CoreError> {
    scores
        .into_iter()
        .map(|i| Quality::from_score(i as i32).ok_or(CoreError::Invalid("quality")))
        .collect()
}

fn row_into_card(row: sqlx::postgres::PgRow) -> Result<Card, CoreError> {
    Ok(Card {
        id: row.get::<uuid::Uuid, _>("id"),
        user_id: row.get::<uuid::Uuid, _>("user_id"),
        vocab_id: row.get::<uuid::Uuid, _>("vocab_id"),
        algorithm: Algorithm::from_tag(&row.get::<String, _>("algorithm"))
            .ok_or(CoreError::Invalid("algorithm"))?,
        repetitions: row.get::<i32, _>("repetitions") as u32,
        interval_days: row.get::<f32, _>("interval_days"),
        ease_factor: row.get::<f32, _>("ease_factor"),
        due_at: row.get::<DateTime<Utc>, _>("due_at"),
        last_reviewed_at: row.get::<Option<DateTime<Utc>>, _>("last_reviewed_at"),
        lapses: row.get::<i32, _>("lapses") as u32,
        quality_history: history_from_i16(row.get::<Vec<i16>, _>("quality_history"))?,
        suspended: row.get::<bool, _>("suspended"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

fn row_into_review(row: sqlx::postgres::PgRow) -> Result<Review, CoreError> {
    Ok(Review {
        id: row.get::<uuid::Uuid, _>("id"),
        card_id: row.get::<uuid::Uuid, _>("card_id"),
        quality: Quality::from_score(row.get::<i16, _>("quality") as i32)
            .ok_or(CoreError::Invalid("quality"))?,
        reviewed_at: row.get::<DateTime<Utc>, _>("reviewed_at"),
        interval_applied: row.get::<f32, _>("interval_applied"),
        ef_after: row.get::<f32, _>("ef_after"),
    })
}
