use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use wordpace_core::{
    repo::Repository, Algorithm, Card, CardId, CoreError, Quality, Review, UserId, VocabId,
};

pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub async fn open_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect("sqlite::memory:")
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        // Create tables/indexes if they do not exist (mirrors migrations).
        const STMT: &str = r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS cards (
          id                TEXT PRIMARY KEY,
          user_id           TEXT NOT NULL,
          vocab_id          TEXT NOT NULL,
          algorithm         TEXT NOT NULL DEFAULT 'sm2',
          repetitions       INTEGER NOT NULL DEFAULT 0,
          interval_days     REAL    NOT NULL DEFAULT 0,
          ease_factor       REAL    NOT NULL DEFAULT 2.5,
          due_at            TEXT    NOT NULL,
          last_reviewed_at  TEXT,
          lapses            INTEGER NOT NULL DEFAULT 0,
          quality_history   TEXT    NOT NULL DEFAULT '[]',
          suspended         INTEGER NOT NULL DEFAULT 0,
          created_at        TEXT NOT NULL,
          UNIQUE(user_id, vocab_id)
        );

        CREATE TABLE IF NOT EXISTS reviews (
          id               TEXT PRIMARY KEY,
          card_id          TEXT NOT NULL,
          quality          INTEGER NOT NULL,
          reviewed_at      TEXT NOT NULL,
          interval_applied REAL NOT NULL,
          ef_after         REAL NOT NULL,
          FOREIGN KEY(card_id) REFERENCES cards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_cards_user_due ON cards (user_id, due_at);
        CREATE INDEX IF NOT EXISTS idx_reviews_card_time ON reviews (card_id, reviewed_at);
        "#;

        // Execute statements one by one for compatibility.
        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("sqlite schema"))?;
        }
        Ok(())
    }
}

const CARD_COLUMNS: &str = "id,user_id,vocab_id,algorithm,repetitions,interval_days,ease_factor,\
                            due_at,last_reviewed_at,lapses,quality_history,suspended,created_at";

#[async_trait::async_trait]
impl Repository for SqliteRepo {
    // ===== Cards =====
    async fn create_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
        algorithm: Algorithm,
    ) -> Result<Card, CoreError> {
        // One card per (user, vocab) pre-check
        let exists = sqlx::query("SELECT 1 FROM cards WHERE user_id=? AND vocab_id=? LIMIT 1")
            .bind(user_id.to_string())
            .bind(vocab_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?
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
            )
            VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(card.id.to_string())
        .bind(card.user_id.to_string())
        .bind(card.vocab_id.to_string())
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i64)
        .bind(card.interval_days as f64)
        .bind(card.ease_factor as f64)
        .bind(dt_to_str(card.due_at))
        .bind(card.last_reviewed_at.map(dt_to_str))
        .bind(card.lapses as i64)
        .bind(history_to_json(&card.quality_history))
        .bind(bool_to_i(card.suspended))
        .bind(dt_to_str(card.created_at))
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert card"))?;

        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn find_card(
        &self,
        user_id: UserId,
        vocab_id: VocabId,
    ) -> Result<Option<Card>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id=? AND vocab_id=?"
        ))
        .bind(user_id.to_string())
        .bind(vocab_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("read card"))?;
        row.map(row_into_card).transpose()
    }

    async fn list_cards(&self, user_id: Option<UserId>) -> Result<Vec<Card>, CoreError> {
        let rows = if let Some(uid) = user_id {
            sqlx::query(&format!(
                "SELECT {CARD_COLUMNS} FROM cards WHERE user_id=? ORDER BY created_at ASC"
            ))
            .bind(uid.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list cards"))?
        } else {
            sqlx::query(&format!(
                "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list cards"))?
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
              algorithm=?, repetitions=?, interval_days=?, ease_factor=?, due_at=?,
              last_reviewed_at=?, lapses=?, quality_history=?, suspended=?
            WHERE id=?
            "#,
        )
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i64)
        .bind(card.interval_days as f64)
        .bind(card.ease_factor as f64)
        .bind(dt_to_str(card.due_at))
        .bind(card.last_reviewed_at.map(dt_to_str))
        .bind(card.lapses as i64)
        .bind(history_to_json(&card.quality_history))
        .bind(bool_to_i(card.suspended))
        .bind(card.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update card"))?;
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
        // Optimistic write: only lands if nobody reviewed the card since the
        // caller read it. SQLite's IS compares NULLs the way we need.
        let res = sqlx::query(
            r#"
            UPDATE cards SET
              algorithm=?, repetitions=?, interval_days=?, ease_factor=?, due_at=?,
              last_reviewed_at=?, lapses=?, quality_history=?, suspended=?
            WHERE id=? AND last_reviewed_at IS ?
            "#,
        )
        .bind(card.algorithm.as_str())
        .bind(card.repetitions as i64)
        .bind(card.interval_days as f64)
        .bind(card.ease_factor as f64)
        .bind(dt_to_str(card.due_at))
        .bind(card.last_reviewed_at.map(dt_to_str))
        .bind(card.lapses as i64)
        .bind(history_to_json(&card.quality_history))
        .bind(bool_to_i(card.suspended))
        .bind(card.id.to_string())
        .bind(expected_last_review.map(dt_to_str))
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update card"))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM cards WHERE id=? LIMIT 1")
                .bind(card.id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("read card"))?
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::Storage("tx"))?;
        sqlx::query("DELETE FROM reviews WHERE card_id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del reviews"))?;
        let res = sqlx::query("DELETE FROM cards WHERE id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del card"))?;
        if res.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(CoreError::NotFound("card"));
        }
        tx.commit()
            .await
            .map_err(|_| CoreError::Storage("tx commit"))
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let res = sqlx::query("UPDATE cards SET suspended=? WHERE id=?")
            .bind(bool_to_i(suspended))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("suspend"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    // ===== Reviews =====
    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO reviews (id,card_id,quality,reviewed_at,interval_applied,ef_after)
               VALUES (?,?,?,?,?,?)"#,
        )
        .bind(review.id.to_string())
        .bind(review.card_id.to_string())
        .bind(review.quality.as_score() as i64)
        .bind(dt_to_str(review.reviewed_at))
        .bind(review.interval_applied as f64)
        .bind(review.ef_after as f64)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert review"))?;
        Ok(())
    }

    async fn list_reviews_for_card(&self, card_id: CardId) -> Result<Vec<Review>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
               FROM reviews WHERE card_id=? ORDER BY reviewed_at ASC"#,
        )
        .bind(card_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("list reviews"))?;
        rows.into_iter().map(row_into_review).collect()
    }

    async fn list_reviews_for_user(&self, user_id: UserId) -> Result<Vec<Review>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT r.id,r.card_id,r.quality,r.reviewed_at,r.interval_applied,r.ef_after
               FROM reviews r JOIN cards c ON c.id = r.card_id
               WHERE c.user_id=? ORDER BY r.reviewed_at ASC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("list reviews"))?;
        rows.into_iter().map(row_into_review).collect()
    }
}

// ===== Helpers =====
fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Invalid("uuid"))
}

fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Invalid("datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn bool_to_i(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn history_to_json(history: &[Quality]) -> String {
    let scores: Vec<i32> = history.iter().map(|q| q.as_score()).collect();
    serde_json::to_string(&scores).expect("serialize")
}

fn history_from_json(s: &str) -> Result<Vec<Quality>, CoreError> {
    let scores: Vec<i32> =
        serde_json::from_str(s).map_err(|_| CoreError::Invalid("quality history"))?;
    scores
        .into_iter()
        .map(|i| Quality::from_score(i).ok_or(CoreError::Invalid("quality")))
        .collect()
}

fn row_into_card(row: sqlx::sqlite::SqliteRow) -> Result<Card, CoreError> {
    Ok(Card {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        user_id: uuid_from_str(row.get::<String, _>("user_id"))?,
        vocab_id: uuid_from_str(row.get::<String, _>("vocab_id"))?,
        algorithm: Algorithm::from_tag(&row.get::<String, _>("algorithm"))
            .ok_or(CoreError::Invalid("algorithm"))?,
        repetitions: row.get::<i64, _>("repetitions") as u32,
        interval_days: row.get::<f64, _>("interval_days") as f32,
        ease_factor: row.get::<f64, _>("ease_factor") as f32,
        due_at: dt_from_str(row.get::<String, _>("due_at"))?,
        last_reviewed_at: row
            .get::<Option<String>, _>("last_reviewed_at")
            .map(dt_from_str)
            .transpose()?,
        lapses: row.get::<i64, _>("lapses") as u32,
        quality_history: history_from_json(&row.get::<String, _>("quality_history"))?,
        suspended: row.get::<i64, _>("suspended") != 0,
        created_at: dt_from_str(row.get::<String, _>("created_at"))?,
    })
}

fn row_into_review(row: sqlx::sqlite::SqliteRow) -> Result<Review, CoreError> {
    Ok(Review {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        card_id: uuid_from_str(row.get::<String, _>("card_id"))?,
        quality: Quality::from_score(row.get::<i64, _>("quality") as i32)
            .ok_or(CoreError::Invalid("quality"))?,
        reviewed_at: dt_from_str(row.get::<String, _>("reviewed_at"))?,
        interval_applied: row.get::<f64, _>("interval_applied") as f32,
        ef_after: row.get::<f64, _>("ef_after") as f32,
    })
}
