use uuid::Uuid;
use wordpace_core::{
    apply_review, repo::memory::MemoryRepo, Algorithm, CoreError, Quality, Repository,
};

#[tokio::test]
async fn one_card_per_user_and_vocab_item() {
    let repo = MemoryRepo::new();
    let user = Uuid::new_v4();
    let vocab = Uuid::new_v4();

    let card = repo.create_card(user, vocab, Algorithm::Sm2).await.unwrap();
    assert_eq!(card.repetitions, 0);
    assert!((card.ease_factor - 2.5).abs() < 1e-6);

    let found = repo.find_card(user, vocab).await.unwrap();
    assert_eq!(found.unwrap().id, card.id);

    let dup = repo.create_card(user, vocab, Algorithm::Sm2).await;
    assert!(matches!(dup, Err(CoreError::Conflict(_))));

    // Same vocab item for another learner is a distinct card.
    let other = Uuid::new_v4();
    assert!(repo.create_card(other, vocab, Algorithm::Sm2).await.is_ok());
}

#[tokio::test]
async fn guarded_update_rejects_stale_review() {
    let repo = MemoryRepo::new();
    let user = Uuid::new_v4();
    let card = repo
        .create_card(user, Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();

    // Two sessions read the same card state, then both submit a review.
    let read_a = repo.get_card(card.id).await.unwrap();
    let read_b = repo.get_card(card.id).await.unwrap();

    let out_a = apply_review(read_a.clone(), Quality::Good);
    let out_b = apply_review(read_b.clone(), Quality::Again);

    repo.update_card_reviewed(&out_a.updated_card, read_a.last_reviewed_at)
        .await
        .unwrap();
    repo.insert_review(&out_a.review).await.unwrap();

    // The second write raced and must lose, not clobber.
    let res = repo
        .update_card_reviewed(&out_b.updated_card, read_b.last_reviewed_at)
        .await;
    assert!(matches!(res, Err(CoreError::Conflict(_))));

    let stored = repo.get_card(card.id).await.unwrap();
    assert_eq!(stored.repetitions, 1);
    assert_eq!(stored.lapses, 0);
}

#[tokio::test]
async fn persisted_card_round_trips_scheduling_state() {
    let repo = MemoryRepo::new();
    let user = Uuid::new_v4();
    let card = repo
        .create_card(user, Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();

    let out = apply_review(card.clone(), Quality::Easy);
    repo.update_card_reviewed(&out.updated_card, card.last_reviewed_at)
        .await
        .unwrap();
    repo.insert_review(&out.review).await.unwrap();

    let reread = repo.get_card(card.id).await.unwrap();
    assert_eq!(reread.repetitions, out.updated_card.repetitions);
    assert_eq!(reread.interval_days, out.updated_card.interval_days);
    assert_eq!(reread.ease_factor, out.updated_card.ease_factor);
    assert_eq!(reread.due_at, out.updated_card.due_at);
    assert_eq!(reread.quality_history, vec![Quality::Easy]);
}

#[tokio::test]
async fn suspension_and_listing() {
    let repo = MemoryRepo::new();
    let user = Uuid::new_v4();
    let a = repo
        .create_card(user, Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();
    let _b = repo
        .create_card(user, Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();
    let _other = repo
        .create_card(Uuid::new_v4(), Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();

    repo.set_suspended(a.id, true).await.unwrap();
    let mine = repo.list_cards(Some(user)).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().find(|c| c.id == a.id).unwrap().suspended);

    let everyone = repo.list_cards(None).await.unwrap();
    assert_eq!(everyone.len(), 3);
}

#[tokio::test]
async fn review_log_per_card_and_per_user() {
    let repo = MemoryRepo::new();
    let user = Uuid::new_v4();
    let mut card = repo
        .create_card(user, Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();

    for q in [Quality::Good, Quality::Again, Quality::Good] {
        let expected = card.last_reviewed_at;
        let out = apply_review(card, q);
        card = repo
            .update_card_reviewed(&out.updated_card, expected)
            .await
            .unwrap();
        repo.insert_review(&out.review).await.unwrap();
    }

    let per_card = repo.list_reviews_for_card(card.id).await.unwrap();
    assert_eq!(per_card.len(), 3);
    assert!(per_card.windows(2).all(|w| w[0].reviewed_at <= w[1].reviewed_at));

    let per_user = repo.list_reviews_for_user(user).await.unwrap();
    assert_eq!(per_user.len(), 3);
    assert_eq!(
        repo.list_reviews_for_user(Uuid::new_v4()).await.unwrap().len(),
        0
    );
}
