use uuid::Uuid;
use wordpace_core::{apply_review, Algorithm, Quality, Repository};
use wordpace_json::JsonStore;

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("wordpace.json");
    let backups = dir.path().join("backups");

    let user = Uuid::new_v4();
    let vocab = Uuid::new_v4();
    let card_id;
    {
        let store = JsonStore::open_with(file.clone(), backups.clone(), 3)
            .await
            .unwrap();
        let card = store.create_card(user, vocab, Algorithm::Sm2).await.unwrap();
        card_id = card.id;

        let out = apply_review(card.clone(), Quality::Good);
        store
            .update_card_reviewed(&out.updated_card, card.last_reviewed_at)
            .await
            .unwrap();
        store.insert_review(&out.review).await.unwrap();
    }

    let reopened = JsonStore::open_with(file, backups, 3).await.unwrap();
    let card = reopened.get_card(card_id).await.unwrap();
    assert_eq!(card.repetitions, 1);
    assert_eq!(card.quality_history, vec![Quality::Good]);
    assert_eq!(
        reopened.list_reviews_for_card(card_id).await.unwrap().len(),
        1
    );
    let found = reopened.find_card(user, vocab).await.unwrap();
    assert_eq!(found.unwrap().id, card_id);
}

#[tokio::test]
async fn guarded_update_conflicts_on_stale_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open_with(
        dir.path().join("wordpace.json"),
        dir.path().join("backups"),
        3,
    )
    .await
    .unwrap();

    let card = store
        .create_card(Uuid::new_v4(), Uuid::new_v4(), Algorithm::Sm2)
        .await
        .unwrap();

    let out_a = apply_review(card.clone(), Quality::Good);
    let out_b = apply_review(card.clone(), Quality::Again);

    store
        .update_card_reviewed(&out_a.updated_card, card.last_reviewed_at)
        .await
        .unwrap();
    let res = store
        .update_card_reviewed(&out_b.updated_card, card.last_reviewed_at)
        .await;
    assert!(res.is_err());
}
