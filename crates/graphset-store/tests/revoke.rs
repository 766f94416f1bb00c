//! Signer revocation: bulk deletion of everything a revoked key authorized.

use graphset_core::{Fid, ReactionType, UserDataField};
use graphset_store::StoreEvent;
use graphset_testkit::{factories, TestFixture};

fn fid(value: u64) -> Fid {
    Fid::new(value).unwrap()
}

#[tokio::test]
async fn test_revoke_deletes_adds_and_removes_by_the_signer() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let signers = factories::test_signers(2);
    let (revoked_key, kept_key) = (signers[0].key(), signers[1].key());

    let add_by_revoked = factories::link_add(fixture.fid, 100, &revoked_key, fid(2));
    let remove_by_revoked = factories::link_remove(fixture.fid, 110, &revoked_key, fid(3));
    let add_by_kept = factories::link_add(fixture.fid, 120, &kept_key, fid(4));
    for message in [&add_by_revoked, &remove_by_revoked, &add_by_kept] {
        links.merge(message).await.unwrap();
    }

    let mut revoked = links
        .revoke_messages_by_signer(fixture.fid, &signers[0].key())
        .await
        .unwrap();
    revoked.sort_by_key(|m| m.timestamp);
    assert_eq!(revoked, vec![add_by_revoked.clone(), remove_by_revoked]);

    // Only the other signer's message survives, indices included.
    assert_eq!(
        links.get_all_messages_by_fid(fixture.fid).await.unwrap(),
        vec![add_by_kept.clone()]
    );
    assert_eq!(
        links.get_link_adds_by_fid(fixture.fid).await.unwrap(),
        vec![add_by_kept]
    );
    assert!(links.get_link_removes_by_fid(fixture.fid).await.unwrap().is_empty());
    assert!(links
        .get_links_by_target(fid(2), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_revoke_is_scoped_to_one_store() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let reactions = fixture.reaction_store();
    let signer = fixture.signer_key();

    let link = factories::link_add(fixture.fid, 100, &signer, fid(2));
    let reaction = factories::reaction_add(
        fixture.fid,
        100,
        &signer,
        ReactionType::Like,
        factories::target_id(fid(9), 50),
    );
    links.merge(&link).await.unwrap();
    reactions.merge(&reaction).await.unwrap();

    let revoked = links
        .revoke_messages_by_signer(fixture.fid, &signer)
        .await
        .unwrap();
    assert_eq!(revoked, vec![link]);

    // The reaction store still holds its message until told otherwise.
    assert_eq!(
        reactions.get_all_messages_by_fid(fixture.fid).await.unwrap(),
        vec![reaction.clone()]
    );
    assert_eq!(
        reactions
            .revoke_messages_by_signer(fixture.fid, &signer)
            .await
            .unwrap(),
        vec![reaction]
    );
}

#[tokio::test]
async fn test_revoke_publishes_one_event_per_message() {
    let fixture = TestFixture::new();
    let user_data = fixture.user_data_store();
    let signer = fixture.signer_key();

    let bio = factories::user_data_add(fixture.fid, 100, &signer, UserDataField::Bio, "hi");
    let pfp = factories::user_data_add(fixture.fid, 110, &signer, UserDataField::Pfp, "url");
    user_data.merge(&bio).await.unwrap();
    user_data.merge(&pfp).await.unwrap();

    let mut rx = fixture.events.subscribe();
    let revoked = user_data
        .revoke_messages_by_signer(fixture.fid, &signer)
        .await
        .unwrap();
    assert_eq!(revoked.len(), 2);

    for _ in 0..2 {
        assert!(matches!(
            rx.recv().await.unwrap(),
            StoreEvent::RevokeMessage { .. }
        ));
    }
}

#[tokio::test]
async fn test_revoke_unknown_signer_is_a_noop() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let signer = fixture.signer_key();

    let link = factories::link_add(fixture.fid, 100, &signer, fid(2));
    links.merge(&link).await.unwrap();

    let stranger = factories::test_signers(5).remove(4).key();
    assert!(links
        .revoke_messages_by_signer(fixture.fid, &stranger)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        links.get_all_messages_by_fid(fixture.fid).await.unwrap(),
        vec![link]
    );
}
