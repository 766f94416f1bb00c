//! Conflict resolution across the stores: Last-Write-Wins, Remove-Wins,
//! and hash tie-breaks, exercised through the public merge API.

use std::cmp::Ordering;

use graphset_core::{bytes_compare, Fid, ReactionType, UserDataField};
use graphset_store::StoreError;
use graphset_testkit::{factories, TestFixture};

fn fid(value: u64) -> Fid {
    Fid::new(value).unwrap()
}

#[tokio::test]
async fn test_later_timestamp_wins() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let signer = fixture.signer_key();

    let early = factories::link_add(fixture.fid, 100, &signer, fid(2));
    let late = factories::link_remove(fixture.fid, 200, &signer, fid(2));

    links.merge(&early).await.unwrap();
    let superseded = links.merge(&late).await.unwrap();
    assert_eq!(superseded, vec![early.clone()]);

    // The loser is fully gone, the winner is live.
    assert!(links
        .get_link_add(fixture.fid, graphset_core::LinkType::FOLLOW, fid(2))
        .await
        .is_err());
    assert_eq!(
        links
            .get_link_remove(fixture.fid, graphset_core::LinkType::FOLLOW, fid(2))
            .await
            .unwrap(),
        late
    );

    // The stale add is rejected without touching state.
    let err = links.merge(&early).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_remove_wins_at_timestamp_tie_in_both_merge_orders() {
    let signer_key = TestFixture::new().signer_key();
    let owner = fid(1);

    let add = factories::link_add(owner, 100, &signer_key, fid(2));
    let remove = factories::link_remove(owner, 100, &signer_key, fid(2));

    // Add first, then the same-timestamp remove: remove supersedes.
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    links.merge(&add).await.unwrap();
    assert_eq!(links.merge(&remove).await.unwrap(), vec![add.clone()]);

    // Remove first: the same-timestamp add conflicts, whatever its hash.
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    links.merge(&remove).await.unwrap();
    assert!(matches!(
        links.merge(&add).await.unwrap_err(),
        StoreError::Conflict(_)
    ));

    // Either way the surviving state is the remove alone.
    assert_eq!(links.get_link_removes_by_fid(owner).await.unwrap(), vec![remove]);
    assert!(links.get_link_adds_by_fid(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_wins_at_tie_for_every_hash_relation() {
    use graphset_core::{ContentHash, LinkType, Message, MessageBody, MessageType};

    let signer_key = TestFixture::new().signer_key();
    let owner = fid(1);
    let follow = |message_type, hash_fill: u8| Message {
        fid: owner,
        message_type,
        timestamp: 100,
        hash: ContentHash::from_bytes([hash_fill; 20]),
        signer: signer_key.clone(),
        body: MessageBody::Link {
            link_type: LinkType::FOLLOW,
            target_fid: fid(2),
        },
    };

    // Remove with the greater hash and with the smaller hash; in both
    // merge orders the Remove must hold the slot.
    for (add_fill, remove_fill) in [(0x01, 0xfe), (0xfe, 0x01)] {
        let add = follow(MessageType::LinkAdd, add_fill);
        let remove = follow(MessageType::LinkRemove, remove_fill);

        for pair in [[&add, &remove], [&remove, &add]] {
            let fixture = TestFixture::new();
            let links = fixture.link_store();
            links.merge(pair[0]).await.unwrap();
            let _ = links.merge(pair[1]).await;

            assert_eq!(
                links.get_link_removes_by_fid(owner).await.unwrap(),
                vec![remove.clone()]
            );
            assert!(links.get_link_adds_by_fid(owner).await.unwrap().is_empty());
        }
    }
}

#[tokio::test]
async fn test_same_class_tie_resolved_by_hash_in_both_orders() {
    let signer_key = TestFixture::new().signer_key();
    let owner = fid(1);

    // Same field, same timestamp, different values: different hashes
    // competing for one slot.
    let a = factories::user_data_add(owner, 100, &signer_key, UserDataField::Bio, "alpha");
    let b = factories::user_data_add(owner, 100, &signer_key, UserDataField::Bio, "beta");
    let (winner, loser) = match bytes_compare(a.hash.as_bytes(), b.hash.as_bytes()) {
        Ordering::Greater => (a, b),
        _ => (b, a),
    };

    for pair in [[&winner, &loser], [&loser, &winner]] {
        let fixture = TestFixture::new();
        let store = fixture.user_data_store();
        // The first merge always lands; the outcome must not depend on
        // arrival order.
        store.merge(pair[0]).await.ok();
        store.merge(pair[1]).await.ok();
        assert_eq!(
            store
                .get_user_data_add(owner, UserDataField::Bio)
                .await
                .unwrap(),
            winner
        );
    }
}

#[tokio::test]
async fn test_duplicate_merge_is_rejected() {
    let fixture = TestFixture::new();
    let reactions = fixture.reaction_store();
    let signer = fixture.signer_key();

    let target = factories::target_id(fid(9), 50);
    let message =
        factories::reaction_add(fixture.fid, 100, &signer, ReactionType::Like, target);

    reactions.merge(&message).await.unwrap();
    assert!(matches!(
        reactions.merge(&message).await.unwrap_err(),
        StoreError::Duplicate
    ));

    // State is unchanged.
    assert_eq!(
        reactions.get_all_messages_by_fid(fixture.fid).await.unwrap(),
        vec![message]
    );
}

#[tokio::test]
async fn test_wrong_family_is_rejected_before_any_state_change() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let signer = fixture.signer_key();

    let reaction = factories::reaction_add(
        fixture.fid,
        100,
        &signer,
        ReactionType::Like,
        factories::target_id(fid(9), 50),
    );
    assert!(matches!(
        links.merge(&reaction).await.unwrap_err(),
        StoreError::InvalidInput(_)
    ));
    assert!(links
        .get_all_messages_by_fid(fixture.fid)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_different_slots_do_not_conflict() {
    let fixture = TestFixture::new();
    let reactions = fixture.reaction_store();
    let signer = fixture.signer_key();

    let target = factories::target_id(fid(9), 50);
    let like = factories::reaction_add(fixture.fid, 100, &signer, ReactionType::Like, target);
    let recast =
        factories::reaction_add(fixture.fid, 100, &signer, ReactionType::Recast, target);

    reactions.merge(&like).await.unwrap();
    assert!(reactions.merge(&recast).await.unwrap().is_empty());
    assert_eq!(
        reactions.get_reaction_adds_by_fid(fixture.fid).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_reactions_by_target_tracks_live_adds() {
    let fixture = TestFixture::new();
    let reactions = fixture.reaction_store();
    let target = factories::target_id(fid(9), 50);

    let other = TestFixture::for_fid(2);
    let like_1 = factories::reaction_add(
        fixture.fid,
        100,
        &fixture.signer_key(),
        ReactionType::Like,
        target,
    );
    let like_2 =
        factories::reaction_add(other.fid, 110, &other.signer_key(), ReactionType::Like, target);

    reactions.merge(&like_1).await.unwrap();
    reactions.merge(&like_2).await.unwrap();

    let by_target = reactions
        .get_reactions_by_target(&target, Some(ReactionType::Like))
        .await
        .unwrap();
    assert_eq!(by_target, vec![like_1.clone(), like_2.clone()]);

    // Retracting a reaction drops it from the reverse index; a Remove is
    // never discoverable by target.
    let retract = factories::reaction_remove(
        fixture.fid,
        200,
        &fixture.signer_key(),
        ReactionType::Like,
        target,
    );
    reactions.merge(&retract).await.unwrap();
    assert_eq!(
        reactions
            .get_reactions_by_target(&target, None)
            .await
            .unwrap(),
        vec![like_2]
    );
}

#[tokio::test]
async fn test_links_by_target_tracks_live_adds() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();

    let follower_a = TestFixture::for_fid(2);
    let follower_b = TestFixture::for_fid(3);
    let follow_a = factories::link_add(follower_a.fid, 100, &follower_a.signer_key(), fixture.fid);
    let follow_b = factories::link_add(follower_b.fid, 110, &follower_b.signer_key(), fixture.fid);

    links.merge(&follow_a).await.unwrap();
    links.merge(&follow_b).await.unwrap();

    assert_eq!(
        links.get_links_by_target(fixture.fid, None).await.unwrap(),
        vec![follow_a.clone(), follow_b.clone()]
    );

    let unfollow =
        factories::link_remove(follower_a.fid, 200, &follower_a.signer_key(), fixture.fid);
    links.merge(&unfollow).await.unwrap();
    assert_eq!(
        links.get_links_by_target(fixture.fid, None).await.unwrap(),
        vec![follow_b]
    );
}

#[tokio::test]
async fn test_merge_events_carry_superseded_messages() {
    let fixture = TestFixture::new();
    let links = fixture.link_store();
    let signer = fixture.signer_key();
    let mut rx = fixture.events.subscribe();

    let early = factories::link_add(fixture.fid, 100, &signer, fid(2));
    let late = factories::link_remove(fixture.fid, 200, &signer, fid(2));
    links.merge(&early).await.unwrap();
    links.merge(&late).await.unwrap();

    match rx.recv().await.unwrap() {
        graphset_store::StoreEvent::MergeMessage {
            message,
            deleted_messages,
        } => {
            assert_eq!(message, early);
            assert!(deleted_messages.is_empty());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        graphset_store::StoreEvent::MergeMessage {
            message,
            deleted_messages,
        } => {
            assert_eq!(message, late);
            assert_eq!(deleted_messages, vec![early]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
