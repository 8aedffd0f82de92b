//! Integration tests for spouse linking against in-memory dependencies.

mod common;

use std::sync::Arc;

use crate::common::{enroll, family_primary, individual};
use loyalty_core::common::FamilyId;
use loyalty_core::domains::member::activities::{
    enroll_member, get_family, link_spouse, relink_spouse,
};
use loyalty_core::domains::member::models::{FamilyMember, RelationshipType, SpouseAssignmentStatus};
use loyalty_core::domains::member::{edges, MemberError, MemberEvent};
use loyalty_core::kernel::{BaseClock, BaseIdentityStore, StoreOp, TestDependencies};

#[tokio::test]
async fn spouse_found_links_both_into_primary_family() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let spouse = enroll(individual("EXT-B"), &deps).await;
    let primary = enroll_member(family_primary("EXT-A", "EXT-B"), &deps)
        .await
        .unwrap();

    assert_eq!(
        primary.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(primary.spouse_assignment_date, Some(test.clock.now()));

    let stored_spouse = test.identity_store.member("EXT-B").unwrap();
    assert_eq!(
        stored_spouse.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(stored_spouse.family_id, primary.family_id);
    assert_ne!(spouse.family_id, primary.family_id);

    let family = get_family(&primary.family_id, &deps).await.unwrap();
    assert_eq!(family.len(), 2);
    assert_eq!(family[0].member_id, primary.id);
    assert_eq!(family[0].relationship_type, RelationshipType::Primary);
    assert!(family[0].is_primary);
    assert_eq!(family[1].member_id, spouse.id);
    assert_eq!(family[1].relationship_type, RelationshipType::Spouse);
    assert!(!family[1].is_primary);
}

#[tokio::test]
async fn spouse_link_publishes_family_assigned_event() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let spouse = enroll(individual("EXT-B"), &deps).await;
    let primary = enroll(family_primary("EXT-A", "EXT-B"), &deps).await;

    let messages = test.nats.messages_ending_with("families.assigned");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "loyalty.families.assigned");

    let event: MemberEvent = test.nats.deserialize_message(&messages[0]).unwrap();
    assert_eq!(
        event,
        MemberEvent::FamilyAssigned {
            family_id: primary.family_id.clone(),
            primary_member_id: primary.id,
            spouse_member_id: spouse.id,
        }
    );
}

#[tokio::test]
async fn missing_spouse_is_spouse_not_found() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let primary = enroll_member(family_primary("EXT-A", "EXT-nobody"), &deps)
        .await
        .unwrap();

    assert_eq!(
        primary.spouse_assignment_status,
        SpouseAssignmentStatus::SpouseNotFound
    );
    assert_eq!(primary.spouse_assignment_date, None);

    let stored = test.identity_store.member("EXT-A").unwrap();
    assert_eq!(
        stored.spouse_assignment_status,
        SpouseAssignmentStatus::SpouseNotFound
    );
    assert_eq!(stored.spouse_external_id.as_deref(), Some("EXT-nobody"));
    assert_eq!(test.identity_store.relationship_count(), 0);
    assert_eq!(test.nats.publish_count_ending_with("families.assigned"), 0);
}

#[tokio::test]
async fn blank_spouse_reference_skips_linking() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let member = enroll_member(family_primary("EXT-A", "  "), &deps)
        .await
        .unwrap();

    assert_eq!(
        member.spouse_assignment_status,
        SpouseAssignmentStatus::Pending
    );
    assert_eq!(member.spouse_external_id, None);
    assert!(!test
        .identity_store
        .calls()
        .contains(&StoreOp::CommitSpouseLink));
}

#[tokio::test]
async fn store_failure_during_link_is_failed_but_enrollment_succeeds() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(individual("EXT-B"), &deps).await;
    test.identity_store.fail_on(StoreOp::CommitSpouseLink);

    let primary = enroll_member(family_primary("EXT-A", "EXT-B"), &deps)
        .await
        .unwrap();

    assert_eq!(primary.spouse_assignment_status, SpouseAssignmentStatus::Failed);
    assert!(primary.spouse_assignment_error.is_some());

    let stored = test.identity_store.member("EXT-A").unwrap();
    assert_eq!(stored.spouse_assignment_status, SpouseAssignmentStatus::Failed);

    let spouse = test.identity_store.member("EXT-B").unwrap();
    assert_eq!(
        spouse.spouse_assignment_status,
        SpouseAssignmentStatus::Pending
    );
    assert_eq!(test.identity_store.relationship_count(), 0);
}

#[tokio::test]
async fn self_reference_is_failed() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let member = enroll_member(family_primary("EXT-A", "EXT-A"), &deps)
        .await
        .unwrap();

    assert_eq!(member.spouse_assignment_status, SpouseAssignmentStatus::Failed);
    assert_eq!(test.identity_store.relationship_count(), 0);
}

#[tokio::test]
async fn spouse_linked_elsewhere_is_failed() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(individual("EXT-B"), &deps).await;
    let first = enroll(family_primary("EXT-A", "EXT-B"), &deps).await;
    let second = enroll(family_primary("EXT-C", "EXT-B"), &deps).await;

    assert_eq!(first.spouse_assignment_status, SpouseAssignmentStatus::Completed);
    assert_eq!(second.spouse_assignment_status, SpouseAssignmentStatus::Failed);

    let spouse = test.identity_store.member("EXT-B").unwrap();
    assert_eq!(spouse.family_id, first.family_id);
    assert_eq!(test.identity_store.relationship_count(), 2);
}

#[tokio::test]
async fn spouse_enrolling_later_links_back_to_waiting_member() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let waiting = enroll(family_primary("EXT-A", "EXT-B"), &deps).await;
    assert_eq!(
        waiting.spouse_assignment_status,
        SpouseAssignmentStatus::SpouseNotFound
    );

    let later = enroll(family_primary("EXT-B", "EXT-A"), &deps).await;
    assert_eq!(later.spouse_assignment_status, SpouseAssignmentStatus::Completed);

    let waiting = test.identity_store.member("EXT-A").unwrap();
    assert_eq!(
        waiting.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(waiting.family_id, later.family_id);
}

#[tokio::test]
async fn relink_after_spouse_enrolls_completes() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(family_primary("EXT-A", "EXT-B"), &deps).await;
    enroll(individual("EXT-B"), &deps).await;

    let relinked = relink_spouse("EXT-A", None, &deps).await.unwrap();

    assert_eq!(
        relinked.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    let spouse = test.identity_store.member("EXT-B").unwrap();
    assert_eq!(spouse.family_id, relinked.family_id);
}

#[tokio::test]
async fn relink_with_new_reference_replaces_stored_one() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(family_primary("EXT-A", "EXT-typo"), &deps).await;
    enroll(individual("EXT-B"), &deps).await;

    let relinked = edges::relink_spouse("EXT-A", Some("EXT-B"), &deps)
        .await
        .unwrap();

    assert_eq!(
        relinked.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    let stored = test.identity_store.member("EXT-A").unwrap();
    assert_eq!(stored.spouse_external_id.as_deref(), Some("EXT-B"));
}

#[tokio::test]
async fn relink_without_any_reference_is_invalid() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(individual("EXT-A"), &deps).await;

    let result = relink_spouse("EXT-A", None, &deps).await;
    assert!(matches!(result, Err(MemberError::InvalidRequest(_))));

    let result = relink_spouse("EXT-missing", Some("EXT-A"), &deps).await;
    assert!(matches!(result, Err(MemberError::MemberNotFound { .. })));
}

#[tokio::test]
async fn relinking_a_linked_member_is_idempotent() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    enroll(individual("EXT-B"), &deps).await;
    let linked = enroll(family_primary("EXT-A", "EXT-B"), &deps).await;

    test.clock.advance(chrono::Duration::hours(1));
    let again = relink_spouse("EXT-A", None, &deps).await.unwrap();
    let from_spouse_side = link_spouse(
        test.identity_store.member("EXT-B").unwrap(),
        "EXT-A",
        &deps,
    )
    .await;

    assert_eq!(again, linked);
    assert_eq!(
        from_spouse_side.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(from_spouse_side.family_id, linked.family_id);
    assert_eq!(test.identity_store.relationship_count(), 2);
    assert_eq!(test.nats.publish_count_ending_with("families.assigned"), 1);
}

#[tokio::test]
async fn existing_relationship_record_wins_on_relink() {
    let test = TestDependencies::new();
    let deps = test.server_deps();

    let member = enroll(family_primary("EXT-A", "EXT-B"), &deps).await;
    enroll(individual("EXT-B"), &deps).await;

    // A record written by an earlier, partially applied link
    let established = FamilyId::from("FAM-established");
    test.identity_store
        .save_relationship(&FamilyMember::new(
            established.clone(),
            member.id,
            RelationshipType::Spouse,
            test.clock.now(),
        ))
        .await
        .unwrap();

    let converged = relink_spouse("EXT-A", None, &deps).await.unwrap();

    assert_eq!(
        converged.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(converged.family_id, established);
    assert_eq!(test.identity_store.relationship_count(), 1);
    assert_eq!(test.nats.publish_count_ending_with("families.assigned"), 0);
}

#[tokio::test]
async fn family_event_publish_failure_rolls_back_link_and_fails() {
    let test = TestDependencies::new();
    test.nats.fail_subjects_ending_with("families.assigned");
    let deps = test.server_deps();

    let spouse = enroll(individual("EXT-B"), &deps).await;
    let primary = enroll_member(family_primary("EXT-A", "EXT-B"), &deps)
        .await
        .unwrap();

    assert_eq!(primary.spouse_assignment_status, SpouseAssignmentStatus::Failed);
    assert!(primary
        .spouse_assignment_error
        .as_deref()
        .is_some_and(|e| e.contains("publish")));

    let stored = test.identity_store.member("EXT-A").unwrap();
    assert_eq!(stored.spouse_assignment_status, SpouseAssignmentStatus::Failed);
    assert_eq!(test.identity_store.member("EXT-B").unwrap(), spouse);
    assert_eq!(test.identity_store.relationship_count(), 0);
    assert_eq!(test.nats.publish_count_ending_with("families.assigned"), 0);
}

#[tokio::test]
async fn relink_after_family_event_failure_delivers_event() {
    let test = TestDependencies::new();
    test.nats.fail_subjects_ending_with("families.assigned");
    let deps = test.server_deps();

    let spouse = enroll(individual("EXT-B"), &deps).await;
    enroll(family_primary("EXT-A", "EXT-B"), &deps).await;

    test.nats.recover();
    let relinked = relink_spouse("EXT-A", None, &deps).await.unwrap();

    assert_eq!(
        relinked.spouse_assignment_status,
        SpouseAssignmentStatus::Completed
    );
    assert_eq!(relinked.spouse_assignment_error, None);
    assert_eq!(test.identity_store.relationship_count(), 2);

    let messages = test.nats.messages_ending_with("families.assigned");
    assert_eq!(messages.len(), 1);
    let event: MemberEvent = test.nats.deserialize_message(&messages[0]).unwrap();
    assert_eq!(
        event,
        MemberEvent::FamilyAssigned {
            family_id: relinked.family_id.clone(),
            primary_member_id: relinked.id,
            spouse_member_id: spouse.id,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutual_enrollment_converges_on_one_family() {
    for round in 0..20 {
        let test = TestDependencies::new();
        let deps = Arc::new(test.server_deps());
        let a = format!("EXT-A{round}");
        let b = format!("EXT-B{round}");

        let (first, second) = tokio::join!(
            tokio::spawn({
                let deps = deps.clone();
                let (a, b) = (a.clone(), b.clone());
                async move { enroll_member(family_primary(&a, &b), &deps).await }
            }),
            tokio::spawn({
                let deps = deps.clone();
                let (a, b) = (a.clone(), b.clone());
                async move { enroll_member(family_primary(&b, &a), &deps).await }
            }),
        );
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        let member_a = test.identity_store.member(&a).unwrap();
        let member_b = test.identity_store.member(&b).unwrap();

        assert_eq!(
            member_a.spouse_assignment_status,
            SpouseAssignmentStatus::Completed,
            "round {round}"
        );
        assert_eq!(
            member_b.spouse_assignment_status,
            SpouseAssignmentStatus::Completed,
            "round {round}"
        );
        assert_eq!(member_a.family_id, member_b.family_id, "round {round}");

        let relationships = test.identity_store.relationships();
        assert_eq!(relationships.len(), 2, "round {round}");
        assert_eq!(
            relationships.iter().filter(|r| r.is_primary).count(),
            1,
            "round {round}"
        );
        assert!(relationships
            .iter()
            .all(|r| r.family_id == member_a.family_id));
        assert_eq!(test.nats.publish_count_ending_with("families.assigned"), 1);
    }
}
