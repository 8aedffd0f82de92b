//! Spouse linking - the spouse-matching protocol.
//!
//! A linking attempt ends in exactly one of:
//! - `COMPLETED`: the pair is (or already was) linked into one family
//! - `SPOUSE_NOT_FOUND`: the spouse has not enrolled yet
//! - `FAILED`: anything unexpected; the error is logged and recorded
//!
//! Nothing here fails the caller. The outcome is encoded on the returned
//! member.

use tracing::{debug, error, info, warn};

use super::publish::PublishEvents;
use crate::domains::member::errors::LinkError;
use crate::domains::member::models::{Member, SpouseLink};
use crate::kernel::{ServerDeps, StoreError};

/// Attempts allowed when a link loses an optimistic-lock race.
const MAX_LINK_ATTEMPTS: usize = 3;

/// Attempts allowed for persisting a terminal status under contention.
const MAX_STATUS_WRITES: usize = 3;

enum LinkOutcome {
    /// This attempt created the relationship pair
    Linked(Member),
    /// The pair already existed; the member converged onto it
    AlreadyLinked(Member),
    SpouseNotFound,
}

enum Unlinked {
    SpouseNotFound,
    Failed(String),
}

/// Link `primary` with the member enrolled under `spouse_external_id`.
///
/// Safe to re-invoke: a member that already has a relationship record is
/// converged onto it without creating records or publishing again.
pub async fn link_spouse(primary: Member, spouse_external_id: &str, deps: &ServerDeps) -> Member {
    info!(
        member_id = %primary.id,
        spouse_external_id,
        "Processing spouse assignment"
    );

    match link_with_retry(&primary, spouse_external_id, deps).await {
        Ok(LinkOutcome::Linked(member)) => member,
        Ok(LinkOutcome::AlreadyLinked(member)) => {
            debug!(
                member_id = %member.id,
                family_id = %member.family_id,
                "Member already linked, converged on existing family"
            );
            member
        }
        Ok(LinkOutcome::SpouseNotFound) => {
            warn!(
                member_id = %primary.id,
                spouse_external_id,
                "Spouse not found, linking can be retried once the spouse enrolls"
            );
            record_unlinked(primary, Unlinked::SpouseNotFound, deps).await
        }
        Err(err) => {
            error!(
                member_id = %primary.id,
                spouse_external_id,
                error = %err,
                "Spouse assignment failed"
            );
            record_unlinked(primary, Unlinked::Failed(err.to_string()), deps).await
        }
    }
}

async fn link_with_retry(
    primary: &Member,
    spouse_external_id: &str,
    deps: &ServerDeps,
) -> Result<LinkOutcome, LinkError> {
    let mut attempt = 1;
    loop {
        match attempt_link(primary, spouse_external_id, deps).await {
            Err(err) if err.is_conflict() && attempt < MAX_LINK_ATTEMPTS => {
                debug!(member_id = %primary.id, attempt, error = %err, "Spouse link conflicted, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// One pass of the protocol against fresh store state.
async fn attempt_link(
    primary: &Member,
    spouse_external_id: &str,
    deps: &ServerDeps,
) -> Result<LinkOutcome, LinkError> {
    let store = deps.identity_store.as_ref();
    let primary = reload(primary, deps).await?;

    // Idempotence: a pair created by an earlier or opposite-direction link wins.
    if let Some(member) = converge_if_linked(&primary, deps).await? {
        return Ok(LinkOutcome::AlreadyLinked(member));
    }

    if spouse_external_id == primary.external_id {
        return Err(LinkError::SelfReference);
    }

    let Some(spouse) = store.find_by_external_id(spouse_external_id).await? else {
        return Ok(LinkOutcome::SpouseNotFound);
    };

    if let Some(existing) = store.find_relationship_by_member_id(spouse.id).await? {
        // An opposite-direction link may have taken us in since the
        // convergence check; retry so the next pass converges on it.
        if store.find_relationship_by_member_id(primary.id).await?.is_some() {
            let reason = format!("member {} linked concurrently", primary.id);
            return Err(StoreError::Conflict(reason).into());
        }
        return Err(LinkError::SpouseLinkedElsewhere {
            spouse_external_id: spouse.external_id,
            family_id: existing.family_id.to_string(),
        });
    }

    // The family event goes out before the link commits: a failed publish
    // rolls the link back and the attempt ends FAILED.
    let link = SpouseLink::new(primary, spouse, deps.clock.now())?;
    let link = store
        .commit_spouse_link(&link, &PublishEvents::new(deps))
        .await?;

    info!(
        family_id = %link.family_id(),
        primary_member_id = %link.primary.id,
        spouse_member_id = %link.spouse.id,
        "Successfully completed spouse assignment"
    );

    Ok(LinkOutcome::Linked(link.primary))
}

/// If `member` already has a relationship record, make sure its own row
/// agrees with it and return the converged row.
async fn converge_if_linked(member: &Member, deps: &ServerDeps) -> Result<Option<Member>, LinkError> {
    let store = deps.identity_store.as_ref();
    let Some(record) = store.find_relationship_by_member_id(member.id).await? else {
        return Ok(None);
    };

    if member.is_spouse_linked() && member.family_id == record.family_id {
        return Ok(Some(member.clone()));
    }

    // Relationship exists but the member row lags behind it: adopt the
    // established family.
    let mut converged = member.clone();
    converged.mark_spouse_completed(record.family_id, deps.clock.now())?;
    Ok(Some(store.save_member(&converged).await?))
}

async fn reload(member: &Member, deps: &ServerDeps) -> Result<Member, StoreError> {
    deps.identity_store
        .find_by_external_id(&member.external_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("member {}", member.external_id)))
}

/// Persist `SPOUSE_NOT_FOUND` or `FAILED` for `primary`.
///
/// Never overwrites `COMPLETED`: on a version conflict the row is reloaded,
/// and if a concurrent link completed it, that row is returned as is. If the
/// status cannot be written at all, the unsaved member is returned so the
/// caller still sees the outcome.
async fn record_unlinked(mut primary: Member, outcome: Unlinked, deps: &ServerDeps) -> Member {
    let store = deps.identity_store.as_ref();

    for _ in 0..MAX_STATUS_WRITES {
        if primary.is_spouse_linked() {
            return primary;
        }

        let mut candidate = primary.clone();
        let transition = match &outcome {
            Unlinked::SpouseNotFound => candidate.mark_spouse_not_found(),
            Unlinked::Failed(reason) => candidate.mark_spouse_failed(reason.as_str()),
        };
        if let Err(e) = transition {
            error!(member_id = %primary.id, error = %e, "Cannot record spouse assignment outcome");
            return primary;
        }

        match store.save_member(&candidate).await {
            Ok(saved) => return saved,
            Err(StoreError::Conflict(_)) => match reload(&primary, deps).await {
                Ok(fresh) => primary = fresh,
                Err(e) => {
                    error!(member_id = %primary.id, error = %e, "Failed to reload member after conflict");
                    return candidate;
                }
            },
            Err(e) => {
                error!(
                    member_id = %primary.id,
                    status = %candidate.spouse_assignment_status,
                    error = %e,
                    "Failed to persist spouse assignment status"
                );
                return candidate;
            }
        }
    }

    error!(member_id = %primary.id, "Gave up persisting spouse assignment status under contention");
    primary
}
