//! Peer review of submitted evidence.
//!
//! Every vote re-evaluates the tally against the current roster size. The
//! first vote that finds a majority claims the submission with a conditional
//! update on `scored_at`, in the same transaction that credits the points;
//! only that caller notifies, so a burst of votes past the threshold scores
//! the submission once.

use database::assignment::{self, ApprovalCredit};
use database::{member, mission, vote, AssignmentStatus, Decision, Mission, VoteValue};
use dispatch::{DomainEvent, Notification};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::progress::Rank;

/// Votes of one kind needed to decide a submission.
pub fn majority(member_count: i64) -> i64 {
    let members = member_count.max(1);
    (members + 1) / 2
}

/// Tally after a vote, and what (if anything) this vote decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub approves: i64,
    pub rejects: i64,
    pub majority: i64,
    /// Set only for the vote that scored the submission.
    pub decided: Option<Decision>,
    pub points_awarded: i64,
}

impl Engine {
    /// Record a vote and score the submission if it reaches a majority.
    pub async fn cast_vote(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        voter_id: &str,
        value: VoteValue,
    ) -> Result<VoteOutcome> {
        let pool = self.db.pool();
        self.require_member(operation_id, voter_id).await?;

        let assigned = self
            .load_assignment_in(operation_id, assigned_mission_id)
            .await?;
        if assigned.user_id == voter_id {
            return Err(EngineError::SelfVote);
        }
        if !matches!(
            assigned.status,
            AssignmentStatus::Completed | AssignmentStatus::Rejected
        ) {
            return Err(EngineError::WrongAssignmentStatus {
                expected: AssignmentStatus::Completed.as_str(),
                actual: assigned.status.as_str(),
            });
        }

        // Loaded up front so a won claim never fails on a lookup.
        let reviewed = mission::get_mission(pool, &assigned.mission_id).await?;

        let now = self.now();
        vote::upsert_vote(pool, assigned_mission_id, voter_id, value, now).await?;

        let tally = vote::tally(pool, assigned_mission_id).await?;
        let members = member::count_members(pool, operation_id).await?;
        let needed = majority(members);

        let mut outcome = VoteOutcome {
            approves: tally.approves,
            rejects: tally.rejects,
            majority: needed,
            decided: None,
            points_awarded: 0,
        };

        if tally.approves >= needed {
            let credit = assignment::approve_and_credit(
                pool,
                assigned_mission_id,
                reviewed.points,
                now,
                |completed| Rank::for_completed(completed).as_str(),
            )
            .await?;
            match credit {
                Some(credit) => {
                    self.announce_approval(
                        operation_id,
                        assigned_mission_id,
                        &assigned.user_id,
                        &reviewed,
                        credit,
                    )
                    .await;
                    outcome.decided = Some(Decision::Approved);
                    outcome.points_awarded = reviewed.points;
                }
                None => debug!(assigned_mission_id = %assigned_mission_id, "Already scored"),
            }
        } else if tally.rejects >= needed {
            if assignment::claim_rejection(pool, assigned_mission_id, now).await? {
                self.announce_rejection(operation_id, assigned_mission_id, &assigned.user_id, &reviewed)
                    .await;
                outcome.decided = Some(Decision::Rejected);
            } else {
                debug!(assigned_mission_id = %assigned_mission_id, "Already scored");
            }
        }

        Ok(outcome)
    }

    async fn announce_approval(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        submitter_id: &str,
        mission: &Mission,
        credit: ApprovalCredit,
    ) {
        if !credit.member_credited {
            warn!(
                operation_id = %operation_id,
                user_id = %submitter_id,
                "Submitter left before approval; points not credited"
            );
        }

        info!(
            operation_id = %operation_id,
            assigned_mission_id = %assigned_mission_id,
            user_id = %submitter_id,
            points = mission.points,
            "Submission approved"
        );

        let notification = Notification::new(
            "Missao aprovada",
            format!("Sua evidencia foi aprovada: {}", mission.title),
        )
        .with_data(json!({
            "operationId": operation_id,
            "assignedMissionId": assigned_mission_id,
            "type": "vote_approved",
        }));
        self.notify(vec![submitter_id.to_string()], notification).await;

        self.publish(DomainEvent::VoteScored {
            operation_id: operation_id.to_string(),
            assigned_mission_id: assigned_mission_id.to_string(),
            approved: true,
            points: mission.points,
        });

        self.announce_rank_up(submitter_id, credit.missions_completed).await;
    }

    async fn announce_rejection(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        submitter_id: &str,
        mission: &Mission,
    ) {
        info!(
            operation_id = %operation_id,
            assigned_mission_id = %assigned_mission_id,
            user_id = %submitter_id,
            "Submission rejected"
        );

        let notification = Notification::new(
            "Missao rejeitada",
            format!("Sua evidencia foi rejeitada: {}", mission.title),
        )
        .with_data(json!({
            "operationId": operation_id,
            "assignedMissionId": assigned_mission_id,
            "type": "vote_rejected",
        }));
        self.notify(vec![submitter_id.to_string()], notification).await;

        self.publish(DomainEvent::VoteScored {
            operation_id: operation_id.to_string(),
            assigned_mission_id: assigned_mission_id.to_string(),
            approved: false,
            points: 0,
        });
    }
}
