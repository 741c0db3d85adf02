//! Reactions and favorites on submitted evidence.

use database::{engagement, AssignedMission, ReactionType};
use serde::Serialize;
use tracing::debug;

use crate::engine::Engine;
use crate::error::Result;

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Added,
    Removed,
}

impl ToggleAction {
    /// A toggle removes an edge that exists and adds one that does not.
    pub fn for_existing(exists: bool) -> Self {
        if exists {
            ToggleAction::Removed
        } else {
            ToggleAction::Added
        }
    }
}

impl Engine {
    /// Add or remove the caller's reaction of one type.
    pub async fn toggle_reaction(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        user_id: &str,
        reaction_type: ReactionType,
    ) -> Result<ToggleAction> {
        self.load_target(operation_id, assigned_mission_id, user_id).await?;
        let pool = self.db.pool();

        let exists =
            engagement::reaction_exists(pool, assigned_mission_id, user_id, reaction_type).await?;
        let action = ToggleAction::for_existing(exists);
        match action {
            ToggleAction::Removed => {
                engagement::remove_reaction(pool, assigned_mission_id, user_id, reaction_type).await?;
            }
            ToggleAction::Added => {
                engagement::add_reaction(pool, assigned_mission_id, user_id, reaction_type, self.now())
                    .await?;
            }
        }

        debug!(
            assigned_mission_id = %assigned_mission_id,
            user_id = %user_id,
            ?reaction_type,
            ?action,
            "Reaction toggled"
        );
        Ok(action)
    }

    /// Add or remove the caller's favorite mark.
    pub async fn toggle_favorite(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        user_id: &str,
    ) -> Result<ToggleAction> {
        self.load_target(operation_id, assigned_mission_id, user_id).await?;
        let pool = self.db.pool();

        let exists = engagement::favorite_exists(pool, assigned_mission_id, user_id).await?;
        let action = ToggleAction::for_existing(exists);
        match action {
            ToggleAction::Removed => {
                engagement::remove_favorite(pool, assigned_mission_id, user_id).await?;
            }
            ToggleAction::Added => {
                engagement::add_favorite(pool, assigned_mission_id, user_id, self.now()).await?;
            }
        }

        debug!(assigned_mission_id = %assigned_mission_id, user_id = %user_id, ?action, "Favorite toggled");
        Ok(action)
    }

    async fn load_target(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        user_id: &str,
    ) -> Result<AssignedMission> {
        self.require_member(operation_id, user_id).await?;
        self.load_assignment_in(operation_id, assigned_mission_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_existing_state() {
        assert_eq!(ToggleAction::for_existing(false), ToggleAction::Added);
        assert_eq!(ToggleAction::for_existing(true), ToggleAction::Removed);
    }
}
