//! Ranks and badges.

use chrono::{DateTime, Utc};
use database::{Badge, MemberOutcome, Membership, Operation};
use dispatch::Notification;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::engine::Engine;

/// Career rank, earned by approved missions across all operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rank {
    Recruta,
    Agente,
    Senior,
    Operador,
    Veterano,
    Lenda,
}

impl Rank {
    /// Every rank, lowest first.
    pub const ALL: [Rank; 6] = [
        Rank::Recruta,
        Rank::Agente,
        Rank::Senior,
        Rank::Operador,
        Rank::Veterano,
        Rank::Lenda,
    ];

    /// Approved missions needed to hold this rank.
    pub fn threshold(&self) -> i64 {
        match self {
            Rank::Recruta => 0,
            Rank::Agente => 5,
            Rank::Senior => 15,
            Rank::Operador => 30,
            Rank::Veterano => 50,
            Rank::Lenda => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Recruta => "RECRUTA",
            Rank::Agente => "AGENTE",
            Rank::Senior => "SENIOR",
            Rank::Operador => "OPERADOR",
            Rank::Veterano => "VETERANO",
            Rank::Lenda => "LENDA",
        }
    }

    pub fn for_completed(completed: i64) -> Rank {
        Rank::ALL
            .iter()
            .rev()
            .copied()
            .find(|rank| completed >= rank.threshold())
            .unwrap_or(Rank::Recruta)
    }

    /// Lenient parse of a stored rank. Unknown values read as `Recruta`.
    pub fn parse(raw: &str) -> Rank {
        let letters: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match letters.as_str() {
            "AGENTE" => Rank::Agente,
            // "SÊNIOR" loses its accented letter above.
            "SENIOR" | "SNIOR" => Rank::Senior,
            "OPERADOR" => Rank::Operador,
            "VETERANO" => Rank::Veterano,
            "LENDA" => Rank::Lenda,
            _ => Rank::Recruta,
        }
    }
}

/// Whether moving from `previous` to `next` is a promotion.
pub fn did_rank_up(previous: &str, next: &str) -> bool {
    Rank::parse(next) > Rank::parse(previous)
}

pub const BADGE_MVP: &str = "mvp";
pub const BADGE_FLAWLESS: &str = "flawless";
pub const BADGE_RELENTLESS: &str = "relentless";

fn badge(kind: &str, name: &str, description: &str, operation: &Operation, now: DateTime<Utc>) -> Badge {
    Badge {
        kind: kind.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        operation_id: Some(operation.id.clone()),
        earned_at: Some(now),
    }
}

/// Badges earned by the final roster of a finished operation.
///
/// - `mvp`: the highest point total, if above zero (ties share it)
/// - `flawless`: at least one approved mission and none rejected
/// - `relentless`: approved missions on at least `duration_days` distinct days
pub fn operation_badges(
    operation: &Operation,
    roster: &[Membership],
    outcomes: &[MemberOutcome],
    now: DateTime<Utc>,
) -> Vec<(String, Badge)> {
    let mut awards = Vec::new();

    let top = roster.iter().map(|m| m.total_points).max().unwrap_or(0);
    if top > 0 {
        for member in roster.iter().filter(|m| m.total_points == top) {
            awards.push((
                member.user_id.clone(),
                badge(BADGE_MVP, "MVP", "Maior pontuacao da operacao", operation, now),
            ));
        }
    }

    for outcome in outcomes {
        if !roster.iter().any(|m| m.user_id == outcome.user_id) {
            continue;
        }
        if outcome.approved >= 1 && outcome.rejected == 0 {
            awards.push((
                outcome.user_id.clone(),
                badge(BADGE_FLAWLESS, "Impecavel", "Nenhuma evidencia rejeitada", operation, now),
            ));
        }
        if outcome.approved_days >= operation.duration_days {
            awards.push((
                outcome.user_id.clone(),
                badge(BADGE_RELENTLESS, "Implacavel", "Missao aprovada em todos os dias", operation, now),
            ));
        }
    }

    awards
}

impl Engine {
    /// Tell the user about a promotion earned by their latest approval.
    pub(crate) async fn announce_rank_up(&self, user_id: &str, missions_completed: i64) {
        let previous = Rank::for_completed(missions_completed - 1);
        let current = Rank::for_completed(missions_completed);
        if !did_rank_up(previous.as_str(), current.as_str()) {
            return;
        }

        info!(user_id = %user_id, rank = current.as_str(), "Rank up");
        let notification = Notification::new(
            "Promocao",
            format!("Voce agora e {}", current.as_str()),
        )
        .with_data(json!({
            "type": "rank_up",
            "rank": current.as_str(),
            "previousRank": previous.as_str(),
        }));
        self.notify(vec![user_id.to_string()], notification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use database::{MemberRole, OperationStatus};

    fn operation(duration_days: i64) -> Operation {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        Operation {
            id: "op1".to_string(),
            name: "Op".to_string(),
            creator_id: "alice".to_string(),
            duration_days,
            daily_reset_hour: 9,
            status: OperationStatus::Active,
            invite_code: "ABCDEF".to_string(),
            started_at: Some(start),
            ends_at: Some(start + chrono::Duration::days(duration_days)),
            completed_at: None,
            created_at: start,
        }
    }

    fn member(user_id: &str, points: i64) -> Membership {
        Membership {
            operation_id: "op1".to_string(),
            user_id: user_id.to_string(),
            role: MemberRole::Member,
            total_points: points,
            joined_at: Utc::now(),
        }
    }

    fn outcome(user_id: &str, approved: i64, rejected: i64, approved_days: i64) -> MemberOutcome {
        MemberOutcome {
            user_id: user_id.to_string(),
            approved,
            rejected,
            approved_days,
        }
    }

    fn kinds_for<'a>(awards: &'a [(String, Badge)], user: &str) -> Vec<&'a str> {
        awards
            .iter()
            .filter(|(u, _)| u == user)
            .map(|(_, b)| b.kind.as_str())
            .collect()
    }

    #[test]
    fn test_rank_thresholds() {
        assert_eq!(Rank::for_completed(0), Rank::Recruta);
        assert_eq!(Rank::for_completed(4), Rank::Recruta);
        assert_eq!(Rank::for_completed(5), Rank::Agente);
        assert_eq!(Rank::for_completed(15), Rank::Senior);
        assert_eq!(Rank::for_completed(49), Rank::Operador);
        assert_eq!(Rank::for_completed(50), Rank::Veterano);
        assert_eq!(Rank::for_completed(1000), Rank::Lenda);
    }

    #[test]
    fn test_rank_parse_and_promotion() {
        assert_eq!(Rank::parse("senior"), Rank::Senior);
        assert_eq!(Rank::parse("Sênior"), Rank::Senior);
        assert_eq!(Rank::parse("lenda "), Rank::Lenda);
        assert_eq!(Rank::parse("general"), Rank::Recruta);

        assert!(did_rank_up("RECRUTA", "AGENTE"));
        assert!(!did_rank_up("AGENTE", "AGENTE"));
        assert!(!did_rank_up("LENDA", "SENIOR"));
        assert!(did_rank_up("", "SENIOR"));
    }

    #[test]
    fn test_mvp_ties_and_zero() {
        let op = operation(7);
        let roster = vec![member("a", 40), member("b", 40), member("c", 10)];
        let awards = operation_badges(&op, &roster, &[], Utc::now());
        assert_eq!(kinds_for(&awards, "a"), vec![BADGE_MVP]);
        assert_eq!(kinds_for(&awards, "b"), vec![BADGE_MVP]);
        assert!(kinds_for(&awards, "c").is_empty());

        let scoreless = vec![member("a", 0), member("b", 0)];
        assert!(operation_badges(&op, &scoreless, &[], Utc::now()).is_empty());
    }

    #[test]
    fn test_flawless_and_relentless() {
        let op = operation(7);
        let roster = vec![member("a", 70), member("b", 30), member("c", 0)];
        let outcomes = vec![
            outcome("a", 7, 1, 7),
            outcome("b", 2, 0, 2),
            outcome("c", 0, 0, 0),
            // Left before the end: no badges.
            outcome("gone", 5, 0, 7),
        ];
        let awards = operation_badges(&op, &roster, &outcomes, Utc::now());

        assert_eq!(kinds_for(&awards, "a"), vec![BADGE_MVP, BADGE_RELENTLESS]);
        assert_eq!(kinds_for(&awards, "b"), vec![BADGE_FLAWLESS]);
        assert!(kinds_for(&awards, "c").is_empty());
        assert!(kinds_for(&awards, "gone").is_empty());
        assert!(awards.iter().all(|(_, b)| b.operation_id.as_deref() == Some("op1")));
    }
}
