//! Daily mission pools.
//!
//! Every member of an operation sees the same missions on a given day. The
//! pool is drawn lazily by whichever request needs it first and stored under
//! a unique (operation, day) key; concurrent draws collapse onto the stored
//! row.

use database::{mission, mission_pool, Category, DailyMissionPool, Difficulty, Json, Mission};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// A daily pool with its missions resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionPool {
    pub operation_id: String,
    pub day_number: u32,
    /// `None` when the catalog was empty and nothing was drawn.
    pub category: Option<Category>,
    pub missions: Vec<Mission>,
}

impl MissionPool {
    pub fn contains(&self, mission_id: &str) -> bool {
        self.missions.iter().any(|m| m.id == mission_id)
    }
}

/// A drawn, not yet stored, pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDraw {
    pub category: Category,
    pub mission_ids: Vec<String>,
}

/// Seed for the pool of one operation/day.
pub fn pool_seed(operation_id: &str, day_number: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(operation_id.as_bytes());
    hasher.update(b":");
    hasher.update(day_number.to_string().as_bytes());
    hasher.finalize().into()
}

/// Draw a pool from `catalog`.
///
/// One category is chosen uniformly; up to `per_tier` missions of that
/// category are sampled per difficulty, and a short selection is topped up
/// from the rest of the catalog. Returns `None` for an empty catalog.
pub fn draw_pool<R: Rng + ?Sized>(
    catalog: &[Mission],
    per_tier: usize,
    rng: &mut R,
) -> Option<PoolDraw> {
    if catalog.is_empty() {
        return None;
    }

    let category = *Category::ALL.choose(rng)?;
    let target = per_tier * Difficulty::ALL.len();
    let mut picked: Vec<&Mission> = Vec::with_capacity(target);

    for difficulty in Difficulty::ALL {
        let tier: Vec<&Mission> = catalog
            .iter()
            .filter(|m| m.category == category && m.difficulty == difficulty)
            .collect();
        picked.extend(tier.choose_multiple(rng, per_tier).copied());
    }

    if picked.len() < target {
        let rest: Vec<&Mission> = catalog
            .iter()
            .filter(|m| !picked.iter().any(|p| p.id == m.id))
            .collect();
        let missing = target - picked.len();
        picked.extend(rest.choose_multiple(rng, missing).copied());
    }

    Some(PoolDraw {
        category,
        mission_ids: picked.into_iter().map(|m| m.id.clone()).collect(),
    })
}

impl Engine {
    /// Get the pool for an operation/day, drawing and storing it if needed.
    ///
    /// Losing a creation race is not an error: the stored pool is returned.
    pub async fn get_or_create_pool(
        &self,
        operation_id: &str,
        day_number: u32,
    ) -> Result<MissionPool> {
        let pool = self.db.pool();
        let day = i64::from(day_number);

        if let Some(existing) = mission_pool::get_pool(pool, operation_id, day).await? {
            return self.resolve(existing).await;
        }

        // Fails with NotFound before we draw for an operation that is gone.
        self.load_operation(operation_id).await?;

        let catalog = mission::list_missions(pool).await?;
        let mut rng = StdRng::from_seed(pool_seed(operation_id, day_number));
        let Some(draw) = draw_pool(&catalog, self.policy.missions_per_tier, &mut rng) else {
            debug!(operation_id = %operation_id, day_number, "Mission catalog is empty");
            return Ok(MissionPool {
                operation_id: operation_id.to_string(),
                day_number,
                category: None,
                missions: Vec::new(),
            });
        };

        let record = DailyMissionPool {
            id: uuid::Uuid::new_v4().to_string(),
            operation_id: operation_id.to_string(),
            day_number: day,
            category: draw.category,
            mission_ids: Json(draw.mission_ids),
            created_at: self.now(),
        };

        if mission_pool::insert_pool_if_absent(pool, &record).await? {
            info!(
                operation_id = %operation_id,
                day_number,
                category = record.category.as_str(),
                missions = record.mission_ids.0.len(),
                "Created daily mission pool"
            );
            return self.resolve(record).await;
        }

        debug!(operation_id = %operation_id, day_number, "Pool created concurrently, re-reading");
        let winner = mission_pool::get_pool(pool, operation_id, day)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "DailyMissionPool",
                id: format!("{}/{}", operation_id, day_number),
            })?;
        self.resolve(winner).await
    }

    async fn resolve(&self, record: DailyMissionPool) -> Result<MissionPool> {
        let missions = mission::get_missions_by_ids(self.db.pool(), &record.mission_ids.0).await?;
        Ok(MissionPool {
            operation_id: record.operation_id,
            day_number: u32::try_from(record.day_number).unwrap_or(1),
            category: Some(record.category),
            missions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use std::collections::HashSet;

    fn mission(id: &str, category: Category, difficulty: Difficulty) -> Mission {
        Mission {
            id: id.to_string(),
            category,
            title: id.to_string(),
            objective: String::new(),
            difficulty,
            points: difficulty.points(),
        }
    }

    #[test]
    fn test_full_catalog_draws_three_per_tier_of_one_category() {
        let catalog = default_catalog();
        for day in 1..=30 {
            let mut rng = StdRng::from_seed(pool_seed("op-full", day));
            let draw = draw_pool(&catalog, 3, &mut rng).unwrap();
            assert_eq!(draw.mission_ids.len(), 9);

            let drawn: Vec<&Mission> = draw
                .mission_ids
                .iter()
                .map(|id| catalog.iter().find(|m| &m.id == id).unwrap())
                .collect();
            assert!(drawn.iter().all(|m| m.category == draw.category));
            for difficulty in Difficulty::ALL {
                assert_eq!(drawn.iter().filter(|m| m.difficulty == difficulty).count(), 3);
            }
        }
    }

    #[test]
    fn test_same_seed_same_pool() {
        let catalog = default_catalog();
        let a = draw_pool(&catalog, 3, &mut StdRng::from_seed(pool_seed("op", 4)));
        let b = draw_pool(&catalog, 3, &mut StdRng::from_seed(pool_seed("op", 4)));
        assert_eq!(a, b);
        assert_ne!(pool_seed("op", 4), pool_seed("op", 5));
        assert_ne!(pool_seed("op1", 1), pool_seed("op", 11));
    }

    #[test]
    fn test_sparse_tier_is_topped_up_without_duplicates() {
        // Every category has a single easy mission; the rest is spread out.
        let mut catalog = Vec::new();
        for (i, category) in Category::ALL.iter().enumerate() {
            catalog.push(mission(&format!("e{}", i), *category, Difficulty::Easy));
            catalog.push(mission(&format!("m{}", i), *category, Difficulty::Medium));
            catalog.push(mission(&format!("h{}", i), *category, Difficulty::Hard));
        }

        let mut rng = StdRng::seed_from_u64(99);
        let draw = draw_pool(&catalog, 3, &mut rng).unwrap();
        assert_eq!(draw.mission_ids.len(), 9);
        let unique: HashSet<_> = draw.mission_ids.iter().collect();
        assert_eq!(unique.len(), 9);

        // The chosen category's three missions come first.
        let own: Vec<_> = catalog
            .iter()
            .filter(|m| m.category == draw.category)
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(draw.mission_ids[..3].to_vec(), own);
    }

    #[test]
    fn test_tiny_catalog_returns_everything() {
        let catalog = vec![
            mission("a", Category::Coleta, Difficulty::Easy),
            mission("b", Category::Disfarce, Difficulty::Hard),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let draw = draw_pool(&catalog, 3, &mut rng).unwrap();
        let mut ids = draw.mission_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_empty_catalog() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(draw_pool(&[], 3, &mut rng).is_none());
    }
}
