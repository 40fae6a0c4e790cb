use std::sync::Arc;
use serde::Serialize;
use crate::{error::Result, score::badge::Badge, storage::Database};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub green_score: u64,
    pub badge: Badge,
}

/// Read-only ranking over every user's score, recomputed on each read.
#[derive(Clone)]
pub struct Leaderboard {
    db: Arc<Database>,
}

impl Leaderboard {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The `n` highest scores, descending; equal scores order by user id.
    pub fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let entries = self
            .db
            .get_top_scores(n)?
            .into_iter()
            .enumerate()
            .map(|(i, (user, green_score))| LeaderboardEntry {
                rank: i + 1,
                user_id: user.id,
                name: user.name,
                green_score,
                badge: Badge::for_score(green_score),
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::donation::store::tests::seed_user;
    use crate::score::ScoreEngine;
    use crate::storage::{BillType, EcoCertification, PurchaseMode, ReceiptSubmission};

    /// Every receipt is worth exactly one point with these weights.
    fn one_point() -> ScoringConfig {
        ScoringConfig {
            no_certification: 1,
            online: 0,
            purchase_bill: 0,
            ..ScoringConfig::default()
        }
    }

    fn award(engine: &ScoreEngine, user: &str, points: u64) {
        let r = ReceiptSubmission {
            user_id: user.to_string(),
            bill_type: BillType::PurchaseBill,
            bill_number: String::new(),
            item_purchased: String::new(),
            purchase_date: None,
            vendor: String::new(),
            purchase_mode: PurchaseMode::Online,
            eco_certification: EcoCertification::None,
            total_amount: None,
            extracted_fields: Default::default(),
        };
        for _ in 0..points {
            engine.submit(&r).unwrap();
        }
    }

    fn board(scores: &[(&str, u64)]) -> Leaderboard {
        let db = Arc::new(Database::in_memory().unwrap());
        let engine = ScoreEngine::new(db.clone(), one_point());
        for (user, points) in scores {
            seed_user(&db, user);
            award(&engine, user, *points);
        }
        Leaderboard::new(db)
    }

    #[test]
    fn test_ties_break_by_user_id() {
        let board = board(&[("C", 150), ("B", 200), ("A", 200)]);
        let top: Vec<(String, u64)> = board
            .top_n(2)
            .unwrap()
            .into_iter()
            .map(|e| (e.user_id, e.green_score))
            .collect();

        assert_eq!(top, vec![("A".to_string(), 200), ("B".to_string(), 200)]);
    }

    #[test]
    fn test_ranks_and_badges() {
        let board = board(&[("x", 3), ("y", 60), ("z", 25)]);
        let entries = board.top_n(10).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].user_id, "y");
        assert_eq!(entries[0].badge, Badge::SustainabilityChampion);
        assert_eq!(entries[2].user_id, "x");
        assert_eq!(entries[2].badge, Badge::EcoBeginner);
    }

    #[test]
    fn test_zero_and_empty() {
        assert!(board(&[("x", 3)]).top_n(0).unwrap().is_empty());
        assert!(board(&[]).top_n(5).unwrap().is_empty());
    }
}
