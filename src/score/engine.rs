use std::sync::Arc;
use serde::Serialize;
use crate::{
    config::ScoringConfig,
    error::{EcoShareError, Result},
    score::badge::Badge,
    storage::{
        BillType, Database, EcoCertification, PurchaseMode, ReceiptSubmission, SubmissionRecord,
    },
};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserScore {
    pub user_id: String,
    pub green_score: u64,
    pub badge: Badge,
}

impl UserScore {
    pub fn new(user_id: impl Into<String>, green_score: u64) -> Self {
        Self {
            user_id: user_id.into(),
            green_score,
            badge: Badge::for_score(green_score),
        }
    }
}

/// Accrues green score from finalized receipt submissions.
#[derive(Clone)]
pub struct ScoreEngine {
    db: Arc<Database>,
    weights: ScoringConfig,
}

impl ScoreEngine {
    pub fn new(db: Arc<Database>, weights: ScoringConfig) -> Self {
        Self { db, weights }
    }

    /// Points a submission earns: certification + purchase mode + bill type.
    pub fn score_delta(&self, submission: &ReceiptSubmission) -> u64 {
        let certification = match submission.eco_certification {
            EcoCertification::None => self.weights.no_certification,
            EcoCertification::UsdaOrganic => self.weights.usda_organic,
            EcoCertification::EnergyStar => self.weights.energy_star,
            EcoCertification::FairTrade => self.weights.fair_trade,
        };
        let mode = match submission.purchase_mode {
            PurchaseMode::LocalStore => self.weights.local_store,
            PurchaseMode::Offline => self.weights.offline,
            PurchaseMode::Online => self.weights.online,
        };
        let bill = match submission.bill_type {
            BillType::PurchaseBill => self.weights.purchase_bill,
            BillType::ConsumableBill => self.weights.consumable_bill,
        };

        certification.saturating_add(mode).saturating_add(bill)
    }

    /// Records the submission and adds its points to the user's score.
    pub fn submit(&self, submission: &ReceiptSubmission) -> Result<UserScore> {
        if self.db.get_user(&submission.user_id)?.is_none() {
            return Err(EcoShareError::Validation(format!(
                "unknown user {}",
                submission.user_id
            )));
        }
        if let Some(amount) = submission.total_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(EcoShareError::Validation(
                    "totalAmount cannot be negative".to_string(),
                ));
            }
        }

        let delta = self.score_delta(submission);
        let total = self.db.record_submission(submission, delta)?;

        info!(
            "User {} earned {} points ({} / {} / {}), total {}",
            submission.user_id,
            delta,
            submission.eco_certification,
            submission.purchase_mode,
            submission.bill_type,
            total
        );
        Ok(UserScore::new(submission.user_id.clone(), total))
    }

    pub fn get_score(&self, user_id: &str) -> Result<UserScore> {
        self.db
            .get_score(user_id)?
            .map(|score| UserScore::new(user_id, score))
            .ok_or_else(|| EcoShareError::NotFound(format!("user {}", user_id)))
    }

    /// Append-only submission history, oldest first.
    pub fn history(&self, user_id: &str) -> Result<Vec<SubmissionRecord>> {
        self.db.get_submission_history(user_id)
    }
}
