use std::sync::Arc;
use crate::{
    error::{EcoShareError, Result},
    storage::{Database, Donation, DonationStatus},
};
use tracing::{debug, info, warn};

/// The only path that moves a donation to `Claimed`.
///
/// Checks run in a fixed order: existence, self-claim, availability. The
/// final transition is a single conditional update against the store, so of
/// any number of concurrent claimers exactly one wins and the rest see
/// [`EcoShareError::AlreadyClaimed`]. Lost races are reported, never retried.
#[derive(Clone)]
pub struct ClaimCoordinator {
    db: Arc<Database>,
}

impl ClaimCoordinator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn claim(&self, donation_id: &str, receiver_id: &str) -> Result<Donation> {
        let donation = self
            .db
            .get_donation(donation_id)?
            .ok_or_else(|| EcoShareError::NotFound(format!("donation {}", donation_id)))?;

        if donation.donor_id == receiver_id {
            debug!("Donor {} attempted to claim own donation {}", receiver_id, donation_id);
            return Err(EcoShareError::SelfClaim(donation_id.to_string()));
        }

        if donation.status != DonationStatus::Available {
            debug!("Donation {} is {}, claim by {} rejected", donation_id, donation.status, receiver_id);
            return Err(EcoShareError::AlreadyClaimed(donation_id.to_string()));
        }

        let won = self.db.transition_status(
            donation_id,
            DonationStatus::Available,
            DonationStatus::Claimed,
            Some(receiver_id),
        )?;

        if !won {
            warn!("Receiver {} lost the race for donation {}", receiver_id, donation_id);
            return Err(EcoShareError::AlreadyClaimed(donation_id.to_string()));
        }

        let claimed = Donation {
            status: DonationStatus::Claimed,
            claimant_id: Some(receiver_id.to_string()),
            ..donation
        };
        claimed.check_invariants()?;

        info!("Donation {} claimed by {}", donation_id, receiver_id);
        Ok(claimed)
    }
}
