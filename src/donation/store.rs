use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use crate::{
    error::{EcoShareError, Result},
    storage::{Database, Donation, DonationStatus, NewDonation},
};
use tracing::{debug, info};
use uuid::Uuid;

/// Durable record of donations and their status.
#[derive(Clone)]
pub struct DonationStore {
    db: Arc<Database>,
}

impl DonationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validates and persists a new listing as `Available`, returning its id.
    pub fn create(&self, donor_id: &str, new: NewDonation) -> Result<String> {
        self.create_as_of(donor_id, new, Utc::now().date_naive())
    }

    /// Same as [`create`](Self::create) with an explicit notion of "today".
    pub fn create_as_of(&self, donor_id: &str, new: NewDonation, today: NaiveDate) -> Result<String> {
        let donation = validate(donor_id, new, today)?;
        self.db.insert_donation(&donation)?;

        info!(
            "Donation {} created by {}: {} ({})",
            donation.id, donor_id, donation.item_name, donation.food_type
        );
        Ok(donation.id)
    }

    pub fn get(&self, id: &str) -> Result<Donation> {
        self.db
            .get_donation(id)?
            .ok_or_else(|| EcoShareError::NotFound(format!("donation {}", id)))
    }

    /// Available donations in insertion order.
    pub fn list_available(&self) -> Result<Vec<Donation>> {
        self.db.get_donations_by_status(DonationStatus::Available)
    }

    /// Every donation a donor has listed, in any status.
    pub fn list_by_donor(&self, donor_id: &str) -> Result<Vec<Donation>> {
        self.db.get_donations_by_donor(donor_id)
    }

    /// Owner-initiated withdrawal of a donation that nobody has claimed.
    pub fn remove(&self, id: &str, requester_id: &str) -> Result<()> {
        let donation = self.get(id)?;

        if donation.donor_id != requester_id {
            debug!("{} tried to remove donation {} owned by {}", requester_id, id, donation.donor_id);
            return Err(EcoShareError::Forbidden(format!(
                "only the donor may remove donation {}",
                id
            )));
        }

        if donation.status != DonationStatus::Available {
            return Err(removal_conflict(id, donation.status));
        }

        if !self.db.transition_status(id, DonationStatus::Available, DonationStatus::Removed, None)? {
            // A claim landed between the read and the write.
            let current = self.get(id)?;
            return Err(removal_conflict(id, current.status));
        }

        info!("Donation {} removed by its donor", id);
        Ok(())
    }
}

fn removal_conflict(id: &str, status: DonationStatus) -> EcoShareError {
    match status {
        DonationStatus::Claimed => {
            EcoShareError::Conflict(format!("donation {} has been claimed and cannot be withdrawn", id))
        }
        _ => EcoShareError::Conflict(format!("donation {} is already {}", id, status)),
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EcoShareError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}

/// Applies every creation rule before anything is written.
fn validate(donor_id: &str, new: NewDonation, today: NaiveDate) -> Result<Donation> {
    let full_name = required(&new.full_name, "fullName")?.to_string();
    let contact_number = required(&new.contact_number, "contactNumber")?.to_string();
    let food_type = new
        .food_type
        .ok_or_else(|| EcoShareError::Validation("foodType is required".to_string()))?;
    let item_name = required(&new.item_name, "itemName")?.to_string();
    let pickup_address = required(&new.pickup_address, "pickupAddress")?.to_string();

    let (cooking_date, expiry_date) = match (new.cooking_date, new.expiry_date) {
        (Some(cooking), Some(expiry)) => (cooking, expiry),
        _ => {
            return Err(EcoShareError::Validation(
                "cookingDate and expiryDate are both required".to_string(),
            ))
        }
    };

    if cooking_date > today {
        return Err(EcoShareError::Validation(
            "cookingDate cannot be in the future".to_string(),
        ));
    }
    if cooking_date >= expiry_date {
        return Err(EcoShareError::Validation(
            "cookingDate must be before expiryDate".to_string(),
        ));
    }
    if expiry_date <= today {
        return Err(EcoShareError::Validation(
            "expiryDate must be in the future".to_string(),
        ));
    }

    if let Some(weight) = new.weight {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(EcoShareError::Validation("weight must be positive".to_string()));
        }
    }

    Ok(Donation {
        id: Uuid::new_v4().to_string(),
        donor_id: donor_id.to_string(),
        full_name,
        contact_number,
        food_type,
        item_name,
        weight: new.weight,
        cooking_date,
        expiry_date,
        storage_instructions: new.storage_instructions.trim().to_string(),
        pickup_address,
        image_ref: new.image_ref.filter(|r| !r.trim().is_empty()),
        status: DonationStatus::Available,
        claimant_id: None,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{FoodType, User};

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
    }

    pub(crate) fn seed_user(db: &Database, id: &str) {
        let user = User {
            id: id.to_string(),
            name: id.to_string(),
            created_at: Utc::now(),
        };
        db.insert_user(&user, &format!("token-{}", id)).unwrap();
    }

    pub(crate) fn listing(cooked: NaiveDate, expires: NaiveDate) -> NewDonation {
        NewDonation {
            full_name: "Alice Donor".into(),
            contact_number: "555-0100".into(),
            food_type: Some(FoodType::Perishable),
            item_name: "Vegetable curry".into(),
            weight: Some(3.0),
            cooking_date: Some(cooked),
            expiry_date: Some(expires),
            storage_instructions: "Refrigerate".into(),
            pickup_address: "12 Market Road".into(),
            image_ref: Some("https://images.example/curry.jpg".into()),
        }
    }

    fn store_with(users: &[&str]) -> DonationStore {
        let db = Arc::new(Database::in_memory().unwrap());
        for user in users {
            seed_user(&db, user);
        }
        DonationStore::new(db)
    }

    fn yesterday() -> NaiveDate {
        today().pred_opt().unwrap()
    }

    fn tomorrow() -> NaiveDate {
        today().succ_opt().unwrap()
    }

    #[test]
    fn test_create_lists_as_available() {
        let store = store_with(&["alice"]);
        let id = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();

        let available = store.list_available().unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, id);
        assert_eq!(available[0].status, DonationStatus::Available);
        assert_eq!(available[0].claimant_id, None);
    }

    #[test]
    fn test_rejects_cooking_on_or_after_expiry() {
        let store = store_with(&["alice"]);
        let same_day = store.create_as_of("alice", listing(yesterday(), yesterday()), today());
        assert!(matches!(same_day, Err(EcoShareError::Validation(ref m)) if m.contains("expiryDate")));

        let inverted = store.create_as_of("alice", listing(today(), yesterday()), today());
        assert!(matches!(inverted, Err(EcoShareError::Validation(_))));
        assert!(store.list_available().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_future_cooking_date() {
        let store = store_with(&["alice"]);
        let expires = tomorrow().succ_opt().unwrap();
        let result = store.create_as_of("alice", listing(tomorrow(), expires), today());
        assert!(matches!(result, Err(EcoShareError::Validation(ref m)) if m.contains("future")));
    }

    #[test]
    fn test_rejects_already_expired_listing() {
        let store = store_with(&["alice"]);
        let cooked = yesterday().pred_opt().unwrap();
        let result = store.create_as_of("alice", listing(cooked, yesterday()), today());
        assert!(matches!(result, Err(EcoShareError::Validation(ref m)) if m.contains("expiryDate")));
    }

    #[test]
    fn test_rejects_missing_required_fields() {
        let store = store_with(&["alice"]);
        let cases: Vec<(&str, NewDonation)> = vec![
            ("fullName", NewDonation { full_name: " ".into(), ..listing(yesterday(), tomorrow()) }),
            ("contactNumber", NewDonation { contact_number: String::new(), ..listing(yesterday(), tomorrow()) }),
            ("foodType", NewDonation { food_type: None, ..listing(yesterday(), tomorrow()) }),
            ("itemName", NewDonation { item_name: String::new(), ..listing(yesterday(), tomorrow()) }),
            ("pickupAddress", NewDonation { pickup_address: String::new(), ..listing(yesterday(), tomorrow()) }),
        ];

        for (field, new) in cases {
            match store.create_as_of("alice", new, today()) {
                Err(EcoShareError::Validation(msg)) => assert!(msg.contains(field), "{}: {}", field, msg),
                other => panic!("expected validation error for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        let store = store_with(&["alice"]);
        let new = NewDonation { weight: Some(0.0), ..listing(yesterday(), tomorrow()) };
        assert!(matches!(store.create_as_of("alice", new, today()), Err(EcoShareError::Validation(_))));
    }

    #[test]
    fn test_list_available_keeps_insertion_order_and_skips_removed() {
        let store = store_with(&["alice"]);
        let first = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();
        let second = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();
        let third = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();

        store.remove(&second, "alice").unwrap();

        let ids: Vec<String> = store.list_available().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![first, third]);
        assert_eq!(store.list_by_donor("alice").unwrap().len(), 3);
    }

    #[test]
    fn test_remove_errors() {
        let store = store_with(&["alice", "bob"]);
        let id = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();

        assert!(matches!(store.remove("nope", "alice"), Err(EcoShareError::NotFound(_))));
        assert!(matches!(store.remove(&id, "bob"), Err(EcoShareError::Forbidden(_))));

        store.remove(&id, "alice").unwrap();
        assert_eq!(store.get(&id).unwrap().status, DonationStatus::Removed);
        assert!(matches!(store.remove(&id, "alice"), Err(EcoShareError::Conflict(_))));
    }

    #[test]
    fn test_remove_after_claim_is_conflict() {
        let store = store_with(&["alice", "bob"]);
        let id = store.create_as_of("alice", listing(yesterday(), tomorrow()), today()).unwrap();
        assert!(store
            .db
            .transition_status(&id, DonationStatus::Available, DonationStatus::Claimed, Some("bob"))
            .unwrap());

        match store.remove(&id, "alice") {
            Err(EcoShareError::Conflict(msg)) => assert!(msg.contains("claimed")),
            other => panic!("expected conflict, got {:?}", other),
        }
        // A non-owner is still told they lack rights, not about the claim.
        assert!(matches!(store.remove(&id, "bob"), Err(EcoShareError::Forbidden(_))));
        assert_eq!(store.get(&id).unwrap().claimant_id.as_deref(), Some("bob"));
    }
}
