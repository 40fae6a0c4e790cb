use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declares a closed set of labelled values that are stored and parsed by
/// their human-readable label.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let options: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} '{}' (expected one of: {})", stringify!($name), s, options.join(", "))
                    })
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

labelled_enum!(FoodType {
    Perishable => "Perishable",
    NonPerishable => "Non-perishable",
    None => "None",
});

labelled_enum!(
    /// Lifecycle of a donation. Only `Available` may transition, and only
    /// once: to `Claimed` or to `Removed`.
    DonationStatus {
        Available => "Available",
        Claimed => "Claimed",
        Removed => "Removed",
    }
);

labelled_enum!(BillType {
    PurchaseBill => "Purchase Bill",
    ConsumableBill => "Consumable Bill",
});

labelled_enum!(PurchaseMode {
    Online => "Online",
    Offline => "Offline",
    LocalStore => "Local Store",
});

labelled_enum!(EcoCertification {
    None => "None",
    UsdaOrganic => "USDA Organic",
    EnergyStar => "Energy Star",
    FairTrade => "Fair Trade",
});

impl DonationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DonationStatus::Available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Donor-supplied fields of a new listing, prior to validation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewDonation {
    pub full_name: String,
    pub contact_number: String,
    pub food_type: Option<FoodType>,
    pub item_name: String,
    pub weight: Option<f64>,
    pub cooking_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub storage_instructions: String,
    pub pickup_address: String,
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Donation {
    pub id: String,
    pub donor_id: String,
    pub full_name: String,
    pub contact_number: String,
    pub food_type: FoodType,
    pub item_name: String,
    pub weight: Option<f64>,
    pub cooking_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub storage_instructions: String,
    pub pickup_address: String,
    pub image_ref: Option<String>,
    pub status: DonationStatus,
    pub claimant_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    /// Checks the record-level invariants that must hold for every stored
    /// donation regardless of how it got there.
    pub fn check_invariants(&self) -> crate::Result<()> {
        let claimed = self.status == DonationStatus::Claimed;
        if claimed != self.claimant_id.is_some() {
            return Err(crate::EcoShareError::InvariantViolation(format!(
                "donation {} has status {} but claimant {:?}",
                self.id, self.status, self.claimant_id
            )));
        }
        if self.claimant_id.as_deref() == Some(self.donor_id.as_str()) {
            return Err(crate::EcoShareError::InvariantViolation(format!(
                "donation {} is claimed by its own donor",
                self.id
            )));
        }
        if self.expiry_date <= self.cooking_date {
            return Err(crate::EcoShareError::InvariantViolation(format!(
                "donation {} expires before it was cooked",
                self.id
            )));
        }
        Ok(())
    }
}

/// Author-supplied fields of a new blog post.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Target fields of receipt extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptField {
    BillNumber,
    ItemPurchased,
    Vendor,
    TotalAmount,
    PurchaseDate,
}

impl std::fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReceiptField::BillNumber => "billNumber",
            ReceiptField::ItemPurchased => "itemPurchased",
            ReceiptField::Vendor => "vendor",
            ReceiptField::TotalAmount => "totalAmount",
            ReceiptField::PurchaseDate => "purchaseDate",
        };
        f.write_str(name)
    }
}

/// A finalized, immutable receipt submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptSubmission {
    pub user_id: String,
    pub bill_type: BillType,
    pub bill_number: String,
    pub item_purchased: String,
    pub purchase_date: Option<NaiveDate>,
    pub vendor: String,
    pub purchase_mode: PurchaseMode,
    pub eco_certification: EcoCertification,
    pub total_amount: Option<f64>,
    /// Fields that extraction populated; everything else was typed in or left empty.
    pub extracted_fields: BTreeSet<ReceiptField>,
}

/// A submission as persisted, with the points it earned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
    pub id: i64,
    pub submission: ReceiptSubmission,
    pub score_delta: u64,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!("non-perishable".parse::<FoodType>().unwrap(), FoodType::NonPerishable);
        assert_eq!(" Local Store ".parse::<PurchaseMode>().unwrap(), PurchaseMode::LocalStore);
        assert_eq!("usda organic".parse::<EcoCertification>().unwrap(), EcoCertification::UsdaOrganic);
        assert_eq!(BillType::ConsumableBill.to_string(), "Consumable Bill");
    }

    #[test]
    fn test_unknown_label_lists_options() {
        let err = "Frozen".parse::<FoodType>().unwrap_err();
        assert!(err.contains("Perishable, Non-perishable, None"), "{}", err);
    }

    #[test]
    fn test_only_available_is_non_terminal() {
        assert!(!DonationStatus::Available.is_terminal());
        assert!(DonationStatus::Claimed.is_terminal());
        assert!(DonationStatus::Removed.is_terminal());
    }

    #[test]
    fn test_claimed_without_claimant_breaks_invariant() {
        let donation = Donation {
            id: "d1".into(),
            donor_id: "alice".into(),
            full_name: "Alice".into(),
            contact_number: "555-0100".into(),
            food_type: FoodType::Perishable,
            item_name: "Rice".into(),
            weight: None,
            cooking_date: NaiveDate::from_ymd_opt(2024, 3, 24).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 3, 26).unwrap(),
            storage_instructions: String::new(),
            pickup_address: "1 Main St".into(),
            image_ref: None,
            status: DonationStatus::Claimed,
            claimant_id: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            donation.check_invariants(),
            Err(crate::EcoShareError::InvariantViolation(_))
        ));

        let fixed = Donation { claimant_id: Some("bob".into()), ..donation };
        assert!(fixed.check_invariants().is_ok());
    }
}
