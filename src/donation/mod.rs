pub mod claim;
pub mod store;

pub use claim::ClaimCoordinator;
pub use store::DonationStore;
