pub mod db;
pub mod models;

pub use db::{Database, DatabaseStats};
pub use models::{
    BillType, Comment, Donation, DonationStatus, EcoCertification, FoodType, NewDonation, NewPost,
    Post, PurchaseMode, ReceiptField, ReceiptSubmission, SubmissionRecord, User,
};
