pub mod store;

pub use store::{BlogStore, PostDetails};
