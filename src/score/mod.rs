pub mod badge;
pub mod engine;
pub mod leaderboard;

pub use badge::Badge;
pub use engine::{ScoreEngine, UserScore};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
