pub mod assemble;
pub mod download;
pub mod leaderboard;
pub mod lookup;
pub mod query;
pub mod search;
