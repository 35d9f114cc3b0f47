pub mod args;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;

pub use client::{Savant, SearchOptions, SearchResult};
pub use config::Settings;
pub use controller::assemble::{Cell, Table};
pub use controller::leaderboard::Leaderboard;
pub use controller::lookup::{IdSource, LookupTable};
pub use error::QueryError;
pub use model::{Param, ParamValue, QueryArgs};
