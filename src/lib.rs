pub mod elo;
pub mod elo_update;
pub mod error;
pub mod fixtures;
pub mod league_params;
pub mod logging;
pub mod match_sim;
pub mod ratings;
pub mod season;
pub mod season_input;
pub mod summary;
pub mod table;

pub use error::SimError;
