pub mod competition;
pub mod config;
pub mod error;
pub mod fetch;
pub mod form;
pub mod live_status;
pub mod match_scraper;
pub mod openligadb;
pub mod opponent_analysis;
pub mod output;
pub mod soccerway;
pub mod sokkerpro;
pub mod spa;
pub mod standings;
pub mod stats_site;
pub mod streaks;
pub mod structured_data;
pub mod tables;
pub mod team_names;
pub mod types;
pub mod utils;

pub use config::ScraperConfig;
pub use error::ExtractError;
pub use match_scraper::{MatchScraper, ParseOutput, Source};
pub use types::MatchRecord;
