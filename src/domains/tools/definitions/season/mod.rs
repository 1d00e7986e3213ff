pub mod calendar;
pub mod get_season;

pub use calendar::{SeasonCalendar, SeasonProfile, season_profile};
pub use get_season::GetSeasonTool;
