//! Seasonal stocking priorities tool definition.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::calendar::{SeasonCalendar, season_profile};
use crate::core::config::SeasonConfig;
use crate::core::protocol::Params;
use crate::domains::tools::ToolError;
use crate::domains::tools::handlers::{ToolDefinition, ToolHandler, parse_params, schema_for};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetSeasonParams {}

/// Reports the current season and what to stock for it.
pub struct GetSeasonTool {
    calendar: SeasonCalendar,
}

impl GetSeasonTool {
    pub const NAME: &'static str = "get_season";
    pub const DESCRIPTION: &'static str =
        "Get current seasonal product priorities based on weather/season.";

    const DATE_FORMAT: &'static str = "%d/%m/%Y";

    pub fn new(calendar: SeasonCalendar) -> Self {
        Self { calendar }
    }

    /// Season report for `date`. Everything except `current_date` depends
    /// only on the month.
    pub fn report(calendar: &SeasonCalendar, date: NaiveDate) -> Value {
        let current_date = date.format(Self::DATE_FORMAT).to_string();
        let season = calendar.season_for(date.month());

        let Some(profile) = season_profile(season) else {
            warn!("No priority data for season '{}'", season);
            return json!({
                "current_date": current_date,
                "current_season": season,
                "error": format!("no priority data for season '{}'", season),
            });
        };

        let focus: Vec<&str> = profile.high_priority.iter().take(3).copied().collect();
        json!({
            "current_date": current_date,
            "current_season": season,
            "high_priority_products": profile.high_priority,
            "medium_priority_products": profile.medium_priority,
            "priority_multiplier": profile.multiplier,
            "recommendation": format!(
                "Current season is {}. Focus on stocking {} and related items.",
                season,
                focus.join(", ")
            ),
        })
    }

    pub fn to_definition(config: &SeasonConfig) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<GetSeasonParams>(),
            Arc::new(Self::new(config.calendar.clone())),
        )
    }
}

#[async_trait::async_trait]
impl ToolHandler for GetSeasonTool {
    async fn call(&self, params: Params) -> Result<Value, ToolError> {
        let _: GetSeasonParams = parse_params(params)?;
        let today = Local::now().date_naive();
        debug!("Computing season report for {}", today);
        Ok(Self::report(&self.calendar, today))
    }
}
