//! Month → season mapping and the seasonal priority catalog.
//!
//! The default calendar sends September to November to "autumn", which has
//! no catalog entry, and never selects "spring" even though it is
//! catalogued. This mirrors the inventory data as shipped and is left to the
//! operator to change through `MCP_SEASON_CALENDAR`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::error::Error;

/// Season label for each calendar month, January first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct SeasonCalendar {
    months: [String; 12],
}

impl SeasonCalendar {
    pub const DEFAULT_SPEC: &'static str = "12,1,2=winter;3,4,5=summer;6,7,8=rainy;9,10,11=autumn";

    /// Season label for a 1-based month.
    pub fn season_for(&self, month: u32) -> &str {
        let index = (month.clamp(1, 12) - 1) as usize;
        &self.months[index]
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        let months = [
            "winter", "winter", "summer", "summer", "summer", "rainy", "rainy", "rainy", "autumn",
            "autumn", "autumn", "winter",
        ]
        .map(String::from);
        Self { months }
    }
}

/// Parses `"12,1,2=winter;3,4,5=summer;..."`. Every month must be assigned
/// exactly once.
impl FromStr for SeasonCalendar {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut months: [Option<String>; 12] = Default::default();

        for group in spec.split(';').map(str::trim).filter(|g| !g.is_empty()) {
            let (list, season) = group
                .split_once('=')
                .ok_or_else(|| Error::config(format!("season group without '=': {}", group)))?;
            let season = season.trim();
            if season.is_empty() {
                return Err(Error::config(format!("empty season name in: {}", group)));
            }

            for month in list.split(',') {
                let month: usize = month
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("invalid month: {:?}", month)))?;
                if !(1..=12).contains(&month) {
                    return Err(Error::config(format!("month out of range: {}", month)));
                }
                let slot = &mut months[month - 1];
                if slot.is_some() {
                    return Err(Error::config(format!("month {} assigned twice", month)));
                }
                *slot = Some(season.to_string());
            }
        }

        let mut resolved: [String; 12] = Default::default();
        for (index, slot) in months.into_iter().enumerate() {
            resolved[index] =
                slot.ok_or_else(|| Error::config(format!("month {} has no season", index + 1)))?;
        }
        Ok(Self { months: resolved })
    }
}

impl fmt::Display for SeasonCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
        for (index, season) in self.months.iter().enumerate() {
            let month = (index + 1).to_string();
            match groups.iter_mut().find(|(s, _)| *s == season.as_str()) {
                Some((_, list)) => list.push(month),
                None => groups.push((season, vec![month])),
            }
        }
        let parts: Vec<String> = groups
            .into_iter()
            .map(|(season, list)| format!("{}={}", list.join(","), season))
            .collect();
        f.write_str(&parts.join(";"))
    }
}

impl From<SeasonCalendar> for String {
    fn from(calendar: SeasonCalendar) -> Self {
        calendar.to_string()
    }
}

/// Stocking priorities for one season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonProfile {
    pub high_priority: &'static [&'static str],
    pub medium_priority: &'static [&'static str],
    pub multiplier: f64,
}

/// Built-in priority catalog. Seasons without an entry return `None`.
pub fn season_profile(season: &str) -> Option<SeasonProfile> {
    let profile = match season {
        "summer" => SeasonProfile {
            high_priority: &[
                "fan",
                "air conditioner",
                "ac",
                "cooler",
                "sunscreen",
                "hat",
                "cap",
            ],
            medium_priority: &["shorts", "t-shirt", "sandals", "sunglasses", "water bottle"],
            multiplier: 2.0,
        },
        "winter" => SeasonProfile {
            high_priority: &["heater", "jacket", "coat", "blanket", "gloves", "scarf"],
            medium_priority: &["boots", "sweater", "warm clothes", "thermals"],
            multiplier: 1.8,
        },
        "rainy" => SeasonProfile {
            high_priority: &["umbrella", "raincoat", "rain boots", "waterproof"],
            medium_priority: &["towel", "dryer", "dehumidifier"],
            multiplier: 2.5,
        },
        "spring" => SeasonProfile {
            high_priority: &["allergy medicine", "light jacket", "gardening tools"],
            medium_priority: &["casual wear", "sneakers"],
            multiplier: 1.3,
        },
        _ => return None,
    };
    Some(profile)
}
