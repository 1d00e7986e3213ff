//! Tool definitions module.
//!
//! Each tool lives in its own file and exposes a `to_definition` constructor
//! used by the registry.

pub mod inventory;
pub mod season;

pub use inventory::{GetAllProductsParams, GetAllProductsTool, GetSalesDataTool};
pub use season::{GetSeasonTool, SeasonCalendar};
