//! Domains module containing business logic organized by bounded contexts.
//!
//! Each subdomain represents a specific area of functionality within the MCP
//! server. The inventory server has a single one: tools.

pub mod tools;
