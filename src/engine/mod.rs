pub mod catalog;
pub mod pickups;
pub mod query;
pub mod totals;
pub mod transition;
