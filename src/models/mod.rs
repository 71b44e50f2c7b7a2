pub mod dropbox;
pub mod page;
pub mod pickup;
pub mod totals;
pub mod waste;
