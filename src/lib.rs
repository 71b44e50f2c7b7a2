pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod repository;
pub mod state;
