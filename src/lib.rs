pub mod api;
pub mod config;
pub mod error;
pub mod flashcards;
pub mod kv;
pub mod mirror;
pub mod models;
pub mod notes;
pub mod remote;
pub mod seed;
pub mod session;
pub mod spillover;
pub mod state;
pub mod tasks;
