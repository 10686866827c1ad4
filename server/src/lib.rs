//! FileFlow License Server
//!
//! Receives AppSumo and Gumroad purchase webhooks, issues licenses through
//! Keygen.sh and emails the keys to customers.

pub mod api;
pub mod config;
pub mod email;
pub mod setup;
pub mod webhooks;
