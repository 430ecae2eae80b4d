pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod mailer;
pub mod state;
pub mod sync;
