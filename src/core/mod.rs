pub mod accounting;
pub mod app;
pub mod attachments;
pub mod builtin_fixed_params;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod constants;
pub mod message;
pub mod persistence;
pub mod reconciler;
pub mod session;
pub mod validation;
