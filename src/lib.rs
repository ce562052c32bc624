//! routechat is a terminal chat client for the models behind an
//! OpenAI-compatible gateway such as OpenRouter.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the model catalog, config validation, session state,
//!   chat persistence, model-switch handling and token/cost accounting.
//! - [`api`] defines the gateway trait, its HTTP client and the wire payloads.
//! - [`commands`] implements slash-command parsing and execution for the chat loop.
//! - [`cli`] parses arguments and runs the line-based chat and history views.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
