//! drawbot is a line-oriented chatbot that can call an image generation tool
//! on the user's behalf.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation history, the completion client, response
//!   classification, the tool dispatch loop, and the interactive session.
//! - [`tools`] defines the tool trait, the registry advertised to the model,
//!   and the image generation tool.
//! - [`api`] defines chat-completion and image payloads exchanged with the
//!   service.
//! - [`auth`] stores the API key in the system keyring.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which resolves credentials and configuration
//! and hands off to [`core::session::Session`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod tools;
pub mod utils;
