pub mod app;
pub mod classifier;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod message;
pub mod prompt;
pub mod providers;
pub mod session;
