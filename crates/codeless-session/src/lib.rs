//! codeless-session
//!
//! Runtime side of the live-edit channel: one connection to the editor,
//! the units of work its messages schedule, and the single UI execution
//! context those units route every UI effect through.

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod types;
pub mod ui;
