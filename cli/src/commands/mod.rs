//! CLI Commands

pub mod config;
pub mod forms;
pub mod preview;
