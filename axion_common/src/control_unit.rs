//! Controller-facing types: property file, command surface, notifications.

pub mod command;
pub mod config;
pub mod event;
