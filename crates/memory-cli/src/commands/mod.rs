//! Command handlers

pub mod check;
pub mod config;
pub mod entry;
pub mod links;
pub mod list;
pub mod status;
pub mod tags;
