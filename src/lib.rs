//! Expiry Reminder Bot Library
//!
//! A chat bot plugin that tracks subscription-style expiry dates per user
//! and sends periodic reminders.
//!
//! This crate provides the core functionality for:
//! - Persisting user records and reminder configuration as JSON documents
//! - Handling admin and user commands sent as chat messages
//! - Scanning daily for expiring and expired users
//! - Dispatching reminders through the host's messaging capabilities

pub mod clock;
pub mod commands;
pub mod config;
pub mod messaging;
pub mod plugin;
pub mod scheduler;
pub mod store;
