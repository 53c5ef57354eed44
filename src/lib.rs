//! # Diary Insta Bot
//!
//! An Instagram DM bot that relays AveDiary homework to school classes.
//!
//! ## Features
//! - Resumable Instagram login with challenge and two-factor handling
//! - Free-text command classification against localizable keyword tables
//! - Per-conversation class login memory backed by SQLite
//! - Inbox polling with at-least-once message handling

/// Authentication state machine and session persistence
pub mod auth;
/// Command classification, reply templates, and the polling dispatcher
pub mod bot;
/// Configuration management: environment variables and settings.json
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Messaging-platform capability trait and the Instagram adapter
pub mod platform;
/// External service clients (AveDiary homework API)
pub mod services;
/// Utility functions for input validation and text normalization
pub mod utils;
