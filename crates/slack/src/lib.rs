//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for bonusbot:
//! - **Socket Mode** (`socket`) - envelope loop with reconnection and reply posting
//! - **Slash Commands** (`commands`) - `/bonus`, `/bonus cancel`, `/bonus help`
//! - **Events** (`events`) - direct messages and button actions
//! - **Block Kit** (`blocks`) - role/period buttons, report and error messages
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode, the messages tab and interactivity
//! 3. Add the slash command `/bonus`
//! 4. Set env vars: `BONUSBOT_SLACK_APP_TOKEN`, `BONUSBOT_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → Handlers → Conversation → Lookup pipeline
//!                    ↓
//!              Block Kit UI ← Reply
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod socket;
