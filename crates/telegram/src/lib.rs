//! Telegram integration - long-poll bot interface
//!
//! This crate provides the chat-platform seam for rolobot:
//! - **Updates** (`update`) - inbound wire types (`Update`, `Message`, ...)
//! - **Commands** (`commands`) - slash-command parsing and the command menu
//! - **Api** (`api`) - outbound Bot API calls behind the `ChatApi` trait
//! - **Poller** (`poller`) - `getUpdates` long-poll loop with reconnect logic
//!
//! The rest of the system never talks HTTP directly: handlers receive typed
//! updates from the poller and reply through `ChatApi`, so tests can swap in
//! the recording double and a scripted transport.

pub mod api;
pub mod commands;
pub mod poller;
pub mod update;
