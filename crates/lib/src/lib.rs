//! Troll core library: reaction engine, Telegram binding, and configuration
//! used by the CLI.

pub mod channels;
pub mod config;
pub mod init;
pub mod troll;
