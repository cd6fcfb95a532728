//! StyleSense core library — flow client, reply extraction, style tweaks and transcript
//! used by both the CLI and desktop applications.

pub mod chat;
pub mod config;
pub mod flow;
pub mod init;
pub mod session;
pub mod tweaks;
