//! mail-digest: mailbox and spreadsheet summaries over HTTP.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod google;
pub mod llm;
pub mod mail;
