//! Pocket Assist: chat, free-time lookup and mail summaries over a
//! reducer/effect core.

pub mod calendar;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod store;
pub mod summary;
pub mod tools;
