//! GigaChat chat-completion client.

mod api;
mod client;
mod config;

pub use client::GigaChatClient;
pub use config::GigaChatConfig;
