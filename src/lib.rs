pub mod api;
pub mod app;
pub mod cache;
pub mod components;
pub mod error;
pub mod services;
pub mod unread;
pub mod utils;

#[cfg(feature = "gui")]
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;
