pub mod backend;
pub mod client;
pub mod events;
pub mod models;
pub mod query;
pub mod realtime;
