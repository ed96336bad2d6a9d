//! View models for the coach-facing screens. Pure functions of their
//! inputs; the GTK layer in `ui` only draws what these produce.

pub mod chat_window;
pub mod dashboard;
pub mod date_navigator;
pub mod messages_page;
pub mod metric_card;
pub mod routine_card;
