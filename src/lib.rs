//! Dice roll analytics for a tabletop campaign.
//!
//! The [`data`] layer loads the roll table, filters it and aggregates the
//! views; [`state`] keeps the dashboard controls and recomputes views when
//! they change; [`app`] and [`ui`] draw everything with egui.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod ui;
