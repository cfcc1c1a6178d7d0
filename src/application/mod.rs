//! Application services: project discovery, render dispatch and scaffolding.

pub mod catalog;
pub mod defaults;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod scaffold;
pub mod store;
