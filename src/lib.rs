//! Project discovery and render dispatch for a directory of animation projects.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
