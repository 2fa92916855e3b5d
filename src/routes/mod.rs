//! HTTP routes

pub mod resources;
