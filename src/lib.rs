//! Authoritative match server for turn-based naval combat.
//!
//! A match is a sequence of stateless HTTP request/response cycles over a
//! versioned store: load, apply the rules, save with compare-and-swap. The
//! automated opponent plays its turns inside the same request that handed
//! it the turn, so no background tasks hold game state.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod service;
pub mod store;
pub mod util;
