//! Shared utilities for the Agora chat server and its tooling.

pub mod logger;
pub mod time;
