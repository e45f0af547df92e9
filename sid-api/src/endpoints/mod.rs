//! API endpoint modules organized by backend surface.

pub mod tables;
pub mod rpc;
pub mod storage;
pub mod auth;
pub mod render;
