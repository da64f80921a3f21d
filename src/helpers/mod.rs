//! Helpers for preparing request paths for the router.

pub mod path;
