//! Shared infrastructure for cloud provider APIs.

pub mod google;
