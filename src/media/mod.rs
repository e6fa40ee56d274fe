//! Media metadata and presigned transfers.

pub mod service;
