//! # fpt-core
//!
//! Core types shared by every fpt crate:
//! - Snapshot documents and their integrity metadata
//! - Notification records and the delivery status state machine
//! - Digest windows and restore outcomes
//! - The content checksum used for backup integrity checks
//! - The injected [`report::Reporter`] logging capability
//! - Cross-cutting error types

pub mod checksum;
pub mod digest;
pub mod enums;
pub mod errors;
pub mod notification;
pub mod report;
pub mod restore;
pub mod row;
pub mod snapshot;
