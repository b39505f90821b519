//! Core data models for `SSHive`
//!
//! This module defines the connection record consumed by the launch
//! subsystem and the group hierarchy used to organise connections.

mod connection;
mod group;

pub use connection::{AuthMethod, Connection, DEFAULT_SSH_PORT};
pub use group::{GroupNode, GroupPath, GroupTree};
