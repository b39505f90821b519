//! Credential pre-flight checks
//!
//! A short, non-interactive login attempt run before any terminal window is
//! opened, so that bad credentials are reported instead of flashing a window
//! that closes immediately.

mod validator;

pub use validator::{classify_probe, PreflightValidator, ProbeOutput};

use async_trait::async_trait;

use crate::auth::AuthPlan;
use crate::error::CredentialResult;
use crate::models::Connection;

/// Abstraction over credential probes
///
/// The launch orchestrator calls exactly one probe per attempt, before the
/// terminal is spawned.
#[async_trait]
pub trait Preflight: Send + Sync {
    /// Checks that the plan's credentials are accepted by the host
    ///
    /// # Arguments
    /// * `connection` - The connection being launched
    /// * `plan` - The resolved plan, with any converted key already in place
    ///
    /// # Errors
    /// Returns `CredentialError::AuthRejected`, `Unreachable` or `Timeout`
    async fn check(&self, connection: &Connection, plan: &AuthPlan) -> CredentialResult<()>;

    /// Returns a human-readable name for this probe
    fn name(&self) -> &'static str;
}
