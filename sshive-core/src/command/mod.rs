//! Launch command construction
//!
//! Builds the remote-login client invocation for a resolved authentication
//! plan and wraps it in the detected terminal's window template.

mod builder;
mod quote;

pub use builder::{mask_secrets, CommandBuilder, LaunchCommand, PASSWORD_ENV, PASSWORD_MASK};
pub(crate) use builder::{openssh_identity_args, path_arg, plink_credential_args};
pub use quote::{applescript_quote, cmd_quote, shell_join, shell_quote};
