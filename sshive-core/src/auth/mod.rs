//! Authentication resolution and key materialization
//!
//! [`AuthResolver`] turns a connection's authentication settings into an
//! [`AuthPlan`] after checking that the material and tools exist.
//! [`KeyMaterializer`] then produces a key file the client can read,
//! converting PuTTY keys when needed.

mod materializer;
mod resolver;

pub use materializer::{KeyMaterializer, MaterializedKey, CONVERTED_KEY_NAME};
pub use resolver::{AuthPlan, AuthResolver, ClientKind, ResolvedTool};
