//! External tool lookup and inventory
//!
//! The launcher never links against SSH or terminal libraries; it drives
//! installed executables. This module finds them and reports on them.

mod detection;
mod locator;

pub use detection::{parse_version, ToolInfo, ToolReport, ToolRole};
pub use locator::{SystemToolLocator, ToolLocator, ToolSet};
