//! Terminal emulator profiles and detection
//!
//! Each platform has a ranked, declarative table of emulators. The detector
//! walks the table and picks the first one installed on the host.

mod detector;
mod profiles;

pub use detector::{DetectedTerminal, TerminalDetector};
pub use profiles::{profiles_for, TerminalProfile, WindowTemplate, TERMINAL_PROFILES};
