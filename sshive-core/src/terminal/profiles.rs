//! Declarative terminal emulator table.

use serde::Serialize;

use crate::platform::Platform;

/// How a terminal is told to run a command in a new window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WindowTemplate {
    /// Flags placed between the emulator and the command vector
    Argv(&'static [&'static str]),
    /// AppleScript run through `osascript -e`; `{cmd}` is replaced by the
    /// command line as an AppleScript string literal
    AppleScript(&'static str),
    /// `cmd /c start ""` followed by the command line escaped for `cmd`
    CmdStart,
}

/// A terminal emulator the launcher knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerminalProfile {
    /// Display name
    pub name: &'static str,
    /// Executable looked up on `PATH` (`osascript` for AppleScript profiles)
    pub executable: &'static str,
    /// Command wrapping template
    pub window_template: WindowTemplate,
    /// Position in the platform ranking, lower is preferred
    pub priority_rank: u8,
    /// Platform the profile applies to
    pub platform: Platform,
    /// Fixed locations checked when the executable is not on `PATH`
    pub install_paths: &'static [&'static str],
    /// Whether the launched command inherits the spawned process environment
    pub inherits_environment: bool,
}

impl TerminalProfile {
    /// Returns true if `name` refers to this profile (name or executable)
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.executable.eq_ignore_ascii_case(name)
    }
}

const fn argv(
    name: &'static str,
    executable: &'static str,
    flags: &'static [&'static str],
    priority_rank: u8,
    platform: Platform,
    install_paths: &'static [&'static str],
) -> TerminalProfile {
    TerminalProfile {
        name,
        executable,
        window_template: WindowTemplate::Argv(flags),
        priority_rank,
        platform,
        install_paths,
        inherits_environment: true,
    }
}

const ITERM_SCRIPT: &str = "tell application \"iTerm\"
    activate
    create window with default profile command {cmd}
end tell";

const TERMINAL_APP_SCRIPT: &str = "tell application \"Terminal\"
    activate
    do script {cmd}
end tell";

/// Every known terminal, grouped by platform and ordered by rank
pub static TERMINAL_PROFILES: &[TerminalProfile] = &[
    argv("Konsole", "konsole", &["-e"], 1, Platform::Linux, &[]),
    argv("GNOME Terminal", "gnome-terminal", &["--"], 2, Platform::Linux, &[]),
    argv("Xfce Terminal", "xfce4-terminal", &["-x"], 3, Platform::Linux, &[]),
    argv("Alacritty", "alacritty", &["-e"], 4, Platform::Linux, &[]),
    argv("kitty", "kitty", &[], 5, Platform::Linux, &[]),
    argv("WezTerm", "wezterm", &["start", "--"], 6, Platform::Linux, &[]),
    argv("Terminator", "terminator", &["-x"], 7, Platform::Linux, &[]),
    argv(
        "Default terminal",
        "x-terminal-emulator",
        &["-e"],
        8,
        Platform::Linux,
        &[],
    ),
    argv("XTerm", "xterm", &["-e"], 9, Platform::Linux, &[]),
    TerminalProfile {
        name: "iTerm",
        executable: "osascript",
        window_template: WindowTemplate::AppleScript(ITERM_SCRIPT),
        priority_rank: 1,
        platform: Platform::MacOs,
        install_paths: &["/Applications/iTerm.app"],
        inherits_environment: false,
    },
    TerminalProfile {
        name: "Terminal",
        executable: "osascript",
        window_template: WindowTemplate::AppleScript(TERMINAL_APP_SCRIPT),
        priority_rank: 2,
        platform: Platform::MacOs,
        install_paths: &[
            "/System/Applications/Utilities/Terminal.app",
            "/Applications/Utilities/Terminal.app",
        ],
        inherits_environment: false,
    },
    argv(
        "Alacritty",
        "alacritty",
        &["-e"],
        3,
        Platform::MacOs,
        &["/Applications/Alacritty.app/Contents/MacOS/alacritty"],
    ),
    argv(
        "kitty",
        "kitty",
        &[],
        4,
        Platform::MacOs,
        &["/Applications/kitty.app/Contents/MacOS/kitty"],
    ),
    argv(
        "WezTerm",
        "wezterm",
        &["start", "--"],
        5,
        Platform::MacOs,
        &["/Applications/WezTerm.app/Contents/MacOS/wezterm"],
    ),
    argv("Windows Terminal", "wt", &["new-tab"], 1, Platform::Windows, &[]),
    TerminalProfile {
        name: "Command Prompt",
        executable: "cmd",
        window_template: WindowTemplate::CmdStart,
        priority_rank: 2,
        platform: Platform::Windows,
        install_paths: &[],
        inherits_environment: true,
    },
];

/// Returns the platform's profiles in rank order
#[must_use]
pub fn profiles_for(platform: Platform) -> Vec<&'static TerminalProfile> {
    let mut profiles: Vec<_> = TERMINAL_PROFILES
        .iter()
        .filter(|p| p.platform == platform)
        .collect();
    profiles.sort_by_key(|p| p.priority_rank);
    profiles
}
