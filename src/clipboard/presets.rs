//! Clipboard backend presets for common platforms.
//!
//! A manifest may name a preset via `[clipboard] backend = "..."`; with
//! no manifest configuration the backend is detected from the session
//! environment. Explicit `copy`/`paste` commands override either.

/// Copy and paste commands for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    pub copy: &'static str,
    pub paste: &'static str,
}

/// Returns the commands for a named preset, or `None` if the name is
/// not recognized.
pub fn preset_backend(name: &str) -> Option<Backend> {
    match name {
        "xclip" => Some(XCLIP),
        "xsel" => Some(XSEL),
        "wl-clipboard" => Some(WL_CLIPBOARD),
        "pbcopy" => Some(PBCOPY),
        _ => None,
    }
}

/// Pick a preset name from the session environment.
///
/// `env` looks up an environment variable; non-empty values count as
/// set. Wayland wins over X11 when both are present (XWayland sessions
/// export `DISPLAY` too).
pub fn detect_backend(env: impl Fn(&str) -> Option<String>) -> Option<&'static str> {
    let set = |name: &str| env(name).is_some_and(|v| !v.is_empty());
    if cfg!(target_os = "macos") {
        Some("pbcopy")
    } else if set("WAYLAND_DISPLAY") {
        Some("wl-clipboard")
    } else if set("DISPLAY") {
        Some("xclip")
    } else {
        None
    }
}

const XCLIP: Backend = Backend {
    copy: "xclip -selection clipboard",
    paste: "xclip -selection clipboard -o",
};

const XSEL: Backend = Backend {
    copy: "xsel --clipboard --input",
    paste: "xsel --clipboard --output",
};

/// `wl-paste` appends a newline unless told not to.
const WL_CLIPBOARD: Backend = Backend {
    copy: "wl-copy",
    paste: "wl-paste --no-newline",
};

const PBCOPY: Backend = Backend {
    copy: "pbcopy",
    paste: "pbpaste",
};
