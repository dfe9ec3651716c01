//! Prompt detection for device CLIs.
//!
//! One pattern covers every supported vendor:
//!
//! ```text
//! BJ_YF_311-F-02_N7718-1#            # Cisco / Nexus / Ruijie
//! <BJ_YF_305-A-15_CE5810>            # Huawei / H3C user view
//! [~BJ_YF_320-I-10_CE5810]           # Huawei system view
//! ```
//!
//! This is a heuristic. Any output line made only of prompt characters
//! and ending in a terminator (`[OK]`, `<none>`) is taken for a prompt.

use std::sync::LazyLock;

use regex::Regex;

/// Characters a prompt may end with.
pub const PROMPT_TERMINATORS: &[char] = &['>', '%', '#', ']', '$'];

static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z_~@*/.()\[\]<-]+[>%#\]$]$").expect("prompt pattern is valid")
});

/// Check whether a single line looks like an interactive prompt.
pub fn is_prompt(line: &str) -> bool {
    PROMPT.is_match(line.trim())
}

/// The last line of `text`, ignoring trailing whitespace.
pub fn last_line(text: &str) -> &str {
    let trimmed = text.trim_end();
    match trimmed.rfind('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Check whether accumulated output currently ends at a prompt.
pub fn ends_with_prompt(text: &str) -> bool {
    is_prompt(last_line(text))
}
