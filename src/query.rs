//! Classifies raw lookup input as an IP literal or a domain name.
//!
//! The patterns are deliberately loose: `999.999.999.999` is treated as IPv4
//! and any run of hex digits and colons (`cafe`, `::`) as IPv6. Whatever the
//! lookup service makes of it is reported back as a normal failure.

use regex::Regex;
use std::sync::LazyLock;

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid IPv4 pattern"));
static IPV6: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9:]+$").expect("valid IPv6 pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Ipv4,
    Ipv6,
    Domain,
}

impl InputKind {
    pub fn is_ip(self) -> bool {
        matches!(self, InputKind::Ipv4 | InputKind::Ipv6)
    }
}

/// Classifies `input` after trimming. Returns `None` for empty input, which
/// callers treat as a no-op.
pub fn classify(input: &str) -> Option<InputKind> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let kind = if IPV4.is_match(input) {
        InputKind::Ipv4
    } else if IPV6.is_match(input) {
        InputKind::Ipv6
    } else {
        InputKind::Domain
    };
    Some(kind)
}
