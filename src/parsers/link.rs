use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::FormatError;

/// Tunables
const MIN_LINK_LEN: usize = 50;
const CANONICAL_PREFIX: &str = "https://tenhou.net/0/?log=";
const LEGACY_LOBBY: &str = "https://tenhou.net/3";
const CANONICAL_LOBBY: &str = "https://tenhou.net/0";

/// Shown next to every rejection so the user sees what a good link looks like.
pub const EXAMPLE_LINK: &str = "https://tenhou.net/0/?log=2025010203gm-0029-0000-0123abcd&tw=0";

// Anything after the last `&tw=` up to the end of the link.
static PLAYER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&tw=(?P<seat>[^&]*)$").expect("static regex"));

/// Identifier of one remote log, as taken from a link (player suffix included).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogId(String);

impl LogId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its `&tw=<digit>` player suffix; this names the file on the server.
    pub fn base(&self) -> &str {
        match PLAYER_SUFFIX.find(&self.0) {
            Some(m) => &self.0[..m.start()],
            None => &self.0,
        }
    }

    /// Seat the link was shared from, if it carried one.
    pub fn seat(&self) -> Option<u8> {
        PLAYER_SUFFIX
            .captures(&self.0)
            .and_then(|c| c.name("seat"))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull the log identifier out of a tenhou link.
///
/// `http://` is upgraded and the legacy `/3` lobby path is rewritten to `/0` before the
/// prefix is checked. A trailing `&tw=<digit>` is validated but kept.
pub fn extract(link: &str) -> Result<LogId, FormatError> {
    let len = link.chars().count();
    if len < MIN_LINK_LEN {
        return Err(FormatError::TooShort {
            len,
            min: MIN_LINK_LEN,
        });
    }

    let mut url = match link.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => link.to_string(),
    };
    if let Some(rest) = url.strip_prefix(LEGACY_LOBBY) {
        url = format!("{CANONICAL_LOBBY}{rest}");
    }

    let id = url
        .strip_prefix(CANONICAL_PREFIX)
        .ok_or(FormatError::WrongPrefix)?;

    if let Some(caps) = PLAYER_SUFFIX.captures(id) {
        let seat = &caps["seat"];
        if seat.len() != 1 || !seat.as_bytes()[0].is_ascii_digit() {
            return Err(FormatError::MalformedPlayerSuffix {
                suffix: seat.to_string(),
            });
        }
    }

    Ok(LogId(id.to_string()))
}
