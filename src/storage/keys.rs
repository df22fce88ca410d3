//! Key layout shared by every store backend.
//!
//! | Key pattern         | Value                         |
//! |---------------------|-------------------------------|
//! | `session:<id>`      | list of words                 |
//! | `adjectives:<word>` | integer count                 |
//! | `adjectives:sorted` | sorted set, score = count     |
//! | `ratelimit:<key>`   | integer with expiry           |

const SESSION: &str = "session:";
const WORD: &str = "adjectives:";
const SORTED: &str = "sorted";
const RATE_LIMIT: &str = "ratelimit:";

/// Prepended to the count key of `sorted` and of every word already starting
/// with `#`, so no two words share a count key and none matches the index key.
pub const ESCAPE: &str = "#";

/// Key names, optionally under a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(namespace: &str) -> Self {
        let prefix = if namespace.is_empty() {
            String::new()
        } else {
            format!("{namespace}:")
        };
        Self { prefix }
    }

    pub fn session(&self, session_id: &str) -> String {
        format!("{}{SESSION}{session_id}", self.prefix)
    }

    /// Prefix before a session id, used for scanning and stripping.
    pub fn session_prefix(&self) -> String {
        format!("{}{SESSION}", self.prefix)
    }

    pub fn word(&self, word: &str) -> String {
        if word == SORTED || word.starts_with(ESCAPE) {
            format!("{}{ESCAPE}{word}", self.word_prefix())
        } else {
            format!("{}{word}", self.word_prefix())
        }
    }

    pub fn word_prefix(&self) -> String {
        format!("{}{WORD}", self.prefix)
    }

    pub fn sorted(&self) -> String {
        format!("{}{WORD}{SORTED}", self.prefix)
    }

    pub fn rate_limit(&self, key: &str) -> String {
        format!("{}{RATE_LIMIT}{key}", self.prefix)
    }

    /// Scan patterns covering everything `clear` removes.
    pub fn tally_patterns(&self) -> [String; 2] {
        [
            format!("{}*", self.session_prefix()),
            format!("{}*", self.word_prefix()),
        ]
    }
}
