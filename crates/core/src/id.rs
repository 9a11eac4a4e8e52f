// SPDX-License-Identifier: MIT

//! Prefixed, fixed-width identifiers.
//!
//! Every persisted row is keyed by a short type tag (`ses-`, `msg-`, ...)
//! followed by random nanoid characters. The whole identifier fits in an
//! inline byte array, so id types are `Copy`, hashable without heap
//! traffic, and usable as borrowed `&str` map keys.

/// Total identifier width in bytes. Generated ids always fill it; parsed
/// ids may be shorter.
pub const ID_LEN: usize = 23;

/// Inline identifier storage: up to [`ID_LEN`] bytes plus a length.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawId {
    bytes: [u8; ID_LEN],
    len: u8,
}

impl RawId {
    /// Store an externally-supplied id. Oversized input trips a debug
    /// assertion and is truncated in release builds.
    pub fn parse(value: &str) -> Self {
        debug_assert!(value.len() <= ID_LEN, "id wider than {ID_LEN} bytes: {value:?}");
        let take = value.len().min(ID_LEN);
        let mut bytes = [0u8; ID_LEN];
        bytes[..take].copy_from_slice(&value.as_bytes()[..take]);
        Self { bytes, len: take as u8 }
    }

    /// Mint a fresh id: the tag, then enough nanoid characters to fill
    /// the remaining width.
    fn generate(prefix: &str) -> Self {
        let random = nanoid::format(nanoid::rngs::default, &nanoid::alphabet::SAFE, ID_LEN - prefix.len());
        Self::parse(&format!("{prefix}{random}"))
    }

    pub fn as_str(&self) -> &str {
        // Ids are minted from ASCII alphabets; a parse() that truncated
        // multi-byte input would be the only way to land here, and that
        // case degrades to the empty string rather than panicking.
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Hash the textual form, not the padded array. Required to line up with
// `Borrow<str>` so maps keyed by an id type answer `&str` lookups.
impl std::hash::Hash for RawId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::borrow::Borrow<str> for RawId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for RawId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for RawId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value.len() > ID_LEN {
            return Err(serde::de::Error::invalid_length(
                value.len(),
                &"an id of at most 23 bytes",
            ));
        }
        Ok(Self::parse(&value))
    }
}

/// Declare the engine's id newtypes in one go.
///
/// Each entry becomes a `Copy` wrapper around [`RawId`] carrying its tag
/// as `PREFIX`, with `new()` (mint), `from_string()` (adopt), string
/// comparisons, and `Deref<Target = str>`.
macro_rules! ids {
    ($($(#[$doc:meta])* $name:ident => $prefix:literal;)+) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(RawId);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(RawId::generate($prefix))
            }

            pub fn from_string(value: impl AsRef<str>) -> Self {
                Self(RawId::parse(value.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from_string(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_string(value)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    )+};
}

ids! {
    /// A persisted agent session.
    SessionId => "ses-";
    /// A message within a session's append-only tree.
    MessageId => "msg-";
    /// A tool invocation recorded against a message.
    ToolCallId => "tcl-";
    /// A todo item scoped to a session.
    TodoId => "tdo-";
    /// An error-memory entry.
    MemoryId => "mem-";
    /// A pending question awaiting an out-of-band answer.
    QuestionId => "qst-";
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
