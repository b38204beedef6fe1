use crate::error::ModelError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A globally unique, opaque identifier for model and diagram elements.
///
/// 128 random bits, `Copy`, `Eq`, `Hash` by value. This is the only stable
/// reference that crosses a graph boundary: diagrams and the tree projection
/// hold `Uid`s, never pointers, and resolve them through lookups that return
/// `Option`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(Uuid);

impl Uid {
    /// The all-zero sentinel. Never produced by [`Uid::new`].
    pub const INVALID: Uid = Uid(Uuid::nil());

    /// Generate a fresh random identifier.
    ///
    /// Collisions are negligible, so no registry lookup is done.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Uid(Uuid::new_v4())
    }

    /// Parse the canonical string form (other `uuid` spellings are accepted too).
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        Uuid::parse_str(s.trim())
            .map(Uid)
            .map_err(|_| ModelError::MalformedId(s.to_string()))
    }

    pub const fn from_u128(value: u128) -> Self {
        Uid(Uuid::from_u128(value))
    }

    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First group is enough to tell elements apart in logs.
        let s = self.0.hyphenated().to_string();
        write!(f, "#{}", &s[..8])
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for Uid {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uid::parse(s)
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Uid::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_uids_are_valid_and_distinct() {
        let a = Uid::new();
        let b = Uid::new();
        assert!(a.is_valid());
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_sentinel_roundtrips() {
        assert!(!Uid::INVALID.is_valid());
        let s = Uid::INVALID.to_string();
        assert_eq!(s, "00000000-0000-0000-0000-000000000000");
        assert_eq!(Uid::parse(&s).unwrap(), Uid::INVALID);
    }

    #[test]
    fn canonical_form_is_lowercase_hyphenated() {
        let uid = Uid::from_u128(0xDEAD_BEEF_0000_0000_0000_0000_0000_00FF);
        assert_eq!(uid.to_string(), "deadbeef-0000-0000-0000-0000000000ff");
    }

    #[test]
    fn malformed_input_is_rejected() {
        for bad in ["", "not-a-uid", "deadbeef-0000", "zzzzzzzz-0000-0000-0000-000000000000"] {
            match Uid::parse(bad) {
                Err(ModelError::MalformedId(s)) => assert_eq!(s, bad),
                other => panic!("expected MalformedId for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let uid = Uid::new();
        let bytes = rmp_serde::to_vec(&uid).unwrap();
        let back: Uid = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, uid);
    }

    proptest! {
        #[test]
        fn parse_inverts_to_string(bits in any::<u128>()) {
            let uid = Uid::from_u128(bits);
            prop_assert_eq!(Uid::parse(&uid.to_string()).unwrap(), uid);
        }
    }
}
