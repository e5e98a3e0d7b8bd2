//! `NodeId` / `TreeId`: 26-character Crockford base32 ULIDs, canonical
//! uppercase, generated server-side and globally unique.

use crate::domain::errors::{ErrorCode, FieldError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid_ids::Ulid;

macro_rules! ulid_newtype {
    ($name:ident, $field:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a fresh, server-allocated id.
            pub fn generate() -> Self {
                Self(Ulid::generate())
            }

            pub fn parse(raw: &str) -> Result<Self, FieldError> {
                raw.parse::<Ulid>().map(Self).map_err(|e| {
                    FieldError::new($field, ErrorCode::InvalidFormat, e.to_string())
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = FieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

ulid_newtype!(NodeId, "nodeId");
ulid_newtype!(TreeId, "treeId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_node_id_is_26_chars_uppercase() {
        let id = NodeId::generate();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 26);
        assert_eq!(rendered, rendered.to_ascii_uppercase());
    }

    #[test]
    fn roundtrips_through_display_and_parse() {
        let id = TreeId::generate();
        let parsed = TreeId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_id() {
        assert!(NodeId::parse("not-a-ulid").is_err());
    }

    #[test]
    fn node_id_and_tree_id_are_distinct_types() {
        // Compile-time guarantee: this test exists to document intent.
        let node = NodeId::generate();
        let tree = TreeId::generate();
        assert_ne!(node.to_string(), tree.to_string());
    }
}
