// ── Registry identity types ──
//
// Families, technologies and controls are all keyed by user-assigned
// text ids. Separate newtypes keep a technology id from being passed
// where a family id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a technology family (e.g. `"OS"`).
    FamilyId
);

string_id!(
    /// Identifier of a technology (e.g. `"win-11"`).
    TechnologyId
);

string_id!(
    /// User-assigned control identifier (e.g. `"OS-WIN-001"`). Unique registry-wide.
    ControlId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(ControlId::from("OS-WIN-001").to_string(), "OS-WIN-001");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&TechnologyId::from("win-11")).unwrap();
        assert_eq!(json, "\"win-11\"");
        let back: TechnologyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "win-11");
    }

    #[test]
    fn ids_parse_from_str() {
        let id: FamilyId = "OS".parse().unwrap();
        assert_eq!(id, FamilyId::new("OS"));
    }
}
