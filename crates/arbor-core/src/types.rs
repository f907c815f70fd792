use serde::{Deserialize, Serialize};

use crate::constants::permission;

/// Resource type tag stored alongside each tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Entry,
}

impl ResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
        }
    }

    /// Permission names that may be granted on a resource of this type.
    #[must_use]
    pub const fn possible_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Entry => &[permission::EDITOR],
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "entry" => Some(Self::Entry),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_tag_roundtrip() {
        assert_eq!(ResourceType::from_tag("entry"), Some(ResourceType::Entry));
        assert_eq!(ResourceType::Entry.to_string(), "entry");
        assert_eq!(ResourceType::from_tag("calendar"), None);
    }

    #[test]
    fn entry_accepts_editor_only() {
        assert_eq!(ResourceType::Entry.possible_permissions(), &["editor"]);
    }
}
