// crates/settings-provider-core/src/core/uri.rs
// ============================================================================
// Module: Settings Identifiers
// Description: Parsing and formatting of namespace and item identifiers.
// Purpose: Map external identifiers onto a closed set of namespace routes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! External callers address settings with `content://settings/<namespace>`
//! for a whole namespace or `content://settings/<namespace>/<item>` for one
//! named setting. The bare path form `<namespace>[/<item>]` is accepted as
//! well. Item names are percent-encoded when formatted so that any name
//! round-trips through one path segment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::core::error::SettingsError;
use crate::core::namespace::Namespace;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identifier scheme.
pub const SCHEME: &str = "content";
/// Identifier authority.
pub const AUTHORITY: &str = "settings";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed settings identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingsUri {
    /// Target namespace.
    namespace: Namespace,
    /// Item name for single-setting identifiers.
    item: Option<String>,
}

/// Whether an identifier names a collection or one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Whole namespace.
    Collection,
    /// Single named setting.
    Item,
}

/// Type descriptor returned by `get_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    /// Collection or item.
    pub kind: ResourceKind,
    /// Resolved namespace.
    pub namespace: Namespace,
}

impl ResourceType {
    /// Returns the MIME-style descriptor string.
    #[must_use]
    pub fn mime(&self) -> String {
        let prefix = match self.kind {
            ResourceKind::Collection => "vnd.settings.dir",
            ResourceKind::Item => "vnd.settings.item",
        };
        format!("{prefix}/{}", self.namespace)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime())
    }
}

// ============================================================================
// SECTION: Implementation
// ============================================================================

impl SettingsUri {
    /// Identifier for a whole namespace.
    #[must_use]
    pub const fn collection(namespace: Namespace) -> Self {
        Self {
            namespace,
            item: None,
        }
    }

    /// Identifier for one named setting.
    #[must_use]
    pub fn item(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            item: Some(name.into()),
        }
    }

    /// Parses an external identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] for an empty identifier and
    /// [`SettingsError::InvalidIdentifier`] for anything that does not match a
    /// namespace pattern.
    pub fn parse(identifier: &str) -> Result<Self, SettingsError> {
        if identifier.is_empty() {
            return Err(SettingsError::InvalidArgument("identifier is required".to_string()));
        }
        let invalid = || SettingsError::InvalidIdentifier(identifier.to_string());
        let path = match identifier.split_once("://") {
            Some((scheme, rest)) => {
                if scheme != SCHEME {
                    return Err(invalid());
                }
                let (authority, path) = rest.split_once('/').ok_or_else(invalid)?;
                if authority != AUTHORITY {
                    return Err(invalid());
                }
                path
            }
            None => identifier.strip_prefix('/').unwrap_or(identifier),
        };
        let mut segments = path.split('/');
        let namespace = segments.next().and_then(Namespace::parse).ok_or_else(invalid)?;
        let item = match segments.next() {
            None => None,
            Some("") => return Err(invalid()),
            Some(segment) => Some(percent_decode(segment).ok_or_else(invalid)?),
        };
        if segments.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            namespace,
            item,
        })
    }

    /// Returns the namespace.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns the item name, if this is an item identifier.
    #[must_use]
    pub fn item_name(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// Returns true for item identifiers.
    #[must_use]
    pub const fn is_item(&self) -> bool {
        self.item.is_some()
    }

    /// Returns the item identifier for `name` in this namespace.
    #[must_use]
    pub fn with_item(&self, name: impl Into<String>) -> Self {
        Self::item(self.namespace, name)
    }

    /// Returns the identifier's type descriptor.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        ResourceType {
            kind: if self.item.is_some() { ResourceKind::Item } else { ResourceKind::Collection },
            namespace: self.namespace,
        }
    }
}

impl fmt::Display for SettingsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{AUTHORITY}/{}", self.namespace)?;
        if let Some(item) = &self.item {
            write!(f, "/{}", percent_encode(item))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Escapes the characters that would break a single path segment.
fn percent_encode(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => encoded.push_str("%25"),
            '/' => encoded.push_str("%2F"),
            _ => encoded.push(ch),
        }
    }
    encoded
}

/// Decodes `%XX` escapes; `None` for malformed escapes or non-UTF-8 output.
fn percent_decode(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = segment.get(index + 1..index + 3)?;
            if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return None;
            }
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]
mod tests {
    use super::*;

    #[test]
    fn parses_collection_and_item_forms() {
        let uri = SettingsUri::parse("content://settings/secure").unwrap();
        assert_eq!(uri, SettingsUri::collection(Namespace::Secure));
        let uri = SettingsUri::parse("content://settings/system/screen_brightness").unwrap();
        assert_eq!(uri.item_name(), Some("screen_brightness"));
        let uri = SettingsUri::parse("global/adb_enabled").unwrap();
        assert_eq!(uri, SettingsUri::item(Namespace::Global, "adb_enabled"));
    }

    #[test]
    fn rejects_unknown_patterns() {
        for identifier in [
            "content://settings/bookmarks",
            "content://other/system",
            "http://settings/system",
            "system/a/b",
            "system/",
            "content://settings",
        ] {
            assert!(
                matches!(SettingsUri::parse(identifier), Err(SettingsError::InvalidIdentifier(_))),
                "{identifier}"
            );
        }
        assert!(matches!(SettingsUri::parse(""), Err(SettingsError::InvalidArgument(_))));
    }

    #[test]
    fn malformed_escapes_are_rejected() {
        for identifier in ["system/a%+1", "system/a%-1", "system/a%1", "system/a%zz"] {
            assert!(
                matches!(SettingsUri::parse(identifier), Err(SettingsError::InvalidIdentifier(_))),
                "{identifier}"
            );
        }
        let uri = SettingsUri::parse("system/a%2Fb").unwrap();
        assert_eq!(uri.item_name(), Some("a/b"));
    }

    #[test]
    fn item_names_with_separators_round_trip() {
        let uri = SettingsUri::item(Namespace::System, "a/b%c");
        let text = uri.to_string();
        assert_eq!(text, "content://settings/system/a%2Fb%25c");
        assert_eq!(SettingsUri::parse(&text).unwrap(), uri);
    }

    #[test]
    fn type_descriptor_distinguishes_items() {
        assert_eq!(
            SettingsUri::collection(Namespace::Global).resource_type().mime(),
            "vnd.settings.dir/global"
        );
        assert_eq!(
            SettingsUri::item(Namespace::Secure, "x").resource_type().mime(),
            "vnd.settings.item/secure"
        );
    }
}
