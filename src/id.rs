//! Composite identifiers.
//!
//! ACL ids join the binding tuple with `|`; import ids join parent ids with `@`.

use crate::error::{Error, Result};

pub const ACL_ID_SEPARATOR: char = '|';
pub const IMPORT_ID_SEPARATOR: char = '@';

/// Decoded ACL id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclId {
    pub user: String,
    pub resource_type: String,
    pub permission_type: String,
    pub resource_name: String,
}

impl AclId {
    pub fn new(
        user: impl Into<String>,
        resource_type: impl Into<String>,
        permission_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            resource_type: resource_type.into(),
            permission_type: permission_type.into(),
            resource_name: resource_name.into(),
        }
    }

    /// `user|resourceType|permissionType|resourceName`
    pub fn generate(&self) -> String {
        [
            self.user.as_str(),
            self.resource_type.as_str(),
            self.permission_type.as_str(),
            self.resource_name.as_str(),
        ]
        .join("|")
    }

    /// Fails unless the id splits into exactly four parts.
    pub fn parse(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split(ACL_ID_SEPARATOR).collect();
        match parts.as_slice() {
            [user, resource_type, permission_type, resource_name] => {
                Ok(Self::new(*user, *resource_type, *permission_type, *resource_name))
            }
            _ => Err(Error::validation(format!(
                "invalid acl id {:?}: expected user|resourceType|permissionType|resourceName",
                id
            ))),
        }
    }
}

impl std::fmt::Display for AclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.generate())
    }
}

/// Split an import id into exactly `N` non-empty segments.
///
/// `names` documents the expected layout and is echoed in the error message.
pub fn parse_import_id<const N: usize>(id: &str, names: [&str; N]) -> Result<[String; N]> {
    let expected = names.join("@");
    let parts: Vec<String> = id.split(IMPORT_ID_SEPARATOR).map(str::to_string).collect();
    if let Some(pos) = parts.iter().position(|p| p.trim().is_empty()) {
        if parts.len() == N {
            return Err(Error::validation(format!(
                "invalid import id {:?}: {} must not be empty (expected {})",
                id, names[pos], expected
            )));
        }
    }
    parts.try_into().map_err(|_| {
        Error::validation(format!("invalid import id {:?}: expected {}", id, expected))
    })
}

/// `<envId>@<instanceId>[@...]`
pub fn import_id(parts: &[&str]) -> String {
    parts.join("@")
}
