use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::matcher::{DELIMITER, WILDCARD};

/// Resource families that own a permission subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Permissions,
    /// Student, teacher and school achievements.
    Prestasi,
    /// Study programs (jurusan).
    Program,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Users,
        Resource::Permissions,
        Resource::Prestasi,
        Resource::Program,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Permissions => "permissions",
            Resource::Prestasi => "prestasi",
            Resource::Program => "program",
        }
    }
}

/// Action verbs that terminate a permission name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    /// Any action under the preceding segments.
    Any,
}

impl Action {
    pub const CRUD: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Any => "*",
        }
    }
}

/// Typed permission name: `resource[.category...].action`.
///
/// Serializes to the same dot-delimited grammar the evaluator compares, so a
/// handler can write
/// `PermissionName::new(Resource::Prestasi, Action::Edit).category(kind).category(level)`
/// instead of concatenating strings by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionName {
    resource: Resource,
    categories: Vec<String>,
    action: Action,
}

impl PermissionName {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self {
            resource,
            categories: Vec::new(),
            action,
        }
    }

    /// `resource.*`, covering every capability of the resource.
    pub fn family(resource: Resource) -> Self {
        Self::new(resource, Action::Any)
    }

    /// Appends a data-derived category token, lower-cased.
    pub fn category(mut self, token: impl AsRef<str>) -> Self {
        self.categories.push(token.as_ref().to_lowercase());
        self
    }

    /// Appends a category token exactly as given, for catalog codes such as `PPLG`.
    pub fn code(mut self, token: impl Into<String>) -> Self {
        self.categories.push(token.into());
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn action(&self) -> Action {
        self.action
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource.as_str())?;
        for category in &self.categories {
            write!(f, "{DELIMITER}{category}")?;
        }
        write!(f, "{DELIMITER}{}", self.action.as_str())
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.to_string()
    }
}

/// Checks a name before it enters the permission catalog.
///
/// Catalog names have two to four segments of `[A-Za-z0-9_-]`. The wildcard is
/// accepted only as the entire last segment, which marks a family entry that
/// wildcard grants can reference. The evaluator never calls this.
pub fn validate_catalog_name(name: &str) -> Result<(), String> {
    let segments: Vec<&str> = name.split(DELIMITER).collect();

    if !(2..=4).contains(&segments.len()) {
        return Err(format!(
            "permission name must have 2 to 4 segments, got {}",
            segments.len()
        ));
    }

    let last = segments.len() - 1;
    for (idx, segment) in segments.iter().enumerate() {
        if idx == last && segment.chars().eq([WILDCARD]) {
            continue;
        }
        if segment.is_empty() {
            return Err("permission name has an empty segment".to_string());
        }
        if let Some(bad) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(format!("invalid character {bad:?} in segment {segment:?}"));
        }
    }

    Ok(())
}
