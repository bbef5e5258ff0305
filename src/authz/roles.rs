use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::catalog::{self, JURUSAN, LEVELS, RECIPIENTS};
use super::name::{Action, PermissionName, Resource};

/// Coarse account label.
///
/// A role only picks the grant list a new account starts with. Authorization
/// decisions never look at it, so changing a role later leaves grants as
/// they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    /// Principal's office staff.
    Principal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Principal => "principal",
        }
    }

    /// Canonical permission names copied into a new account's grants.
    pub fn default_permissions(&self) -> Vec<String> {
        match self {
            Role::Admin => Resource::ALL
                .into_iter()
                .map(|resource| PermissionName::family(resource).to_string())
                .collect(),
            Role::Teacher => {
                let mut names = vec![PermissionName::new(Resource::Prestasi, Action::Any)
                    .category("siswa")
                    .to_string()];
                names.extend(
                    JURUSAN
                        .iter()
                        .map(|code| catalog::jurusan(code, Action::View).to_string()),
                );
                names
            }
            Role::Principal => {
                let mut names = vec![PermissionName::new(Resource::Users, Action::View).to_string()];
                for recipient in RECIPIENTS {
                    for level in LEVELS {
                        names.push(catalog::prestasi(recipient, level, Action::View).to_string());
                    }
                }
                names.extend(
                    JURUSAN
                        .iter()
                        .map(|code| catalog::jurusan(code, Action::View).to_string()),
                );
                names
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "principal" => Ok(Role::Principal),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
