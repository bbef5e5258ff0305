//! The built-in permission catalog.
//!
//! The achievement and study-program subtrees are generated from their
//! category vocabularies rather than listed by hand, so adding a level or a
//! jurusan code widens the catalog everywhere at once.

use super::name::{Action, PermissionName, Resource};

/// Recipient types an achievement can be recorded for.
pub const RECIPIENTS: [&str; 3] = ["siswa", "guru", "sekolah"];

/// Competition levels, lowest first.
pub const LEVELS: [&str; 4] = ["kabupaten", "provinsi", "nasional", "internasional"];

/// Study program codes, kept upper-case as they appear in school records.
pub const JURUSAN: [&str; 4] = ["PPLG", "TJKT", "DKV", "AKL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub resource: Resource,
    pub description: String,
}

impl CatalogEntry {
    fn new(name: PermissionName, description: impl Into<String>) -> Self {
        Self {
            resource: name.resource(),
            name: name.to_string(),
            description: description.into(),
        }
    }
}

pub fn well_known() -> Vec<CatalogEntry> {
    let mut entries = Vec::new();

    for resource in Resource::ALL {
        entries.push(CatalogEntry::new(
            PermissionName::family(resource),
            format!("Every {} capability", resource.as_str()),
        ));
    }

    for action in Action::CRUD {
        entries.push(CatalogEntry::new(
            PermissionName::new(Resource::Users, action),
            format!("{} user accounts", verb(action)),
        ));
    }

    for action in [Action::View, Action::Create, Action::Delete] {
        entries.push(CatalogEntry::new(
            PermissionName::new(Resource::Permissions, action),
            format!("{} catalog permissions", verb(action)),
        ));
    }

    for recipient in RECIPIENTS {
        entries.push(CatalogEntry::new(
            PermissionName::new(Resource::Prestasi, Action::Any).category(recipient),
            format!("Every achievement capability for {recipient}"),
        ));
        for level in LEVELS {
            for action in Action::CRUD {
                entries.push(CatalogEntry::new(
                    prestasi(recipient, level, action),
                    format!("{} {recipient} achievements at {level} level", verb(action)),
                ));
            }
        }
    }

    for action in [Action::Create, Action::Delete] {
        entries.push(CatalogEntry::new(
            PermissionName::new(Resource::Program, action),
            format!("{} study programs", verb(action)),
        ));
    }

    entries.push(CatalogEntry::new(
        PermissionName::new(Resource::Program, Action::Any).category("jurusan"),
        "Every study program",
    ));
    for code in JURUSAN {
        for action in [Action::View, Action::Edit] {
            entries.push(CatalogEntry::new(
                jurusan(code, action),
                format!("{} the {code} study program", verb(action)),
            ));
        }
    }

    entries
}

/// `prestasi.<recipient>.<level>.<action>`
pub fn prestasi(recipient: &str, level: &str, action: Action) -> PermissionName {
    PermissionName::new(Resource::Prestasi, action)
        .category(recipient)
        .category(level)
}

/// `program.jurusan.<CODE>.<action>`
pub fn jurusan(code: &str, action: Action) -> PermissionName {
    PermissionName::new(Resource::Program, action)
        .category("jurusan")
        .code(code)
}

fn verb(action: Action) -> &'static str {
    match action {
        Action::View => "View",
        Action::Create => "Create",
        Action::Edit => "Edit",
        Action::Delete => "Delete",
        Action::Any => "Manage",
    }
}
