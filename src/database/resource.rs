//! Compile-time registry of listable resources.
//!
//! Every table and column name that can reach SQL text lives in a `'static`
//! [`ResourceSpec`] here. Request input only ever selects one of these entries.

use std::str::FromStr;

/// How an exact-match filter value is parsed before it is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Integer,
    Boolean,
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterColumn {
    pub name: &'static str,
    pub kind: FilterKind,
}

const fn filter(name: &'static str, kind: FilterKind) -> FilterColumn {
    FilterColumn { name, kind }
}

#[derive(Debug)]
pub struct ResourceSpec {
    /// Path segment used by the list routes
    pub name: &'static str,
    pub table: &'static str,
    /// Columns projected into each JSON row
    pub columns: &'static [&'static str],
    pub sortable: &'static [&'static str],
    pub default_sort: &'static str,
    pub searchable: &'static [&'static str],
    pub filterable: &'static [FilterColumn],
    /// Rows with `deleted_at` set are always excluded
    pub soft_delete: bool,
    /// Static predicate for the public site; `None` means not publicly listable
    pub public_scope: Option<&'static str>,
}

impl ResourceSpec {
    pub fn is_sortable(&self, column: &str) -> Option<&'static str> {
        self.sortable.iter().copied().find(|c| *c == column)
    }

    pub fn filter_column(&self, column: &str) -> Option<&'static FilterColumn> {
        self.filterable.iter().find(|f| f.name == column)
    }
}

const PROGRAM_STATUS: &[&str] = &["draft", "published", "archived"];
const COHORT_STATUS: &[&str] = &["planned", "open", "closed"];
const AUDIENCE: &[&str] = &["public", "admins"];
const CONTACT_STATUS: &[&str] = &["new", "in_progress", "resolved"];
const APPLICATION_STATUS: &[&str] = &["pending", "approved", "rejected", "waitlisted"];
const USER_ROLES: &[&str] = &["user", "admin", "super_admin"];

static USERS: ResourceSpec = ResourceSpec {
    name: "users",
    table: "users",
    columns: &["id", "email", "full_name", "role", "is_active", "last_login_at", "created_at", "updated_at"],
    sortable: &["id", "email", "full_name", "role", "created_at", "last_login_at"],
    default_sort: "created_at",
    searchable: &["email", "full_name"],
    filterable: &[
        filter("role", FilterKind::OneOf(USER_ROLES)),
        filter("is_active", FilterKind::Boolean),
    ],
    soft_delete: true,
    public_scope: None,
};

static PROGRAMS: ResourceSpec = ResourceSpec {
    name: "programs",
    table: "programs",
    columns: &["id", "title", "slug", "summary", "description", "status", "created_at", "updated_at"],
    sortable: &["id", "title", "status", "created_at", "updated_at"],
    default_sort: "created_at",
    searchable: &["title", "summary", "description"],
    filterable: &[
        filter("status", FilterKind::OneOf(PROGRAM_STATUS)),
        filter("slug", FilterKind::Text),
    ],
    soft_delete: true,
    public_scope: Some("\"status\" = 'published'"),
};

static COHORTS: ResourceSpec = ResourceSpec {
    name: "cohorts",
    table: "cohorts",
    columns: &["id", "program_id", "name", "starts_on", "ends_on", "capacity", "status", "created_at", "updated_at"],
    sortable: &["id", "name", "starts_on", "ends_on", "capacity", "created_at"],
    default_sort: "starts_on",
    searchable: &["name"],
    filterable: &[
        filter("program_id", FilterKind::Integer),
        filter("status", FilterKind::OneOf(COHORT_STATUS)),
    ],
    soft_delete: true,
    public_scope: None,
};

static ANNOUNCEMENTS: ResourceSpec = ResourceSpec {
    name: "announcements",
    table: "announcements",
    columns: &["id", "title", "body", "audience", "is_published", "published_at", "created_by", "created_at", "updated_at"],
    sortable: &["id", "title", "published_at", "created_at"],
    default_sort: "created_at",
    searchable: &["title", "body"],
    filterable: &[
        filter("audience", FilterKind::OneOf(AUDIENCE)),
        filter("is_published", FilterKind::Boolean),
        filter("created_by", FilterKind::Integer),
    ],
    soft_delete: true,
    public_scope: Some("\"is_published\" = TRUE AND \"audience\" = 'public'"),
};

static EVENTS: ResourceSpec = ResourceSpec {
    name: "events",
    table: "events",
    columns: &["id", "title", "description", "location", "starts_at", "ends_at", "is_published", "created_at", "updated_at"],
    sortable: &["id", "title", "starts_at", "ends_at", "created_at"],
    default_sort: "starts_at",
    searchable: &["title", "description", "location"],
    filterable: &[filter("is_published", FilterKind::Boolean)],
    soft_delete: true,
    public_scope: Some("\"is_published\" = TRUE"),
};

static CONTACT_SUBMISSIONS: ResourceSpec = ResourceSpec {
    name: "contact-submissions",
    table: "contact_submissions",
    columns: &["id", "name", "email", "subject", "message", "status", "created_at", "updated_at"],
    sortable: &["id", "name", "email", "status", "created_at"],
    default_sort: "created_at",
    searchable: &["name", "email", "subject", "message"],
    filterable: &[filter("status", FilterKind::OneOf(CONTACT_STATUS))],
    soft_delete: true,
    public_scope: None,
};

static APPLICATIONS: ResourceSpec = ResourceSpec {
    name: "applications",
    table: "applications",
    columns: &["id", "program_id", "cohort_id", "full_name", "email", "phone", "motivation", "status", "created_at", "updated_at"],
    sortable: &["id", "full_name", "email", "status", "created_at"],
    default_sort: "created_at",
    searchable: &["full_name", "email"],
    filterable: &[
        filter("status", FilterKind::OneOf(APPLICATION_STATUS)),
        filter("program_id", FilterKind::Integer),
        filter("cohort_id", FilterKind::Integer),
    ],
    soft_delete: true,
    public_scope: None,
};

static AUDIT_LOGS: ResourceSpec = ResourceSpec {
    name: "audit-logs",
    table: "audit_logs",
    columns: &["id", "actor_id", "action", "entity_type", "entity_id", "message", "metadata", "created_at"],
    sortable: &["id", "action", "entity_type", "created_at"],
    default_sort: "created_at",
    searchable: &["action", "message"],
    filterable: &[
        filter("actor_id", FilterKind::Integer),
        filter("action", FilterKind::Text),
        filter("entity_type", FilterKind::Text),
        filter("entity_id", FilterKind::Integer),
    ],
    soft_delete: false,
    public_scope: None,
};

static NOTIFICATIONS: ResourceSpec = ResourceSpec {
    name: "notifications",
    table: "notifications",
    columns: &["id", "audit_log_id", "title", "body", "is_read", "read_at", "created_at", "updated_at"],
    sortable: &["id", "is_read", "created_at"],
    default_sort: "created_at",
    searchable: &["title", "body"],
    filterable: &[filter("is_read", FilterKind::Boolean)],
    soft_delete: false,
    public_scope: None,
};

/// The closed set of list-engine resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Programs,
    Cohorts,
    Announcements,
    Events,
    ContactSubmissions,
    Applications,
    AuditLogs,
    Notifications,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Users,
        Resource::Programs,
        Resource::Cohorts,
        Resource::Announcements,
        Resource::Events,
        Resource::ContactSubmissions,
        Resource::Applications,
        Resource::AuditLogs,
        Resource::Notifications,
    ];

    pub fn spec(self) -> &'static ResourceSpec {
        match self {
            Resource::Users => &USERS,
            Resource::Programs => &PROGRAMS,
            Resource::Cohorts => &COHORTS,
            Resource::Announcements => &ANNOUNCEMENTS,
            Resource::Events => &EVENTS,
            Resource::ContactSubmissions => &CONTACT_SUBMISSIONS,
            Resource::Applications => &APPLICATIONS,
            Resource::AuditLogs => &AUDIT_LOGS,
            Resource::Notifications => &NOTIFICATIONS,
        }
    }

    /// Resources served by the generic admin list route. Audit logs and
    /// notifications have dedicated routes with their own gates and scoping.
    pub fn is_admin_listable(self) -> bool {
        !matches!(self, Resource::AuditLogs | Resource::Notifications)
    }

    pub fn is_public(self) -> bool {
        self.spec().public_scope.is_some()
    }
}

impl FromStr for Resource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.spec().name == s)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_identifier(name: &str) -> bool {
        !name.is_empty()
            && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit())
    }

    #[test]
    fn every_identifier_is_a_plain_lowercase_name() {
        for resource in Resource::ALL {
            let spec = resource.spec();
            assert!(is_identifier(spec.table), "{}", spec.table);
            for column in spec
                .columns
                .iter()
                .chain(spec.sortable)
                .chain(spec.searchable)
                .chain(spec.filterable.iter().map(|f| &f.name))
            {
                assert!(is_identifier(column), "{}.{}", spec.table, column);
            }
        }
    }

    #[test]
    fn default_sort_is_allow_listed() {
        for resource in Resource::ALL {
            let spec = resource.spec();
            assert!(spec.is_sortable(spec.default_sort).is_some(), "{}", spec.name);
        }
    }

    #[test]
    fn soft_delete_column_is_never_filterable() {
        for resource in Resource::ALL {
            assert!(resource.spec().filter_column("deleted_at").is_none());
        }
    }

    #[test]
    fn parses_path_segments() {
        assert_eq!("contact-submissions".parse::<Resource>(), Ok(Resource::ContactSubmissions));
        assert_eq!("programs".parse::<Resource>(), Ok(Resource::Programs));
        assert!("pg_shadow".parse::<Resource>().is_err());
        assert!(!Resource::Notifications.is_admin_listable());
        assert!(Resource::Events.is_public());
        assert!(!Resource::Users.is_public());
    }
}
