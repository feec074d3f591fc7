// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Admins,
    Roles,
    Permissions,
    Sessions,
    Languages,
    Telemetry,
    ActivityLogs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
}

const fn column(key: &'static str, label: &'static str) -> ColumnSpec {
    ColumnSpec { key, label }
}

const ADMIN_COLUMNS: [ColumnSpec; 6] = [
    column("id", "id"),
    column("name", "name"),
    column("email", "email"),
    column("role", "role"),
    column("status", "status"),
    column("last_login_at", "last login"),
];

const ROLE_COLUMNS: [ColumnSpec; 4] = [
    column("id", "id"),
    column("name", "name"),
    column("description", "description"),
    column("admin_count", "admins"),
];

const PERMISSION_COLUMNS: [ColumnSpec; 4] = [
    column("id", "id"),
    column("key", "key"),
    column("group", "group"),
    column("description", "description"),
];

const SESSION_COLUMNS: [ColumnSpec; 6] = [
    column("id", "id"),
    column("admin_id", "admin"),
    column("ip_address", "ip"),
    column("user_agent", "agent"),
    column("status", "status"),
    column("created_at", "started"),
];

const LANGUAGE_COLUMNS: [ColumnSpec; 4] = [
    column("code", "code"),
    column("name", "name"),
    column("native_name", "native"),
    column("enabled", "enabled"),
];

const TELEMETRY_COLUMNS: [ColumnSpec; 5] = [
    column("id", "id"),
    column("event", "event"),
    column("source", "source"),
    column("value", "value"),
    column("recorded_at", "recorded"),
];

const ACTIVITY_COLUMNS: [ColumnSpec; 5] = [
    column("id", "id"),
    column("actor", "actor"),
    column("action", "action"),
    column("target", "target"),
    column("created_at", "when"),
];

impl ResourceKind {
    pub const ALL: [Self; 7] = [
        Self::Admins,
        Self::Roles,
        Self::Permissions,
        Self::Sessions,
        Self::Languages,
        Self::Telemetry,
        Self::ActivityLogs,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Roles => "roles",
            Self::Permissions => "permissions",
            Self::Sessions => "sessions",
            Self::Languages => "languages",
            Self::Telemetry => "telemetry",
            Self::ActivityLogs => "activity_logs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admins" => Some(Self::Admins),
            "roles" => Some(Self::Roles),
            "permissions" => Some(Self::Permissions),
            "sessions" => Some(Self::Sessions),
            "languages" => Some(Self::Languages),
            "telemetry" => Some(Self::Telemetry),
            "activity_logs" | "activity-logs" => Some(Self::ActivityLogs),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Roles => "roles",
            Self::Permissions => "perms",
            Self::Sessions => "sessions",
            Self::Languages => "languages",
            Self::Telemetry => "telemetry",
            Self::ActivityLogs => "activity",
        }
    }

    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Admins => "admins/query",
            Self::Roles => "roles/query",
            Self::Permissions => "permissions/query",
            Self::Sessions => "sessions/query",
            Self::Languages => "languages/query",
            Self::Telemetry => "telemetry/query",
            Self::ActivityLogs => "activity-logs/query",
        }
    }

    pub const fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Admins => &ADMIN_COLUMNS,
            Self::Roles => &ROLE_COLUMNS,
            Self::Permissions => &PERMISSION_COLUMNS,
            Self::Sessions => &SESSION_COLUMNS,
            Self::Languages => &LANGUAGE_COLUMNS,
            Self::Telemetry => &TELEMETRY_COLUMNS,
            Self::ActivityLogs => &ACTIVITY_COLUMNS,
        }
    }

    pub const fn filter_fields(self) -> &'static [&'static str] {
        match self {
            Self::Admins => &["email", "role", "status"],
            Self::Roles => &["name"],
            Self::Permissions => &["group"],
            Self::Sessions => &["admin_id", "status"],
            Self::Languages => &["enabled"],
            Self::Telemetry => &["event", "source"],
            Self::ActivityLogs => &["actor", "action"],
        }
    }

    pub const fn id_key(self) -> &'static str {
        match self {
            Self::Languages => "code",
            _ => "id",
        }
    }

    /// Row key the server filters `date.from`/`date.to` against, when the
    /// page exposes a date range at all.
    pub const fn date_key(self) -> Option<&'static str> {
        match self {
            Self::Sessions | Self::ActivityLogs => Some("created_at"),
            Self::Telemetry => Some("recorded_at"),
            _ => None,
        }
    }

    pub const fn supports_date_range(self) -> bool {
        self.date_key().is_some()
    }

    pub const fn default_debounce(self) -> Duration {
        match self {
            Self::Roles | Self::Permissions | Self::Languages => Duration::from_millis(500),
            Self::Admins | Self::Sessions => Duration::from_millis(750),
            Self::Telemetry | Self::ActivityLogs => Duration::from_millis(1000),
        }
    }

    /// Private container id the table owner renders into before claiming
    /// the shared slot.
    pub fn container_id(self) -> String {
        format!("{}-table", self.as_str())
    }
}
