// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use tabula_app::{
    PaginationInfo, QueryError, QueryRequest, QueryResponse, QueryTransport, ResourceKind, Row,
};
use time::macros::format_description;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

pub const DEFAULT_SEED: u64 = 7;

const FIRST_NAMES: [&str; 14] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Rowan",
];
const LAST_NAMES: [&str; 12] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Turner", "Brooks",
];

const ROLES: [(&str, &str); 6] = [
    ("owner", "Full access including billing"),
    ("admin", "Manage admins, roles and settings"),
    ("support", "Read customer data and revoke sessions"),
    ("auditor", "Read-only access to activity logs"),
    ("translator", "Edit language packs"),
    ("analyst", "Read telemetry dashboards"),
];

const PERMISSION_GROUPS: [&str; 6] = [
    "admins",
    "roles",
    "sessions",
    "languages",
    "telemetry",
    "activity",
];
const PERMISSION_VERBS: [(&str, &str); 4] = [
    ("read", "View"),
    ("write", "Create and edit"),
    ("delete", "Remove"),
    ("export", "Download"),
];

const LANGUAGES: [(&str, &str, &str, bool); 8] = [
    ("en", "English", "English", true),
    ("es", "Spanish", "Español", true),
    ("fr", "French", "Français", true),
    ("de", "German", "Deutsch", true),
    ("pt", "Portuguese", "Português", false),
    ("ja", "Japanese", "日本語", true),
    ("ar", "Arabic", "العربية", false),
    ("tr", "Turkish", "Türkçe", false),
];

const ADMIN_STATUSES: [&str; 3] = ["active", "active", "suspended"];
const SESSION_STATUSES: [&str; 3] = ["active", "expired", "revoked"];
const USER_AGENTS: [&str; 5] = [
    "Firefox 131 on Linux",
    "Chrome 129 on macOS",
    "Safari 18 on iOS",
    "Edge 129 on Windows",
    "curl 8.10",
];
const TELEMETRY_EVENTS: [&str; 5] = [
    "login",
    "page_view",
    "export",
    "search",
    "api_error",
];
const TELEMETRY_SOURCES: [&str; 3] = ["web", "api", "worker"];
const ACTIVITY_ACTIONS: [&str; 6] = [
    "admin.create",
    "admin.suspend",
    "role.update",
    "session.revoke",
    "language.enable",
    "settings.update",
];

const ADMIN_COUNT: u64 = 37;
const SESSION_COUNT: u64 = 80;
const TELEMETRY_COUNT: u64 = 120;
const ACTIVITY_COUNT: u64 = 150;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Generates admin-panel rows for every resource from a seed.
#[derive(Debug, Clone)]
pub struct AdminFaker {
    rng: DeterministicRng,
}

impl AdminFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn rows(&mut self, resource: ResourceKind) -> Vec<Row> {
        let values: Vec<Value> = match resource {
            ResourceKind::Admins => (1..=ADMIN_COUNT).map(|id| self.admin(id)).collect(),
            ResourceKind::Roles => ROLES
                .iter()
                .enumerate()
                .map(|(index, (name, description))| {
                    json!({
                        "id": index + 1,
                        "name": name,
                        "description": description,
                        "admin_count": self.rng.int_n(9),
                    })
                })
                .collect(),
            ResourceKind::Permissions => permissions(),
            ResourceKind::Sessions => (1..=SESSION_COUNT).map(|id| self.session(id)).collect(),
            ResourceKind::Languages => LANGUAGES
                .iter()
                .map(|(code, name, native, enabled)| {
                    json!({"code": code, "name": name, "native_name": native, "enabled": enabled})
                })
                .collect(),
            ResourceKind::Telemetry => (1..=TELEMETRY_COUNT)
                .map(|id| self.telemetry(id))
                .collect(),
            ResourceKind::ActivityLogs => (1..=ACTIVITY_COUNT)
                .map(|id| self.activity(id))
                .collect(),
        };
        values.into_iter().filter_map(into_row).collect()
    }

    fn admin(&mut self, id: u64) -> Value {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        json!({
            "id": id,
            "name": format!("{first} {last}"),
            "email": format!("{}.{}{id}@example.com", first.to_lowercase(), last.to_lowercase()),
            "role": ROLES[self.rng.int_n(ROLES.len())].0,
            "status": self.pick(&ADMIN_STATUSES),
            "last_login_at": self.timestamp(),
        })
    }

    fn session(&mut self, id: u64) -> Value {
        json!({
            "id": id,
            "admin_id": 1 + self.rng.int_n(ADMIN_COUNT as usize),
            "ip_address": format!("10.0.{}.{}", self.rng.int_n(16), 1 + self.rng.int_n(254)),
            "user_agent": self.pick(&USER_AGENTS),
            "status": self.pick(&SESSION_STATUSES),
            "created_at": self.timestamp(),
        })
    }

    fn telemetry(&mut self, id: u64) -> Value {
        json!({
            "id": id,
            "event": self.pick(&TELEMETRY_EVENTS),
            "source": self.pick(&TELEMETRY_SOURCES),
            "value": self.rng.int_n(1000),
            "recorded_at": self.timestamp(),
        })
    }

    fn activity(&mut self, id: u64) -> Value {
        let actor = format!(
            "{}.{}",
            self.pick(&FIRST_NAMES).to_lowercase(),
            self.pick(&LAST_NAMES).to_lowercase()
        );
        json!({
            "id": id,
            "actor": actor,
            "action": self.pick(&ACTIVITY_ACTIONS),
            "target": format!("#{}", 1 + self.rng.int_n(200)),
            "created_at": self.timestamp(),
        })
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    /// A second-resolution UTC timestamp within the first quarter of 2026.
    fn timestamp(&mut self) -> String {
        let offset = Duration::minutes(self.rng.int_n(90 * 24 * 60) as i64);
        let at = reference_start() + offset;
        at.format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_default()
    }
}

fn reference_start() -> PrimitiveDateTime {
    let date = Date::from_calendar_date(2026, Month::January, 1).unwrap_or(Date::MIN);
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
}

fn permissions() -> Vec<Value> {
    PERMISSION_GROUPS
        .iter()
        .flat_map(|group| PERMISSION_VERBS.iter().map(move |verb| (group, verb)))
        .enumerate()
        .map(|(index, (group, (verb, summary)))| {
            json!({
                "id": index + 1,
                "key": format!("{group}.{verb}"),
                "group": group,
                "description": format!("{summary} {group}"),
            })
        })
        .collect()
}

fn into_row(value: Value) -> Option<Row> {
    match value {
        Value::Object(row) => Some(row),
        _ => None,
    }
}

/// In-memory query backend honouring the canonical request: global search,
/// column filters, the date pair and paging.
#[derive(Debug, Clone, Default)]
pub struct DemoBackend {
    tables: BTreeMap<ResourceKind, Vec<Row>>,
    failures: BTreeMap<ResourceKind, VecDeque<QueryError>>,
    requests: Vec<(String, QueryRequest)>,
}

impl DemoBackend {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        let mut faker = AdminFaker::new(seed);
        let tables = ResourceKind::ALL
            .iter()
            .map(|resource| (*resource, faker.rows(*resource)))
            .collect();
        Self {
            tables,
            ..Self::default()
        }
    }

    pub fn rows(&self, resource: ResourceKind) -> &[Row] {
        self.tables.get(&resource).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_rows(&mut self, resource: ResourceKind, rows: Vec<Row>) {
        self.tables.insert(resource, rows);
    }

    /// Replaces a table with rows parsed from a JSON array of objects.
    pub fn load_json(&mut self, resource: ResourceKind, raw: &str) -> Result<()> {
        let value: Value = serde_json::from_str(raw)
            .with_context(|| format!("parse {} fixture", resource.as_str()))?;
        let Value::Array(items) = value else {
            bail!("{} fixture must be a JSON array", resource.as_str());
        };
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Some(row) = into_row(item) else {
                bail!("{} fixture item {index} is not an object", resource.as_str());
            };
            rows.push(row);
        }
        self.set_rows(resource, rows);
        Ok(())
    }

    /// Makes the next query against `resource` fail with `error`.
    pub fn fail_next(&mut self, resource: ResourceKind, error: QueryError) {
        self.failures.entry(resource).or_default().push_back(error);
    }

    pub fn requests(&self) -> &[(String, QueryRequest)] {
        &self.requests
    }

    pub fn answer(&self, resource: ResourceKind, request: &QueryRequest) -> QueryResponse {
        let all = self.rows(resource);
        let matching = all
            .iter()
            .filter(|row| matches_request(resource, row, request))
            .collect::<Vec<_>>();

        let per_page = request.per_page.max(1) as usize;
        let start = (request.page.max(1) as usize - 1).saturating_mul(per_page);
        let data = matching
            .iter()
            .skip(start)
            .take(per_page)
            .map(|row| (*row).clone())
            .collect();

        QueryResponse {
            data,
            pagination: PaginationInfo {
                page: u64::from(request.page),
                per_page: u64::from(request.per_page),
                total: all.len() as u64,
                filtered: request.has_filter().then_some(matching.len() as u64),
            },
        }
    }
}

impl QueryTransport for DemoBackend {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        self.requests.push((endpoint.to_owned(), request.clone()));
        let Some(resource) = ResourceKind::ALL
            .into_iter()
            .find(|resource| resource.endpoint() == endpoint)
        else {
            return Err(QueryError::Http {
                status: 404,
                message: format!("no such endpoint {endpoint}"),
            });
        };
        if let Some(error) = self
            .failures
            .get_mut(&resource)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(self.answer(resource, request))
    }
}

fn matches_request(resource: ResourceKind, row: &Row, request: &QueryRequest) -> bool {
    if let Some(global) = request.global_search() {
        let needle = global.to_lowercase();
        let hit = resource
            .columns()
            .iter()
            .filter_map(|column| row.get(column.key))
            .any(|value| plain(value).to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    if let Some(search) = &request.search {
        for (name, wanted) in &search.columns {
            let actual = row.get(name).map(plain).unwrap_or_default();
            if !actual.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
    }

    if let (Some(range), Some(key)) = (&request.date, resource.date_key()) {
        let day = row
            .get(key)
            .and_then(Value::as_str)
            .and_then(|stamp| stamp.get(..10))
            .unwrap_or_default();
        if day < range.from.as_str() || day > range.to.as_str() {
            return false;
        }
    }
    true
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
