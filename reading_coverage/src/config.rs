//! Coverage configuration: parsing, normalization, and loading.
//!
//! A TOML document describes:
//! - The operational day (day start, operating timezone, slot selection rule, DST policy)
//! - The dashboard polling interval
//! - How raw role names coming from authentication map to capability roles
//! - Declared valid ranges for the four measurement fields
//!
//! Key behaviors:
//! - Role names are trimmed, lowercased and de-duplicated while preserving order.
//!   A name mapped to two different roles is an error.
//! - Measurement ranges must be finite with `min <= max`.
//! - Sections this crate does not own (e.g. `[record_system]`) are left for
//!   their readers and ignored here.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - Normalization alone: [`normalize_config`]

use std::{collections::HashSet, mem, time::Duration};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::from_str;
use tracing::debug;

use crate::{
    clock::{DayStart, SlotSelection},
    measurement::{Field, MeasurementLimits},
    permissions::{Capabilities, Role},
    service::CoverageSettings,
    tz::{DstPolicy, parse_tz},
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoverageConfig {
    #[serde(default)]
    pub operational_day: OperationalDayCfg,
    #[serde(default)]
    pub polling: PollingCfg,
    #[serde(default)]
    pub roles: RoleMapping,
    #[serde(default)]
    pub limits: MeasurementLimits,
}

/// `[operational_day]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperationalDayCfg {
    /// "HH:MM", 08:00 when omitted.
    #[serde(default)]
    pub day_start: DayStart,
    /// IANA zone name of the operating site.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub slot_selection: SlotSelection,
    /// How slot boundaries that DST skips or repeats become instants.
    #[serde(default)]
    pub dst_policy: DstPolicy,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for OperationalDayCfg {
    fn default() -> Self {
        Self {
            day_start: DayStart::default(),
            timezone: default_timezone(),
            slot_selection: SlotSelection::default(),
            dst_policy: DstPolicy::default(),
        }
    }
}

/// `[polling]`
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingCfg {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollingCfg {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Raw role names per capability role, e.g. `admin = ["admin", "monitoring_admin"]`.
///
/// Resolved once at the boundary with [`RoleMapping::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoleMapping {
    #[serde(default = "default_operator_names")]
    pub operator: Vec<String>,
    #[serde(default = "default_validator_names")]
    pub validator: Vec<String>,
    #[serde(default = "default_admin_names")]
    pub admin: Vec<String>,
}

fn default_operator_names() -> Vec<String> {
    vec!["operator".into()]
}

fn default_validator_names() -> Vec<String> {
    vec!["validator".into()]
}

fn default_admin_names() -> Vec<String> {
    vec!["admin".into()]
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self {
            operator: default_operator_names(),
            validator: default_validator_names(),
            admin: default_admin_names(),
        }
    }
}

impl RoleMapping {
    /// Role a raw name maps to, if any. Matching ignores case and surrounding space.
    pub fn lookup(&self, raw: &str) -> Option<Role> {
        let name = raw.trim().to_lowercase();
        self.entries()
            .find(|(_, n)| **n == name)
            .map(|(role, _)| role)
    }

    /// Capabilities for an authenticated actor's raw role names.
    ///
    /// Unknown names grant nothing.
    pub fn resolve<S: AsRef<str>>(&self, raw_roles: &[S]) -> Capabilities {
        Capabilities::from_roles(raw_roles.iter().filter_map(|r| self.lookup(r.as_ref())))
    }

    fn entries(&self) -> impl Iterator<Item = (Role, &String)> {
        self.operator
            .iter()
            .map(|n| (Role::Operator, n))
            .chain(self.validator.iter().map(|n| (Role::Validator, n)))
            .chain(self.admin.iter().map(|n| (Role::Admin, n)))
    }

    fn names_mut(&mut self, role: Role) -> &mut Vec<String> {
        match role {
            Role::Operator => &mut self.operator,
            Role::Validator => &mut self.validator,
            Role::Admin => &mut self.admin,
        }
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default)]
pub struct NormalizationReport {
    /// Role names changed by trimming or lowercasing.
    pub role_names_renamed: usize,
    /// Duplicate role names removed within one role.
    pub role_names_deduped: usize,
}

/// Normalize a configuration in place.
///
/// Errors:
/// - Empty role names after trimming
/// - A role name mapped to two different roles
/// - A measurement range that is not finite or has `min > max`
/// - A zero polling interval
/// - An unknown timezone name
pub fn normalize_config(cfg: &mut CoverageConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    // name -> role it was first claimed by
    let mut claimed: IndexMap<String, Role> = IndexMap::new();
    for role in Role::ALL {
        let names = cfg.roles.names_mut(role);
        let before_len = names.len();
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(before_len);

        for raw in mem::take(names) {
            let name = raw.trim().to_lowercase();
            if name.is_empty() {
                bail!("role name for {role} cannot be empty after trimming");
            }
            if name != raw {
                report.role_names_renamed += 1;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(other) = claimed.get(&name) {
                bail!("role name '{name}' is mapped to both {other} and {role}");
            }
            claimed.insert(name.clone(), role);
            out.push(name);
        }
        report.role_names_deduped += before_len.saturating_sub(out.len());
        *names = out;
    }

    for field in Field::ALL {
        let range = cfg.limits.range(field);
        if !range.is_well_formed() {
            bail!("limits.{field} must be finite with min <= max, got {range}");
        }
    }

    if cfg.polling.interval_secs == 0 {
        bail!("polling.interval_secs must be greater than zero");
    }

    cfg.operational_day.timezone = cfg.operational_day.timezone.trim().to_string();
    parse_tz(&cfg.operational_day.timezone)?;

    Ok(report)
}

impl CoverageConfig {
    /// Runtime settings for [`CoverageService`](crate::service::CoverageService).
    pub fn settings(&self) -> anyhow::Result<CoverageSettings> {
        Ok(CoverageSettings {
            day_start: self.operational_day.day_start,
            selection: self.operational_day.slot_selection,
            limits: self.limits,
            timezone: parse_tz(&self.operational_day.timezone)?,
            dst_policy: self.operational_day.dst_policy,
        })
    }
}

/// Parse and normalize a configuration from a TOML string.
///
/// Errors:
/// - TOML parse failures
/// - Normalization errors (see [`normalize_config`])
pub fn load_config_str(toml_str: &str) -> anyhow::Result<CoverageConfig> {
    let mut cfg: CoverageConfig = from_str(toml_str).context("failed to parse coverage TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    debug!(?report, "coverage config normalized");
    Ok(cfg)
}

/// Read a configuration TOML file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<CoverageConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::ValueRange;
    use chrono_tz::Tz;

    const FULL: &str = r#"
        [operational_day]
        day_start = "08:00"
        timezone = " Africa/Algiers "
        slot_selection = "just_closed"
        dst_policy = "strict"

        [polling]
        interval_secs = 30

        [roles]
        operator = ["Operator", "operator", "field_agent"]
        validator = ["VALIDATOR"]
        admin = ["admin", " Monitoring_Admin "]

        [limits.pressure]
        min = 0.0
        max = 120.0

        [record_system]
        base_url = "https://records.example/api"
    "#;

    #[test]
    fn loads_and_normalizes() {
        let cfg = load_config_str(FULL).unwrap();
        assert_eq!(cfg.roles.operator, vec!["operator", "field_agent"]);
        assert_eq!(cfg.roles.admin, vec!["admin", "monitoring_admin"]);
        assert_eq!(cfg.polling.interval(), Duration::from_secs(30));
        assert_eq!(cfg.limits.pressure, ValueRange::new(0.0, 120.0));
        // untouched ranges keep their defaults
        assert_eq!(cfg.limits.flow_rate, MeasurementLimits::default().flow_rate);

        let settings = cfg.settings().unwrap();
        assert_eq!(settings.timezone, Tz::Africa__Algiers);
        assert_eq!(settings.day_start, DayStart::EIGHT_AM);
        assert_eq!(settings.selection, SlotSelection::JustClosed);
        assert_eq!(settings.dst_policy, DstPolicy::Strict);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg.operational_day.day_start, DayStart::EIGHT_AM);
        assert_eq!(cfg.roles, RoleMapping::default());
        assert_eq!(cfg.settings().unwrap().timezone, Tz::UTC);
        assert_eq!(cfg.settings().unwrap().dst_policy, DstPolicy::ShiftForward);
    }

    #[test]
    fn resolves_raw_roles_to_capabilities() {
        let cfg = load_config_str(FULL).unwrap();
        let caps = cfg.roles.resolve(&["MONITORING_ADMIN"]);
        assert!(caps.is_admin() && caps.has_operator() && caps.has_validator());

        let caps = cfg.roles.resolve(&["field_agent", "guest"]);
        assert!(caps.has_operator() && !caps.has_validator());

        assert!(cfg.roles.resolve::<&str>(&[]).is_read_only());
    }

    #[test]
    fn role_collision_errors() {
        let err = load_config_str(
            r#"
            [roles]
            operator = ["shift"]
            validator = ["SHIFT"]
        "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("mapped to both operator and validator"));
    }

    #[test]
    fn inverted_range_errors() {
        let err = load_config_str(
            r#"
            [limits.temperature]
            min = 50.0
            max = -10.0
        "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("limits.temperature"));
    }

    #[test]
    fn bad_day_start_and_zone_error() {
        assert!(load_config_str("[operational_day]\nday_start = \"24:00\"").is_err());
        assert!(load_config_str("[operational_day]\ntimezone = \"Nowhere/Town\"").is_err());
        assert!(load_config_str("[polling]\ninterval_secs = 0").is_err());
    }

    #[test]
    fn snapshot_normalized_roles() {
        let cfg = load_config_str(FULL).unwrap();
        insta::assert_json_snapshot!(cfg.roles, @r#"
        {
          "operator": [
            "operator",
            "field_agent"
          ],
          "validator": [
            "validator"
          ],
          "admin": [
            "admin",
            "monitoring_admin"
          ]
        }
        "#);
    }

    #[test]
    fn loads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.toml");
        std::fs::write(&path, FULL).unwrap();
        assert!(load_config_path(&path).is_ok());
        let err = load_config_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("read config file"));
    }
}
