//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout. Failures use the error object from [`format_error`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::keypair::KeyPairOutcome;
use crate::application::services::topology::Plan;
use crate::domain::allocator::{AvailabilityZone, SubnetAssignment};
use crate::domain::artifact::MaterializationReport;
use crate::domain::error::{CollaboratorError, ConfigError, NetworkError, PlanningError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable code for the error object, from the first typed error in the chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.downcast_ref::<PlanningError>().is_some() {
            return "planning_error";
        }
        if cause.downcast_ref::<NetworkError>().is_some() {
            return "invalid_cidr";
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "invalid_input";
        }
        if cause.downcast_ref::<CollaboratorError>().is_some() {
            return "collaborator_error";
        }
    }
    "error"
}

#[derive(Serialize)]
struct PlanJson<'a> {
    env: &'a str,
    region: &'a str,
    cidr: String,
    mgmt_vpc_id: &'a str,
    multi_az: bool,
    nat: &'a str,
    eip: &'a str,
    zones: &'a [AvailabilityZone],
    subnets: &'a [SubnetAssignment],
}

impl<'a> From<&'a Plan> for PlanJson<'a> {
    fn from(plan: &'a Plan) -> Self {
        let r = &plan.record;
        Self {
            env: r.env(),
            region: r.region(),
            cidr: r.cidr().to_string(),
            mgmt_vpc_id: r.mgmt_vpc_id(),
            multi_az: r.multi_az(),
            nat: r.nat().as_str(),
            eip: r.eip().as_str(),
            zones: &plan.zones,
            subnets: r.assignments(),
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    topology: PlanJson<'a>,
    #[serde(flatten)]
    report: &'a MaterializationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<&'a KeyPairOutcome>,
    ok: bool,
}

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_plan(plan: &Plan) -> Result<()> {
        print_json(&PlanJson::from(plan))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_report(
        plan: &Plan,
        report: &MaterializationReport,
        keys: Option<&KeyPairOutcome>,
    ) -> Result<()> {
        let ok = !report.has_failures() && !keys.is_some_and(KeyPairOutcome::has_failures);
        print_json(&ReportJson {
            topology: PlanJson::from(plan),
            report,
            keys,
            ok,
        })
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(entries: &[(&str, String)], path: &Path) -> Result<()> {
        let settings: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
            .collect();
        print_json(&serde_json::json!({
            "path": path,
            "settings": settings,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print_json(&serde_json::json!({ "version": version }))
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}
