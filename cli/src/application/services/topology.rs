//! Application service: plan and create a VPC topology.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use anyhow::Result;

use crate::application::ports::{
    ArtifactFs, ConflictResolver, ProgressReporter, TemplateSource, ZoneDiscovery,
};
use crate::application::services::materializer::Materializer;
use crate::domain::allocator::{AvailabilityZone, allocate};
use crate::domain::artifact::{ArtifactSpec, MaterializationReport};
use crate::domain::error::CollaboratorError;
use crate::domain::input::ResolvedInput;
use crate::domain::topology::TopologyRecord;

/// A planned topology. Nothing has been written yet.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Zones the allocation was computed against (empty when none were needed).
    pub zones: Vec<AvailabilityZone>,
    pub record: TopologyRecord,
}

/// Compute the subnet layout for `input`.
///
/// Zones come from the input when given, otherwise from `discovery` when the
/// policy needs them.
///
/// # Errors
///
/// Returns [`CollaboratorError::ZoneDiscovery`] if discovery fails, or a
/// [`crate::domain::error::PlanningError`] if the layout is impossible.
pub async fn plan_topology(
    input: &ResolvedInput,
    discovery: &impl ZoneDiscovery,
    reporter: &impl ProgressReporter,
) -> Result<Plan> {
    let zones = match &input.zones {
        Some(zones) => zones.clone(),
        None if input.needs_discovery() => {
            reporter.step(&format!("discovering availability zones in {}...", input.region));
            let zones = discovery
                .list_zones(&input.region, &input.env)
                .await
                .map_err(|e| CollaboratorError::ZoneDiscovery {
                    region: input.region.clone(),
                    source: e.into(),
                })?;
            tracing::debug!(region = %input.region, count = zones.len(), "zones discovered");
            zones
        }
        None => Vec::new(),
    };

    let assignments = allocate(input.cidr, &input.policy, &zones, input.subnet_prefix)?;
    let record = TopologyRecord::build(&input.record_params(), assignments)?;
    tracing::info!(
        env = record.env(),
        region = record.region(),
        subnets = record.assignments().len(),
        "topology planned"
    );
    Ok(Plan { zones, record })
}

/// Write the artifacts of a planned topology.
///
/// # Errors
///
/// Returns an error only if the target directories cannot be created; every
/// per-artifact failure is carried in the report.
pub fn create_topology<F: ArtifactFs, R: ConflictResolver>(
    plan: &Plan,
    artifacts: &[ArtifactSpec],
    materializer: &Materializer<'_, F, R>,
    templates: &impl TemplateSource,
    reporter: &impl ProgressReporter,
) -> Result<MaterializationReport> {
    let layout = materializer.layout(&plan.record);
    reporter.step(&format!("writing {}...", layout.region_dir().display()));
    let report = materializer.materialize(&plan.record, artifacts, templates)?;

    if report.has_failures() {
        reporter.warn(&format!(
            "{} of {} artifacts failed",
            report.failures().count(),
            report.artifacts.len()
        ));
    } else if report.all_skipped() {
        reporter.success("already up to date");
    } else {
        reporter.success(&format!("wrote {}", layout.region_dir().display()));
    }
    Ok(report)
}
