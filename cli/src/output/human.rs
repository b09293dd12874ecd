//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::keypair::KeyPairOutcome;
use crate::application::services::topology::Plan;
use crate::domain::artifact::{
    ArtifactOutcome, ArtifactReport, DirAction, FileAction, LinkAction, MaterializationReport,
};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("vpcforge v{version}"));
    }

    /// Render a planned topology.
    pub fn render_plan(&self, plan: &Plan) {
        if self.ctx.quiet {
            return;
        }
        let record = &plan.record;
        self.ctx
            .header(&format!("Topology {}/{}", record.env(), record.region()));
        self.ctx.kv("VPC:     ", &record.cidr().to_string());
        self.ctx.kv("Mgmt VPC:", record.mgmt_vpc_id());
        let policy = if record.multi_az() {
            format!("all-zone ({} zones)", plan.zones.len())
        } else {
            "single-zone".to_string()
        };
        self.ctx.kv("Policy:  ", &policy);
        self.ctx.kv(
            "NAT:     ",
            &format!("{} (elastic IPs: {})", record.nat(), record.eip()),
        );
        println!();
        self.ctx.header("Subnets:");
        for a in record.assignments() {
            println!(
                "    {:<16} {:<8} {}",
                a.zone.as_str(),
                a.role.as_str().style(self.ctx.styles.dim),
                a.block
            );
        }
    }

    /// Render the outcome of a create run.
    pub fn render_report(&self, report: &MaterializationReport, keys: Option<&KeyPairOutcome>) {
        for artifact in &report.artifacts {
            self.render_artifact(artifact);
        }
        match keys {
            Some(KeyPairOutcome::Present) => self.skipped("key pair already present"),
            Some(KeyPairOutcome::Generated { private, public }) => {
                self.file_line(private, Path::new("private key"));
                self.file_line(public, Path::new("public key"));
            }
            Some(KeyPairOutcome::Failed { code, message, .. }) => {
                self.ctx.error(&format!("{code}: {message}"));
            }
            None => {}
        }
    }

    fn render_artifact(&self, artifact: &ArtifactReport) {
        let path = &artifact.path;
        match &artifact.outcome {
            ArtifactOutcome::File { file } => self.file_line(file, path),
            ArtifactOutcome::Shared {
                canonical,
                reference,
            } => {
                self.file_line(canonical, path);
                self.link_line(reference);
            }
            ArtifactOutcome::Directory { directory } => match directory {
                DirAction::Created => self.ctx.success(&format!("copied {}", self.path(path))),
                DirAction::Skipped => {
                    self.skipped(&format!("{} exists, not copied", self.path(path)));
                }
            },
            ArtifactOutcome::Failed { code, message, .. } => {
                self.ctx.error(&format!("{code}: {message}"));
            }
        }
    }

    fn file_line(&self, action: &FileAction, path: &Path) {
        let path = self.path(path);
        match action {
            FileAction::Created => self.ctx.success(&format!("created {path}")),
            FileAction::Replaced => self.ctx.success(&format!("replaced {path}")),
            FileAction::Unchanged => self.skipped(&format!("{path} unchanged")),
            FileAction::Reused => self.skipped(&format!("{path} shared, left as is")),
            FileAction::Deferred { alternate } => self.ctx.warn(&format!(
                "kept existing {path}, new version in {}",
                self.path(alternate)
            )),
        }
    }

    fn link_line(&self, action: &LinkAction) {
        match action {
            LinkAction::Linked => self.ctx.success("linked region reference"),
            LinkAction::Relinked => self.ctx.success("replaced region reference with link"),
            LinkAction::AlreadyLinked => self.skipped("region reference already linked"),
            LinkAction::Deferred { alternate } => self.ctx.warn(&format!(
                "kept existing region file, link written to {}",
                self.path(alternate)
            )),
        }
    }

    fn skipped(&self, msg: &str) {
        if !self.ctx.quiet {
            println!("  {} {}", "·".style(self.ctx.styles.dim), msg.style(self.ctx.styles.dim));
        }
    }

    fn path(&self, path: &Path) -> String {
        path.display().style(self.ctx.styles.path).to_string()
    }

    /// Render configuration entries.
    pub fn render_config(&self, entries: &[(&str, String)], path: &Path) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.header(&format!("Configuration ({})", path.display()));
        let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in entries {
            self.ctx.kv(&format!("{key:<width$}"), value);
        }
    }
}
