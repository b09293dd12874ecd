//! `vpcforge add-vpc`: plan a VPC and write its Terraform tree.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::keypair::ensure_key_pair;
use crate::application::services::materializer::Materializer;
use crate::application::services::topology::{create_topology, plan_topology};
use crate::commands::TopologyArgs;
use crate::domain::artifact::default_plan;
use crate::domain::config::VpcforgeConfig;
use crate::infra::fs::LocalFs;
use crate::infra::keys::SshKeygen;
use crate::infra::prompt::CliResolver;
use crate::infra::templates::TeraTemplateStore;
use crate::infra::zones::AwsCliZoneDiscovery;

/// Exit code when planning succeeded but some artifacts failed.
pub const EXIT_PARTIAL: u8 = 2;

/// Arguments for the add-vpc command.
#[derive(Args)]
pub struct AddVpcArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Infra root [default: infra.root]
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Template directory [default: infra.templates, else built-in]
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Do not generate the region key pair
    #[arg(long)]
    pub skip_keys: bool,

    /// Replace existing files that differ
    #[arg(long, conflicts_with = "keep")]
    pub overwrite: bool,

    /// Keep existing files that differ; write new content to <file>.NEW
    #[arg(long)]
    pub keep: bool,
}

/// Load the template set named by flags or config.
///
/// # Errors
///
/// Returns an error if the templates cannot be loaded.
pub fn load_templates(args: &AddVpcArgs, config: &VpcforgeConfig) -> Result<TeraTemplateStore> {
    match args.templates.as_ref().or(config.infra.templates.as_ref()) {
        Some(dir) => TeraTemplateStore::from_dir(dir),
        None => TeraTemplateStore::builtin(),
    }
}

/// Run the add-vpc command.
///
/// # Errors
///
/// Returns an error if the input is invalid, planning fails, or the target
/// directories cannot be created. Per-artifact failures exit with
/// [`EXIT_PARTIAL`] after the report is printed.
pub async fn run(app: &AppContext, args: &AddVpcArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let input = args.topology.to_input()?.resolve(&config)?;
    let templates = load_templates(args, &config)?;
    let root = args.root.clone().unwrap_or_else(|| config.infra.root.clone());

    let reporter = app.reporter();
    let discovery = AwsCliZoneDiscovery::new(&app.runner, config.aws.credentials_file.clone());
    let plan = plan_topology(&input, &discovery, &reporter).await?;

    let fs = LocalFs;
    let resolver = CliResolver::from_flags(args.overwrite, args.keep, !app.non_interactive);
    let materializer = Materializer::new(&fs, &resolver, root);
    let report = create_topology(&plan, &default_plan(), &materializer, &templates, &reporter)?;

    let mut keys_failed = false;
    let keys = if args.skip_keys {
        None
    } else {
        let keygen = SshKeygen::new(&app.runner);
        match ensure_key_pair(&plan.record, &materializer, &keygen, &reporter).await {
            Ok(outcome) => {
                keys_failed = outcome.has_failures();
                Some(outcome)
            }
            Err(e) => {
                tracing::warn!("key pair skipped: {e:#}");
                app.output.error(&format!("{e:#}"));
                keys_failed = true;
                None
            }
        }
    };
    drop(reporter);

    app.renderer().render_report(&plan, &report, keys.as_ref())?;

    if report.has_failures() || keys_failed {
        return Ok(ExitCode::from(EXIT_PARTIAL));
    }
    Ok(ExitCode::SUCCESS)
}
