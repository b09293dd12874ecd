//! `vpcforge plan`: show the subnet layout without writing anything.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::topology::plan_topology;
use crate::commands::TopologyArgs;
use crate::infra::zones::AwsCliZoneDiscovery;

/// Arguments for the plan command.
#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,
}

/// Run the plan command.
///
/// # Errors
///
/// Returns an error if the input is invalid, zone discovery fails, or the
/// layout is impossible.
pub async fn run(app: &AppContext, args: &PlanArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let input = args.topology.to_input()?.resolve(&config)?;
    let discovery = AwsCliZoneDiscovery::new(&app.runner, config.aws.credentials_file.clone());
    let plan = {
        let reporter = app.reporter();
        plan_topology(&input, &discovery, &reporter).await?
    };
    app.renderer().render_plan(&plan)?;
    Ok(ExitCode::SUCCESS)
}
