//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod allocator;
pub mod artifact;
pub mod config;
pub mod error;
pub mod input;
pub mod network;
pub mod topology;

pub use allocator::{
    AllocationPolicy, AvailabilityZone, SingleZoneSelection, SubnetAssignment, SubnetRole,
    allocate,
};
pub use artifact::{ArtifactKind, ArtifactSpec, Layout, MaterializationReport, default_plan};
pub use config::VpcforgeConfig;
pub use error::{
    CollaboratorError, ConfigError, MaterializationError, NetworkError, PlanningError,
};
pub use input::{PolicyChoice, ResolvedInput, TopologyInput};
pub use network::NetworkBlock;
pub use topology::{EipMode, NatPolicy, RecordParams, TemplateData, TopologyRecord};
