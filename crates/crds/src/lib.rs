//! Fleetshard data model
//!
//! The `Central` custom resource materialized on the data-plane cluster, the
//! `ManagedCentral` desired state handed out by the fleet manager and the
//! `DataPlaneCentralStatus` reported back to it.

pub mod central;
pub mod managed_central;
pub mod status;

pub use central::*;
pub use managed_central::*;
pub use status::*;
