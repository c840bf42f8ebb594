//! Fleet Manager Client
//!
//! Client for the fleet manager's private agent-cluster API. The data-plane
//! synchronizer pulls the desired state of every tenant assigned to its
//! cluster and pushes back the observed status.
//!
//! # Example
//!
//! ```no_run
//! use fleet_manager_client::{FleetManagerClient, FleetManagerClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FleetManagerClient::new(
//!     "http://127.0.0.1:8000".to_string(),
//!     "cluster-1234".to_string(),
//!     "static-token".to_string(),
//! )?;
//!
//! let list = client.get_managed_centrals().await?;
//! println!("{} centrals assigned to this cluster", list.items.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod fleet_manager_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::FleetManagerClient;
pub use error::FleetManagerError;
pub use fleet_manager_trait::FleetManagerClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockFleetManagerClient;
