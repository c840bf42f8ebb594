//! Environment configuration
//!
//! | variable | default |
//! |---|---|
//! | `CLUSTER_ID` | required |
//! | `FLEET_MANAGER_ENDPOINT` | `http://127.0.0.1:8000` |
//! | `FLEET_MANAGER_TOKEN` | required |
//! | `RUNTIME_POLL_PERIOD` | `15` (seconds) |
//! | `CREATE_AUTH_PROVIDER` | `false` |
//! | `EGRESS_PROXY_IMAGE` | empty |
//! | `USE_ROUTES` | detected from API discovery |
//! | `HEALTH_CHECK_BIND_ADDRESS` | `0.0.0.0:8080` |

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ControllerError;

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster_id: String,
    pub fleet_manager_endpoint: String,
    pub fleet_manager_token: String,
    pub poll_period: Duration,
    pub create_auth_provider: bool,
    pub egress_proxy_image: String,
    /// `None` means detect from the API server
    pub use_routes: Option<bool>,
    pub health_check_address: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{key} environment variable is required"))
            })
        };

        let poll_period = match get("RUNTIME_POLL_PERIOD") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                ControllerError::InvalidConfig(format!("RUNTIME_POLL_PERIOD must be seconds, got {raw:?}"))
            })?),
            None => Duration::from_secs(15),
        };
        if poll_period.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RUNTIME_POLL_PERIOD must be greater than zero".to_string(),
            ));
        }

        let health_check_address = get("HEALTH_CHECK_BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let health_check_address = health_check_address.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!(
                "HEALTH_CHECK_BIND_ADDRESS is not a socket address: {health_check_address:?}"
            ))
        })?;

        Ok(Self {
            cluster_id: required("CLUSTER_ID")?,
            fleet_manager_endpoint: get("FLEET_MANAGER_ENDPOINT")
                .unwrap_or_else(|| "http://127.0.0.1:8000".to_string()),
            fleet_manager_token: required("FLEET_MANAGER_TOKEN")?,
            poll_period,
            create_auth_provider: get("CREATE_AUTH_PROVIDER")
                .map(|v| parse_bool("CREATE_AUTH_PROVIDER", &v))
                .transpose()?
                .unwrap_or(false),
            egress_proxy_image: get("EGRESS_PROXY_IMAGE").unwrap_or_default(),
            use_routes: get("USE_ROUTES").map(|v| parse_bool("USE_ROUTES", &v)).transpose()?,
            health_check_address,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ControllerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!("{key} must be a boolean, got {raw:?}"))),
    }
}
