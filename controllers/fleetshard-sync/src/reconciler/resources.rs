//! Target `Central` built from a desired state

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crds::{
    AutoScalingPolicy, Central, CentralComponentSpec, CentralSpec, CustomizeSpec, EnvVar,
    ExposeEndpoint, Exposure, ExposureRoute, ManagedCentral, ManagedResources, ManagedScaling,
    Monitoring, ResourceList, ResourceRequirements, ScannerAnalyzerComponent,
    ScannerAnalyzerScaling, ScannerComponentSpec, ScannerDbComponent,
};
use regex::Regex;

use crate::error::ControllerError;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "rhacs-fleetshard";
pub const MANAGED_SERVICES_ANNOTATION: &str = "platform.stackrox.io/managed-services";

/// Tenant overrides may only touch these keys of the Central sizing
const PATCHABLE_RESOURCES: [&str; 2] = ["cpu", "memory"];

const EGRESS_PROXY_PORT: u16 = 3128;

// Kubernetes resource.Quantity: signed decimal with an optional binary,
// decimal-SI or exponent suffix.
static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[KMGTPE]i|[numkMGTPE]|[eE][+-]?[0-9]+)?$")
        .expect("quantity pattern is valid")
});

pub fn validate_quantity(resource: &str, value: &str) -> Result<(), ControllerError> {
    if QUANTITY.is_match(value) {
        Ok(())
    } else {
        Err(ControllerError::InvalidQuantity {
            resource: resource.to_string(),
            value: value.to_string(),
        })
    }
}

pub fn default_central_resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: BTreeMap::from([
            ("cpu".to_string(), "1".to_string()),
            ("memory".to_string(), "4Gi".to_string()),
        ]),
        limits: BTreeMap::from([
            ("cpu".to_string(), "4".to_string()),
            ("memory".to_string(), "8Gi".to_string()),
        ]),
    }
}

/// Overlay `updates` on `list`, keeping only cpu and memory
pub fn patch_resource_list(
    list: &mut ResourceList,
    updates: &BTreeMap<String, String>,
) -> Result<(), ControllerError> {
    for (resource, value) in updates {
        if !PATCHABLE_RESOURCES.contains(&resource.as_str()) {
            continue;
        }
        validate_quantity(resource, value)?;
        list.insert(resource.clone(), value.clone());
    }
    Ok(())
}

/// Scanner sizing passes through as-is once every quantity parses
pub fn convert_resources(resources: &ManagedResources) -> Result<ResourceRequirements, ControllerError> {
    for (resource, value) in resources.requests.iter().chain(&resources.limits) {
        validate_quantity(resource, value)?;
    }
    Ok(ResourceRequirements {
        requests: resources.requests.clone(),
        limits: resources.limits.clone(),
    })
}

pub fn convert_scaling(scaling: &ManagedScaling) -> ScannerAnalyzerScaling {
    let auto_scaling = match scaling.auto_scaling.to_ascii_lowercase().as_str() {
        "enabled" => Some(AutoScalingPolicy::Enabled),
        "disabled" => Some(AutoScalingPolicy::Disabled),
        _ => None,
    };
    ScannerAnalyzerScaling {
        auto_scaling,
        replicas: Some(scaling.replicas),
        min_replicas: Some(scaling.min_replicas),
        max_replicas: Some(scaling.max_replicas),
    }
}

/// Route all outbound traffic of the tenant through its egress proxy
pub fn proxy_env_vars(namespace: &str) -> Vec<EnvVar> {
    let proxy_url = format!("http://egress-proxy.{namespace}.svc:{EGRESS_PROXY_PORT}");
    let no_proxy = [
        format!("central.{namespace}.svc:443"),
        format!("central.{namespace}:443"),
        "central:443".to_string(),
        format!("scanner-db.{namespace}.svc:5432"),
        format!("scanner.{namespace}.svc:8080"),
        format!("scanner.{namespace}.svc:8443"),
        "kubernetes.default.svc.cluster.local:443".to_string(),
        "kubernetes.default.svc:443".to_string(),
        "kubernetes.default:443".to_string(),
        "kubernetes:443".to_string(),
    ]
    .join(",");

    let mut env = Vec::new();
    for name in ["http_proxy", "HTTP_PROXY", "https_proxy", "HTTPS_PROXY"] {
        env.push(EnvVar {
            name: name.to_string(),
            value: proxy_url.clone(),
        });
    }
    for name in ["no_proxy", "NO_PROXY"] {
        env.push(EnvVar {
            name: name.to_string(),
            value: no_proxy.clone(),
        });
    }
    env
}

/// Central resource the cluster should hold for `desired`
pub fn build_central(desired: &ManagedCentral, use_routes: bool) -> Result<Central, ControllerError> {
    let mut central_resources = default_central_resources();
    patch_resource_list(&mut central_resources.requests, &desired.spec.central.resources.requests)?;
    patch_resource_list(&mut central_resources.limits, &desired.spec.central.resources.limits)?;

    let analyzer = &desired.spec.scanner.analyzer;
    let analyzer_resources = convert_resources(&analyzer.resources)?;
    let db_resources = convert_resources(&desired.spec.scanner.db.resources)?;

    let expose_metrics = Some(Monitoring {
        expose_endpoint: Some(ExposeEndpoint::Enabled),
    });

    let spec = CentralSpec {
        central: Some(CentralComponentSpec {
            exposure: Some(Exposure {
                route: Some(ExposureRoute {
                    enabled: Some(use_routes),
                }),
            }),
            monitoring: expose_metrics.clone(),
            admin_password_generation_disabled: None,
            resources: Some(central_resources),
        }),
        scanner: Some(ScannerComponentSpec {
            analyzer: Some(ScannerAnalyzerComponent {
                resources: Some(analyzer_resources),
                scaling: Some(convert_scaling(&analyzer.scaling)),
            }),
            db: Some(ScannerDbComponent {
                resources: Some(db_resources),
            }),
            monitoring: expose_metrics,
        }),
        customize: Some(CustomizeSpec {
            env_vars: proxy_env_vars(&desired.metadata.namespace),
        }),
    };

    let mut central = Central::new(&desired.metadata.name, spec);
    central.metadata.namespace = Some(desired.metadata.namespace.clone());
    central.metadata.labels = Some(BTreeMap::from([(
        MANAGED_BY_LABEL.to_string(),
        MANAGED_BY_VALUE.to_string(),
    )]));
    central.metadata.annotations = Some(BTreeMap::from([(
        MANAGED_SERVICES_ANNOTATION.to_string(),
        "true".to_string(),
    )]));
    Ok(central)
}

/// Tenant left Central sizing to the autoscaler
pub fn wants_autoscaling(desired: &ManagedCentral) -> bool {
    desired.spec.central.resources.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::managed_central;

    #[test]
    fn test_quantities() {
        for valid in ["1", "250m", "1.5", "4Gi", "512Mi", "1e3", "+2", ".5", "100k"] {
            assert!(validate_quantity("cpu", valid).is_ok(), "{valid} should parse");
        }
        for invalid in ["", "abc", "4GB", "1..2", "Gi", "-", "1 Gi"] {
            assert!(validate_quantity("memory", invalid).is_err(), "{invalid} should not parse");
        }
    }

    #[test]
    fn test_patch_only_touches_cpu_and_memory() {
        let mut list = default_central_resources().limits;
        let updates = BTreeMap::from([
            ("cpu".to_string(), "6".to_string()),
            ("nvidia.com/gpu".to_string(), "1".to_string()),
        ]);

        patch_resource_list(&mut list, &updates).unwrap();

        assert_eq!(list.get("cpu").map(String::as_str), Some("6"));
        assert_eq!(list.get("memory").map(String::as_str), Some("8Gi"));
        assert!(!list.contains_key("nvidia.com/gpu"));
    }

    #[test]
    fn test_patch_rejects_malformed_quantity() {
        let mut list = ResourceList::new();
        let updates = BTreeMap::from([("memory".to_string(), "lots".to_string())]);

        let err = patch_resource_list(&mut list, &updates).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidQuantity { resource, .. } if resource == "memory"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_build_central_defaults() {
        let desired = managed_central("abc");
        let central = build_central(&desired, true).unwrap();

        assert_eq!(central.metadata.name.as_deref(), Some("central-abc"));
        assert_eq!(central.metadata.namespace.as_deref(), Some("rhacs-abc"));
        assert_eq!(
            central.metadata.labels.as_ref().and_then(|l| l.get(MANAGED_BY_LABEL)).map(String::as_str),
            Some(MANAGED_BY_VALUE)
        );
        assert_eq!(
            central
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(MANAGED_SERVICES_ANNOTATION))
                .map(String::as_str),
            Some("true")
        );

        let component = central.spec.central.as_ref().unwrap();
        assert_eq!(component.resources, Some(default_central_resources()));
        assert_eq!(
            component.exposure.as_ref().and_then(|e| e.route.as_ref()).and_then(|r| r.enabled),
            Some(true)
        );
        assert_eq!(component.admin_password_generation_disabled, None);

        let env = &central.spec.customize.as_ref().unwrap().env_vars;
        assert!(env.iter().any(|e| e.name == "HTTPS_PROXY" && e.value == "http://egress-proxy.rhacs-abc.svc:3128"));
        assert!(env.iter().any(|e| e.name == "NO_PROXY" && e.value.contains("central.rhacs-abc.svc:443")));
    }

    #[test]
    fn test_build_central_applies_tenant_sizing() {
        let mut desired = managed_central("abc");
        desired.spec.central.resources.requests.insert("memory".to_string(), "6Gi".to_string());
        desired.spec.scanner.analyzer.scaling = ManagedScaling {
            auto_scaling: "enabled".to_string(),
            replicas: 2,
            min_replicas: 1,
            max_replicas: 3,
        };
        desired.spec.scanner.db.resources.limits.insert("memory".to_string(), "2Gi".to_string());

        let central = build_central(&desired, false).unwrap();

        let resources = central.spec.central.as_ref().and_then(|c| c.resources.clone()).unwrap();
        assert_eq!(resources.requests.get("memory").map(String::as_str), Some("6Gi"));
        assert_eq!(resources.requests.get("cpu").map(String::as_str), Some("1"));

        let scanner = central.spec.scanner.as_ref().unwrap();
        let scaling = scanner.analyzer.as_ref().and_then(|a| a.scaling.clone()).unwrap();
        assert_eq!(scaling.auto_scaling, Some(AutoScalingPolicy::Enabled));
        assert_eq!(scaling.max_replicas, Some(3));
        assert_eq!(
            scanner.db.as_ref().and_then(|d| d.resources.as_ref()).and_then(|r| r.limits.get("memory")).map(String::as_str),
            Some("2Gi")
        );
        assert!(!wants_autoscaling(&desired));
    }

    #[test]
    fn test_build_central_rejects_bad_scanner_quantity() {
        let mut desired = managed_central("abc");
        desired.spec.scanner.analyzer.resources.requests.insert("cpu".to_string(), "fast".to_string());

        assert!(matches!(
            build_central(&desired, false),
            Err(ControllerError::InvalidQuantity { .. })
        ));
    }
}
