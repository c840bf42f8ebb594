//! Embedded resource charts
//!
//! A chart is a default values file plus a set of YAML templates compiled
//! into the binary. Templates are rendered with minijinja against two
//! variables: `release` (`name`, `namespace`) and the coalesced `values`.
//! Undefined variables are errors. After rendering, every object gets the
//! `labels` value merged into its metadata and lands in the release
//! namespace unless it names one itself.

use cluster_client::{ClusterError, UnstructuredObject};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("parsing values of chart {chart}: {source}")]
    Values {
        chart: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("template {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("template {template}: {source}")]
    Yaml {
        template: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("template {template}: {source}")]
    Object {
        template: String,
        #[source]
        source: ClusterError,
    },
}

/// Chart compiled into the binary
#[derive(Debug, Clone, Copy)]
pub struct Chart {
    name: &'static str,
    values: &'static str,
    templates: &'static [(&'static str, &'static str)],
}

/// Auxiliary resources installed into every tenant namespace
pub fn tenant_resources() -> Chart {
    Chart {
        name: "tenant-resources",
        values: include_str!("../charts/tenant-resources/values.yaml"),
        templates: &[
            (
                "egress-proxy.yaml",
                include_str!("../charts/tenant-resources/templates/egress-proxy.yaml"),
            ),
            (
                "network-policy.yaml",
                include_str!("../charts/tenant-resources/templates/network-policy.yaml"),
            ),
        ],
    }
}

impl Chart {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Chart defaults with `overrides` coalesced on top
    pub fn values(&self, overrides: &Value) -> Result<Value, ChartError> {
        let mut values: Value = serde_yaml::from_str(self.values).map_err(|source| ChartError::Values {
            chart: self.name.to_string(),
            source,
        })?;
        if values.is_null() {
            values = Value::Object(serde_json::Map::new());
        }
        coalesce(&mut values, overrides);
        Ok(values)
    }

    fn environment(&self) -> Result<Environment<'static>, ChartError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for &(template, source) in self.templates {
            env.add_template(template, source)
                .map_err(|source| ChartError::Template {
                    template: template.to_string(),
                    source,
                })?;
        }
        Ok(env)
    }

    /// Render every template into concrete objects
    pub fn render(
        &self,
        release_name: &str,
        namespace: &str,
        overrides: &Value,
    ) -> Result<Vec<UnstructuredObject>, ChartError> {
        let values = self.values(overrides)?;
        let labels = values.get("labels").and_then(Value::as_object).cloned().unwrap_or_default();

        let env = self.environment()?;
        let ctx = context! {
            release => context! { name => release_name, namespace => namespace },
            values => values,
        };

        let mut objects = Vec::new();
        for &(template, _) in self.templates {
            let rendered = env
                .get_template(template)
                .and_then(|t| t.render(&ctx))
                .map_err(|source| ChartError::Template {
                    template: template.to_string(),
                    source,
                })?;
            for document in serde_yaml::Deserializer::from_str(&rendered) {
                let manifest = Value::deserialize(document).map_err(|source| ChartError::Yaml {
                    template: template.to_string(),
                    source,
                })?;
                if manifest.is_null() {
                    continue;
                }
                let mut object = UnstructuredObject::from_value(manifest).map_err(|source| {
                    ChartError::Object {
                        template: template.to_string(),
                        source,
                    }
                })?;
                object.default_namespace(namespace);
                for (key, value) in &labels {
                    if let Some(value) = value.as_str() {
                        object.labels_mut().insert(key.clone(), value.to_string());
                    }
                }
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

/// Deep-merge `overrides` into `base`; maps merge key by key, anything else replaces
pub fn coalesce(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(existing) => coalesce(existing, value),
                    None if !value.is_null() => {
                        base.insert(key.clone(), value.clone());
                    }
                    None => {}
                }
            }
        }
        (base, overrides) if !overrides.is_null() => *base = overrides.clone(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_tenant_resources() {
        let objects = tenant_resources()
            .render(
                "tenant-resources",
                "rhacs-abc",
                &json!({"labels": {"app.kubernetes.io/managed-by": "rhacs-fleetshard"}}),
            )
            .unwrap();

        let kinds: Vec<&str> = objects.iter().map(|o| o.gvk().kind.as_str()).collect();
        assert_eq!(kinds, vec!["Deployment", "Service", "NetworkPolicy"]);
        for object in &objects {
            assert_eq!(object.namespace(), Some("rhacs-abc"));
            assert_eq!(
                object.object().metadata.labels.as_ref().and_then(|l| l.get("app.kubernetes.io/managed-by")),
                Some(&"rhacs-fleetshard".to_string())
            );
        }

        let deployment = &objects[0];
        assert_eq!(
            deployment.data().pointer("/spec/template/spec/containers/0/image"),
            Some(&json!("registry.redhat.io/openshift4/ose-egress-http-proxy:v4.14"))
        );
        assert_eq!(deployment.data().pointer("/spec/replicas"), Some(&json!(1)));
        assert_eq!(
            deployment.object().metadata.labels.as_ref().and_then(|l| l.get("app.kubernetes.io/instance")),
            Some(&"tenant-resources".to_string())
        );
    }

    #[test]
    fn test_image_override() {
        let objects = tenant_resources()
            .render(
                "tenant-resources",
                "rhacs-abc",
                &json!({"egressProxy": {"image": "quay.io/example/proxy:1.0"}}),
            )
            .unwrap();

        assert_eq!(
            objects[0].data().pointer("/spec/template/spec/containers/0/image"),
            Some(&json!("quay.io/example/proxy:1.0"))
        );
    }

    #[test]
    fn test_coalesce_merges_nested_maps() {
        let mut base = json!({"labels": {"a": "1"}, "egressProxy": {"image": "x", "replicas": 1}});
        coalesce(
            &mut base,
            &json!({"labels": {"b": "2"}, "egressProxy": {"image": "y"}, "extra": null}),
        );
        assert_eq!(
            base,
            json!({"labels": {"a": "1", "b": "2"}, "egressProxy": {"image": "y", "replicas": 1}})
        );
    }

    #[test]
    fn test_disabled_egress_proxy_renders_nothing() {
        let objects = tenant_resources()
            .render("tenant-resources", "rhacs-abc", &json!({"egressProxy": {"enabled": false}}))
            .unwrap();
        assert!(objects.is_empty());
    }

    #[test]
    fn test_undefined_value_is_an_error() {
        let chart = Chart {
            name: "broken",
            values: "labels: {}",
            templates: &[("broken.yaml", "image: {{ values.nope.image }}")],
        };
        let err = chart.render("r", "ns", &json!({})).unwrap_err();
        assert!(matches!(err, ChartError::Template { template, .. } if template == "broken.yaml"));
    }

    #[test]
    fn test_templates_can_loop_over_values() {
        let chart = Chart {
            name: "configmap",
            values: "data: {}",
            templates: &[(
                "configmap.yaml",
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {{ release.name }}-config\ndata:\n{% for key, value in values.data|items %}\n  {{ key }}: \"{{ value }}\"\n{% endfor %}\n",
            )],
        };
        let objects = chart
            .render("proxy", "rhacs-abc", &json!({"data": {"a": "1", "b": "2"}}))
            .unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name(), Some("proxy-config"));
        assert_eq!(objects[0].namespace(), Some("rhacs-abc"));
        assert_eq!(objects[0].data().pointer("/data"), Some(&json!({"a": "1", "b": "2"})));
    }
}
