//! Kind registry: maps a manifest `kind` to the decoder for its `spec`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::Result;

pub type Labels = BTreeMap<String, String>;

/// Kind-specific part of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    Deployment(WorkloadSpec),
    StatefulSet(WorkloadSpec),
    Service(ServiceSpec),
    Ingress(IngressSpec),
    Namespace,
    Other,
}

impl ResourceSpec {
    /// Labels a selector is matched against, for workload kinds.
    pub fn template_labels(&self) -> Option<&Labels> {
        match self {
            Self::Deployment(w) | Self::StatefulSet(w) => Some(&w.template_labels),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub replicas: Option<u64>,
    pub selector: Labels,
    pub template_labels: Labels,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub service_type: Option<String>,
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: Option<String>,
    pub port: String,
    pub target_port: Option<String>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressSpec {
    pub rules: Vec<IngressRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    pub host: Option<String>,
    pub paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressPath {
    pub path: String,
    pub service: String,
    pub port: Option<String>,
}

// Wire shapes, decoded with serde and then flattened into the types above.

/// Integer or string (`targetPort: 8080` vs `targetPort: http`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    fn into_string(self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawWorkload {
    replicas: Option<u64>,
    selector: RawSelector,
    template: RawTemplate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSelector {
    match_labels: Labels,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTemplate {
    metadata: RawTemplateMeta,
    spec: RawPodSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTemplateMeta {
    labels: Labels,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPodSpec {
    containers: Vec<RawContainer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContainer {
    name: String,
    image: String,
    ports: Vec<RawContainerPort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContainerPort {
    container_port: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawService {
    #[serde(rename = "type")]
    service_type: Option<String>,
    selector: Labels,
    ports: Vec<RawServicePort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServicePort {
    name: Option<String>,
    port: IntOrString,
    target_port: Option<IntOrString>,
    protocol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIngress {
    rules: Vec<RawIngressRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIngressRule {
    host: Option<String>,
    http: Option<RawHttp>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHttp {
    paths: Vec<RawHttpPath>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawHttpPath {
    path: String,
    backend: RawBackend,
}

/// networking/v1 `service: {name, port}` or the older `serviceName/servicePort`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBackend {
    service: Option<RawBackendService>,
    service_name: Option<String>,
    service_port: Option<IntOrString>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBackendService {
    name: String,
    port: RawBackendPort,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBackendPort {
    number: Option<u64>,
    name: Option<String>,
}

fn decode<T: for<'de> Deserialize<'de> + Default>(spec: &Value) -> Result<T> {
    if spec.is_null() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_value(spec.clone())?)
}

fn decode_workload(spec: &Value) -> Result<WorkloadSpec> {
    let raw: RawWorkload = decode(spec)?;
    Ok(WorkloadSpec {
        replicas: raw.replicas,
        selector: raw.selector.match_labels,
        template_labels: raw.template.metadata.labels,
        containers: raw
            .template
            .spec
            .containers
            .into_iter()
            .map(|c| ContainerSpec {
                name: c.name,
                image: c.image,
                ports: c.ports.into_iter().map(|p| p.container_port).collect(),
            })
            .collect(),
    })
}

fn decode_deployment(spec: &Value) -> Result<ResourceSpec> {
    decode_workload(spec).map(ResourceSpec::Deployment)
}

fn decode_stateful_set(spec: &Value) -> Result<ResourceSpec> {
    decode_workload(spec).map(ResourceSpec::StatefulSet)
}

fn decode_service(spec: &Value) -> Result<ResourceSpec> {
    let raw: RawService = decode(spec)?;
    Ok(ResourceSpec::Service(ServiceSpec {
        service_type: raw.service_type,
        selector: raw.selector,
        ports: raw
            .ports
            .into_iter()
            .map(|p| ServicePort {
                name: p.name,
                port: p.port.into_string(),
                target_port: p.target_port.map(IntOrString::into_string),
                protocol: p.protocol,
            })
            .collect(),
    }))
}

fn decode_ingress(spec: &Value) -> Result<ResourceSpec> {
    let raw: RawIngress = decode(spec)?;
    let rules = raw
        .rules
        .into_iter()
        .map(|rule| IngressRule {
            host: rule.host,
            paths: rule
                .http
                .map(|http| http.paths)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| {
                    let backend = p.backend;
                    let (service, port) = match backend.service {
                        Some(svc) => {
                            let port = svc
                                .port
                                .number
                                .map(|n| n.to_string())
                                .or(svc.port.name);
                            (svc.name, port)
                        }
                        None => (
                            backend.service_name?,
                            backend.service_port.map(IntOrString::into_string),
                        ),
                    };
                    Some(IngressPath {
                        path: p.path,
                        service,
                        port,
                    })
                })
                .collect(),
        })
        .collect();
    Ok(ResourceSpec::Ingress(IngressSpec { rules }))
}

type Decoder = fn(&Value) -> Result<ResourceSpec>;

/// Decoders keyed by `kind`. Kinds without a decoder become [`ResourceSpec::Other`].
pub struct KindRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl KindRegistry {
    /// Registry with the built-in workload, service, ingress and namespace kinds.
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };
        registry.register("Deployment", decode_deployment);
        registry.register("StatefulSet", decode_stateful_set);
        registry.register("Service", decode_service);
        registry.register("Ingress", decode_ingress);
        registry.register("Namespace", |_| Ok(ResourceSpec::Namespace));
        registry
    }

    pub fn register(&mut self, kind: &'static str, decoder: Decoder) {
        self.decoders.insert(kind, decoder);
    }

    pub fn is_known(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Decode `spec` for `kind`; `spec` may be null.
    pub fn decode(&self, kind: &str, spec: &Value) -> Result<ResourceSpec> {
        match self.decoders.get(kind) {
            Some(decoder) => decoder(spec),
            None => Ok(ResourceSpec::Other),
        }
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn deployment_template_labels_and_containers() {
        let registry = KindRegistry::new();
        let decoded = registry
            .decode(
                "Deployment",
                &spec(
                    "replicas: 3\nselector:\n  matchLabels: {app: web}\ntemplate:\n  metadata:\n    labels: {app: web, tier: front}\n  spec:\n    containers:\n      - name: web\n        image: nginx:1.27\n        ports: [{containerPort: 80}]\n",
                ),
            )
            .unwrap();
        let ResourceSpec::Deployment(w) = decoded else {
            panic!("expected a deployment");
        };
        assert_eq!(w.replicas, Some(3));
        assert_eq!(w.template_labels.get("tier").map(String::as_str), Some("front"));
        assert_eq!(w.containers[0].ports, vec![80]);
    }

    #[test]
    fn service_ports_int_or_string() {
        let decoded = KindRegistry::new()
            .decode(
                "Service",
                &spec("type: ClusterIP\nselector: {app: web}\nports:\n  - port: 80\n    targetPort: http\n"),
            )
            .unwrap();
        let ResourceSpec::Service(s) = decoded else {
            panic!("expected a service");
        };
        assert_eq!(s.ports[0].port, "80");
        assert_eq!(s.ports[0].target_port.as_deref(), Some("http"));
    }

    #[test]
    fn ingress_both_backend_shapes() {
        let decoded = KindRegistry::new()
            .decode(
                "Ingress",
                &spec(
                    "rules:\n  - host: shop.local\n    http:\n      paths:\n        - path: /\n          backend:\n            service: {name: web, port: {number: 80}}\n        - path: /old\n          backend: {serviceName: legacy, servicePort: 8080}\n",
                ),
            )
            .unwrap();
        let ResourceSpec::Ingress(ing) = decoded else {
            panic!("expected an ingress");
        };
        let backends: Vec<(&str, Option<&str>)> = ing.rules[0]
            .paths
            .iter()
            .map(|p| (p.service.as_str(), p.port.as_deref()))
            .collect();
        assert_eq!(backends, vec![("web", Some("80")), ("legacy", Some("8080"))]);
    }

    #[test]
    fn unknown_kind_and_null_spec() {
        let registry = KindRegistry::new();
        assert_eq!(registry.decode("ConfigMap", &Value::Null).unwrap(), ResourceSpec::Other);
        assert!(!registry.is_known("ConfigMap"));
        assert_eq!(
            registry.decode("Service", &Value::Null).unwrap(),
            ResourceSpec::Service(ServiceSpec::default())
        );
    }

    #[test]
    fn malformed_spec_is_an_error() {
        assert!(KindRegistry::new()
            .decode("Deployment", &spec("replicas: lots\n"))
            .is_err());
    }
}
