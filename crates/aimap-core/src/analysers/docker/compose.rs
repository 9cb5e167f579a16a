//! docker-compose decoding over `serde_yaml::Value`, keeping document order.
//!
//! Compose allows several shapes for the same key (string or map ports, list or
//! map environment); each field has a small normaliser instead of a derive.

use serde_yaml::{Mapping, Value};

use super::{BuildConfig, Compose, EnvVar, NamedResource, PortMapping, Service, VolumeMapping};
use crate::error::{AimapError, Result};

pub const COMPOSE_FILES: &[&str] = &["docker-compose.yml", "docker-compose.yaml"];

pub fn parse_compose(path: &str, content: &str) -> Result<Compose> {
    let root: Value = serde_yaml::from_str(content)?;
    let root = root.as_mapping().ok_or_else(|| AimapError::Parse {
        path: path.to_string(),
        message: "top level is not a mapping".to_string(),
    })?;

    let mut compose = Compose {
        version: get_str(root, "version").unwrap_or_default(),
        ..Default::default()
    };

    if let Some(services) = get(root, "services").and_then(Value::as_mapping) {
        for (name, body) in services {
            let Some(name) = scalar(name) else { continue };
            compose.services.push(parse_service(name, body));
        }
    }
    compose.networks = named_resources(get(root, "networks"));
    compose.volumes = named_resources(get(root, "volumes"));

    Ok(compose)
}

fn parse_service(name: String, body: &Value) -> Service {
    let mut service = Service {
        name,
        ..Default::default()
    };
    let Some(map) = body.as_mapping() else {
        return service;
    };

    service.image = get_str(map, "image");
    service.build = get(map, "build").and_then(parse_build);
    service.ports = seq(map, "ports").iter().filter_map(parse_port).collect();
    service.volumes = seq(map, "volumes").iter().filter_map(parse_volume).collect();
    service.environment = parse_environment(get(map, "environment"));
    service.networks = names(get(map, "networks"));
    service.depends_on = names(get(map, "depends_on"));
    service.restart = get_str(map, "restart");
    service.healthcheck = get(map, "healthcheck")
        .and_then(Value::as_mapping)
        .and_then(|h| get(h, "test"))
        .and_then(|test| match test {
            Value::Sequence(items) => Some(
                items
                    .iter()
                    .filter_map(scalar)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            other => scalar(other),
        });
    service.replicas = get(map, "deploy")
        .and_then(Value::as_mapping)
        .and_then(|d| get(d, "replicas"))
        .and_then(Value::as_u64);

    service
}

fn parse_build(value: &Value) -> Option<BuildConfig> {
    match value {
        Value::Mapping(map) => Some(BuildConfig {
            context: get_str(map, "context").unwrap_or_else(|| ".".to_string()),
            dockerfile: get_str(map, "dockerfile"),
            target: get_str(map, "target"),
        }),
        other => scalar(other).map(|context| BuildConfig {
            context,
            ..Default::default()
        }),
    }
}

/// `"[host:]container[/proto]"`, a bare number, or the long map form.
pub fn parse_port(value: &Value) -> Option<PortMapping> {
    if let Value::Mapping(map) = value {
        return Some(PortMapping {
            host: get_str(map, "published"),
            container: get_str(map, "target")?,
            protocol: get_str(map, "protocol"),
        });
    }

    let text = scalar(value)?;
    let (spec, protocol) = match text.split_once('/') {
        Some((spec, proto)) => (spec, Some(proto.to_string())),
        None => (text.as_str(), None),
    };
    let (host, container) = match spec.rsplit_once(':') {
        Some((host, container)) => (Some(host.to_string()), container.to_string()),
        None => (None, spec.to_string()),
    };
    Some(PortMapping {
        host,
        container,
        protocol,
    })
}

/// `"source:target[:mode]"`, a bare target, or the long map form.
pub fn parse_volume(value: &Value) -> Option<VolumeMapping> {
    if let Value::Mapping(map) = value {
        return Some(VolumeMapping {
            source: get_str(map, "source").unwrap_or_default(),
            target: get_str(map, "target")?,
            read_only: get(map, "read_only")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        });
    }

    let text = scalar(value)?;
    let parts: Vec<&str> = text.split(':').collect();
    let mapping = match parts.as_slice() {
        [target] => VolumeMapping {
            source: String::new(),
            target: target.to_string(),
            read_only: false,
        },
        [source, target] => VolumeMapping {
            source: source.to_string(),
            target: target.to_string(),
            read_only: false,
        },
        [source, target, mode, ..] => VolumeMapping {
            source: source.to_string(),
            target: target.to_string(),
            read_only: mode.split(',').any(|m| m == "ro"),
        },
        [] => return None,
    };
    Some(mapping)
}

/// List of `K=V` strings or a map; map values may be any scalar or null.
pub fn parse_environment(value: Option<&Value>) -> Vec<EnvVar> {
    match value {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar)
            .map(|item| match item.split_once('=') {
                Some((k, v)) => EnvVar {
                    key: k.to_string(),
                    value: v.to_string(),
                },
                None => EnvVar {
                    key: item,
                    value: String::new(),
                },
            })
            .collect(),
        Some(Value::Mapping(map)) => map
            .iter()
            .filter_map(|(k, v)| {
                Some(EnvVar {
                    key: scalar(k)?,
                    value: scalar(v).unwrap_or_default(),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Names from a list or from the keys of a map (`networks`, `depends_on`).
fn names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar).collect(),
        Some(Value::Mapping(map)) => map.keys().filter_map(scalar).collect(),
        _ => Vec::new(),
    }
}

fn named_resources(value: Option<&Value>) -> Vec<NamedResource> {
    let Some(map) = value.and_then(Value::as_mapping) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(name, body)| {
            let driver = body.as_mapping().and_then(|b| get_str(b, "driver"));
            Some(NamedResource {
                name: scalar(name)?,
                driver,
            })
        })
        .collect()
}

fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key)
}

fn get_str(map: &Mapping, key: &str) -> Option<String> {
    get(map, key).and_then(scalar)
}

fn seq<'a>(map: &'a Mapping, key: &str) -> &'a [Value] {
    get(map, key)
        .and_then(Value::as_sequence)
        .map(|s| s.as_slice())
        .unwrap_or(&[])
}

/// String form of a scalar; `None` for null, sequences and maps.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMPOSE: &str = r#"
version: "3.8"
services:
  web:
    build:
      context: ./web
      dockerfile: Dockerfile.prod
    ports:
      - "8080:80"
      - 9000
      - target: 443
        published: 8443
        protocol: tcp
    environment:
      - MODE=prod
      - DEBUG
    depends_on:
      - db
    networks:
      - front
  db:
    image: postgres:16
    environment:
      POSTGRES_DB: shop
      RETRIES: 3
    volumes:
      - pgdata:/var/lib/postgresql/data
      - ./init.sql:/docker-entrypoint-initdb.d/init.sql:ro
    depends_on:
      cache:
        condition: service_healthy
    healthcheck:
      test: ["CMD", "pg_isready"]
    deploy:
      replicas: 2
networks:
  front:
    driver: bridge
volumes:
  pgdata:
"#;

    #[test]
    fn services_in_document_order() {
        let compose = parse_compose("docker-compose.yml", COMPOSE).unwrap();
        assert_eq!(compose.version, "3.8");
        let names: Vec<&str> = compose.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "db"]);
        assert_eq!(compose.networks[0].driver.as_deref(), Some("bridge"));
        assert_eq!(compose.volumes[0].name, "pgdata");
    }

    #[test]
    fn port_shapes() {
        let compose = parse_compose("c.yml", COMPOSE).unwrap();
        let ports = &compose.services[0].ports;
        assert_eq!(ports[0].host.as_deref(), Some("8080"));
        assert_eq!(ports[0].container, "80");
        assert_eq!(ports[1].host, None);
        assert_eq!(ports[1].container, "9000");
        assert_eq!(ports[2].host.as_deref(), Some("8443"));
        assert_eq!(ports[2].protocol.as_deref(), Some("tcp"));

        let bound = parse_port(&Value::String("127.0.0.1:5432:5432/udp".into())).unwrap();
        assert_eq!(bound.host.as_deref(), Some("127.0.0.1:5432"));
        assert_eq!(bound.container, "5432");
        assert_eq!(bound.protocol.as_deref(), Some("udp"));
    }

    #[test]
    fn environment_volumes_and_dependencies() {
        let compose = parse_compose("c.yml", COMPOSE).unwrap();
        let web = &compose.services[0];
        assert_eq!(web.environment[1].key, "DEBUG");
        assert_eq!(web.build.as_ref().unwrap().dockerfile.as_deref(), Some("Dockerfile.prod"));

        let db = &compose.services[1];
        assert_eq!(db.environment[1].value, "3");
        assert_eq!(db.volumes[0].source, "pgdata");
        assert!(db.volumes[1].read_only);
        assert_eq!(db.depends_on, vec!["cache".to_string()]);
        assert_eq!(db.healthcheck.as_deref(), Some("CMD pg_isready"));
        assert_eq!(db.replicas, Some(2));
    }

    #[test]
    fn non_mapping_document_is_an_error() {
        assert!(parse_compose("c.yml", "- a\n- b\n").is_err());
    }
}
