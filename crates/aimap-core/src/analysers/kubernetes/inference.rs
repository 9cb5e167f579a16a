//! Relation inference between parsed resources.

use super::registry::{Labels, ResourceSpec};
use super::{KubeRelation, Resource, ResourceKey};
use crate::graph::entity_graph::RelationKind;

/// True when every selector pair is present in `labels` with an equal value.
///
/// An empty selector matches nothing.
pub fn selector_matches(selector: &Labels, labels: &Labels) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

/// `selects` from services to the workloads they match in the same namespace,
/// and `routes` from ingresses to each backend service, found or not.
pub fn infer_relations(resources: &[Resource]) -> Vec<KubeRelation> {
    let mut relations = Vec::new();

    for resource in resources {
        match &resource.spec {
            ResourceSpec::Service(svc) => {
                for workload in resources {
                    if workload.effective_namespace() != resource.effective_namespace() {
                        continue;
                    }
                    let Some(labels) = workload.spec.template_labels() else {
                        continue;
                    };
                    if selector_matches(&svc.selector, labels) {
                        relations.push(KubeRelation {
                            from: resource.key(),
                            to: workload.key(),
                            kind: RelationKind::Selects,
                        });
                    }
                }
            }
            ResourceSpec::Ingress(ingress) => {
                for path in ingress.rules.iter().flat_map(|r| r.paths.iter()) {
                    relations.push(KubeRelation {
                        from: resource.key(),
                        to: ResourceKey {
                            namespace: resource.effective_namespace().to_string(),
                            kind: "Service".to_string(),
                            name: path.service.clone(),
                        },
                        kind: RelationKind::Routes,
                    });
                }
            }
            _ => {}
        }
    }

    relations
}
