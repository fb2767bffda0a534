//! API resources that have no typed bindings

use kube::discovery::ApiResource;

/// K8up backup `Schedule`
pub fn schedule() -> ApiResource {
    ApiResource {
        group: "k8up.io".to_string(),
        version: "v1".to_string(),
        api_version: "k8up.io/v1".to_string(),
        kind: "Schedule".to_string(),
        plural: "schedules".to_string(),
    }
}

/// K8up `Backup` run
pub fn backup() -> ApiResource {
    ApiResource {
        group: "k8up.io".to_string(),
        version: "v1".to_string(),
        api_version: "k8up.io/v1".to_string(),
        kind: "Backup".to_string(),
        plural: "backups".to_string(),
    }
}

/// metrics-server `NodeMetrics`
pub fn node_metrics() -> ApiResource {
    ApiResource {
        group: "metrics.k8s.io".to_string(),
        version: "v1beta1".to_string(),
        api_version: "metrics.k8s.io/v1beta1".to_string(),
        kind: "NodeMetrics".to_string(),
        plural: "nodes".to_string(),
    }
}
