//! Starts and stops Cloud SQL instances in response to Pub/Sub messages.
//!
//! A message carries `{"Instance": .., "Project": .., "Action": "start" | "stop"}`.
//! The action is mapped to an activation policy and submitted as a single
//! instance patch; the returned operation is logged but never polled.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod policy;
pub mod sqladmin;

use bon::Builder;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use config::Config;
pub use dispatcher::{Dispatched, InstanceActionDispatcher};
pub use error::{AdminError, DecodeError, DispatchError};
pub use event::{InstancePayload, PubSubMessage};
pub use policy::{Action, ActivationPolicy};
pub use sqladmin::{
    AdminClientFactory, DatabaseInstancePatch, InstanceAdmin, Operation, SqlAdminClient,
    SqlAdminClientFactory,
};

/// Function response returned to the runtime.
#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    #[builder(default = "accepted".to_string(), into)]
    pub status: String,
    #[builder(into)]
    pub project: String,
    #[builder(into)]
    pub instance: String,
    pub activation_policy: ActivationPolicy,
    pub operation: Option<String>,
    #[builder(default = Utc::now().to_rfc3339(), into)]
    pub timestamp: String,
}

impl From<Dispatched> for Response {
    fn from(dispatched: Dispatched) -> Self {
        Response::builder()
            .project(dispatched.project)
            .instance(dispatched.instance)
            .activation_policy(dispatched.activation_policy)
            .maybe_operation(dispatched.operation.name)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_dispatched() {
        let dispatched = Dispatched {
            project: "proj1".to_string(),
            instance: "db1".to_string(),
            activation_policy: ActivationPolicy::Always,
            operation: Operation {
                name: Some("op-1".to_string()),
                ..Default::default()
            },
        };

        let response = Response::from(dispatched);
        assert_eq!(response.status, "accepted");
        assert_eq!(response.project, "proj1");
        assert_eq!(response.instance, "db1");
        assert_eq!(response.operation.as_deref(), Some("op-1"));
        assert!(chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
    }

    #[test]
    fn test_response_serialization() {
        let response = Response::builder()
            .project("proj1")
            .instance("db1")
            .activation_policy(ActivationPolicy::Never)
            .timestamp("2025-01-06T12:00:00Z")
            .build();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["activation_policy"], "NEVER");
        assert_eq!(json["operation"], serde_json::Value::Null);
        assert_eq!(json["timestamp"], "2025-01-06T12:00:00Z");
    }
}
