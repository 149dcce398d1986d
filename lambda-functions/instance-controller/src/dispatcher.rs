use tracing::{error, info};

use crate::error::DispatchError;
use crate::event::{InstancePayload, PubSubMessage};
use crate::policy::{Action, ActivationPolicy};
use crate::sqladmin::{AdminClientFactory, DatabaseInstancePatch, Operation};

/// Result of a dispatched state change. The operation is not polled, so it
/// says the change was accepted, not that it was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub project: String,
    pub instance: String,
    pub activation_policy: ActivationPolicy,
    pub operation: Operation,
}

/// Turns one inbound message into at most one instance patch.
pub struct InstanceActionDispatcher<F> {
    factory: F,
}

impl<F: AdminClientFactory> InstanceActionDispatcher<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub async fn handle_message(&self, message: &PubSubMessage) -> Result<Dispatched, DispatchError> {
        let bytes = message.payload_bytes().map_err(|e| {
            error!(error = %e, message_id = ?message.message_id, "Failed to decode message data");
            DispatchError::from(e)
        })?;
        self.handle(&bytes).await
    }

    pub async fn handle(&self, bytes: &[u8]) -> Result<Dispatched, DispatchError> {
        let result = self.dispatch(bytes).await;

        match &result {
            Ok(dispatched) => info!(
                project = %dispatched.project,
                instance = %dispatched.instance,
                activation_policy = %dispatched.activation_policy,
                operation = ?dispatched.operation,
                "Instance patch accepted"
            ),
            Err(e) => error!(error = ?e, retryable = e.is_retryable(), "Instance dispatch failed"),
        }

        result
    }

    async fn dispatch(&self, bytes: &[u8]) -> Result<Dispatched, DispatchError> {
        let payload = InstancePayload::from_slice(bytes)?;
        info!(
            instance = %payload.instance,
            project = %payload.project,
            action = %payload.action,
            "Request received for Cloud SQL instance"
        );

        let action: Action = payload.action.parse()?;
        let activation_policy = action.activation_policy();
        let patch = DatabaseInstancePatch::new(activation_policy);

        // Nothing is contacted until the request is known to be valid.
        let client = self.factory.create().await?;
        let operation = client
            .patch_instance(&payload.project, &payload.instance, &patch)
            .await?;

        Ok(Dispatched {
            project: payload.project,
            instance: payload.instance,
            activation_policy,
            operation,
        })
    }
}
