use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose, Engine};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

/// Envelope of a Pub/Sub message as delivered to the function.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    /// Base64 encoded message body.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub message_id: Option<String>,
    pub publish_time: Option<String>,
}

impl PubSubMessage {
    /// Wraps raw payload bytes the way a publisher would.
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            data: general_purpose::STANDARD.encode(payload),
            ..Default::default()
        }
    }

    pub fn payload_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(general_purpose::STANDARD.decode(self.data.trim())?)
    }
}

/// Request to switch a database instance on or off.
///
/// `action` is left as the raw string; it is checked against the closed
/// vocabulary in [`crate::Action`].
///
/// Keys match case-insensitively and the last occurrence of a key wins. A
/// `null` value leaves the field as it was.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstancePayload {
    #[serde(rename = "Instance")]
    pub instance: String,
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Action")]
    pub action: String,
}

impl<'de> Deserialize<'de> for InstancePayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = InstancePayload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with Instance, Project and Action")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut instance = None;
        let mut project = None;
        let mut action = None;

        while let Some(key) = map.next_key::<String>()? {
            let slot = if key.eq_ignore_ascii_case("instance") {
                &mut instance
            } else if key.eq_ignore_ascii_case("project") {
                &mut project
            } else if key.eq_ignore_ascii_case("action") {
                &mut action
            } else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };

            if let Some(value) = map.next_value::<Option<String>>()? {
                *slot = Some(value);
            }
        }

        Ok(InstancePayload {
            instance: instance.ok_or_else(|| <A::Error as de::Error>::missing_field("Instance"))?,
            project: project.ok_or_else(|| <A::Error as de::Error>::missing_field("Project"))?,
            action: action.ok_or_else(|| <A::Error as de::Error>::missing_field("Action"))?,
        })
    }
}

impl InstancePayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let payload: Self = serde_json::from_slice(bytes)?;

        check_identifier("Instance", &payload.instance)?;
        check_identifier("Project", &payload.project)?;

        Ok(payload)
    }
}

/// Identifiers become URL path segments, so they must name exactly one
/// segment.
fn check_identifier(field: &'static str, value: &str) -> Result<(), DecodeError> {
    match value {
        "" => Err(DecodeError::EmptyField(field)),
        "." | ".." => Err(DecodeError::ReservedIdentifier {
            field,
            value: value.to_string(),
        }),
        _ => Ok(()),
    }
}
