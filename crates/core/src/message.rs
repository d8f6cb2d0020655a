//! Chat message input types.
//!
//! A [`Message`] is what the request layer hands over: a role string, the
//! text content, and any attached images. Roles stay as raw strings until
//! segmentation so that an unknown role surfaces as
//! [`Error::InvalidRole`] instead of a deserialization failure.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Case-insensitive: `"User"` and `"USER"` are both [`Role::User`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(Error::InvalidRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message, as received
    pub role: String,

    /// The text content
    #[serde(default)]
    pub content: String,

    /// Raw image payloads, base64-encoded on the wire
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "base64_images")]
    pub images: Vec<Vec<u8>>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System.as_str(), content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User.as_str(), content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant.as_str(), content)
    }

    /// Attach an image payload.
    pub fn with_image(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.images.push(data.into());
        self
    }

    /// Parse the role string.
    pub fn role(&self) -> Result<Role, Error> {
        self.role.parse()
    }
}

mod base64_images {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(images: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(images.len()))?;
        for image in images {
            seq.serialize_element(&STANDARD.encode(image))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| STANDARD.decode(s).map_err(de::Error::custom))
            .collect()
    }
}
