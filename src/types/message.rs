use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::{ChatError, Result};
use super::identity::UserRole;

/// Message timestamp as sent by the chat service: either an ISO-8601 string
/// or a Unix epoch number, in seconds or milliseconds. Epoch forms are
/// distinguished by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    fn from_epoch(n: i64) -> Option<Self> {
        // 12+ digits can only be milliseconds (seconds would be year ~33658)
        let millis = n.unsigned_abs().to_string().len() >= 12;
        let dt = if millis {
            DateTime::from_timestamp_millis(n)?
        } else {
            DateTime::from_timestamp(n, 0)?
        };
        Some(Self(dt))
    }

    fn parse_str(s: &str) -> Option<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return Self::from_epoch(s.parse().ok()?);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        // Django's isoformat() omits the offset for naive datetimes
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) => {
                Self::parse_str(s).ok_or_else(|| D::Error::custom(format!("bad timestamp: {s}")))
            }
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(Self::from_epoch)
                .ok_or_else(|| D::Error::custom(format!("bad epoch timestamp: {n}"))),
            other => Err(D::Error::custom(format!(
                "timestamp must be string or number, got {other}"
            ))),
        }
    }
}

/// Who authored a message, as classified by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Buyer,
    Admin,
}

impl From<UserRole> for SenderType {
    fn from(role: UserRole) -> Self {
        if role.is_support() {
            SenderType::Admin
        } else {
            SenderType::Buyer
        }
    }
}

/// A chat message as broadcast by the server to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<SenderType>,
    pub user_id: i64,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// Frames the client sends over the live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ChatMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_id: Option<i64>,
    },
    TypingIndicator {
        is_typing: bool,
        user_name: String,
    },
    Heartbeat,
}

/// Frames the server sends over the live connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConnectionEstablished {
        #[serde(default)]
        message: Option<String>,
    },
    ChatMessage(ChatMessage),
    // Older service builds broadcast typing under "typing_status"
    #[serde(alias = "typing_status")]
    TypingIndicator {
        user_name: String,
        is_typing: bool,
    },
    HeartbeatAck,
    Error {
        message: String,
    },
}

impl ServerFrame {
    /// Parses one inbound text frame. Failures are reported as
    /// [`ChatError::MalformedPayload`] so the caller can drop the single
    /// frame without tearing down the session.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ChatError::MalformedPayload(e.to_string()))
    }
}
