use serde::Deserialize;

use crate::types::{ChatError, ChatMessage, Result, SenderType, Timestamp, UserIdentity};

/// Answer of the token issuance endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub user: UserIdentity,
}

/// One page of room history, as paginated by the chat service.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub sender_type: Option<SenderType>,
}

/// One buyer room in the support directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub buyer_id: Option<i64>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_email: Option<String>,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomDirectory {
    pub rooms: Vec<RoomSummary>,
    #[serde(default)]
    pub total_count: u64,
}

/// Product details shown next to a message that references one.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// REST collaborators of the realtime core: token issuance, room history,
/// read receipts, and the support-side room directory. The core treats them
/// as opaque request/response calls; failures never tear down a live session.
pub struct ChatApi {
    base: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ChatApi {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Attaches the bearer token issued by [`ChatApi::issue_token`]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Requests a chat token for the session-authenticated user
    pub async fn issue_token(&self) -> Result<TokenGrant> {
        self.get_json("/api/chat/token").await
    }

    /// Fetches the (oldest-first) message history of a room
    pub async fn room_messages(&self, room: &str) -> Result<MessagePage> {
        self.get_json(&format!("/api/rooms/{room}/messages/")).await
    }

    /// Joins (or lazily creates) a room before connecting to it
    pub async fn join_room(&self, room: &str) -> Result<()> {
        self.post_empty(&format!("/api/rooms/{room}/join/")).await
    }

    /// Marks all messages in a room as read
    pub async fn mark_read(&self, room: &str) -> Result<()> {
        self.post_empty(&format!("/api/rooms/{room}/mark-read/"))
            .await
    }

    /// Looks up the product a message references
    pub async fn product(&self, product_id: i64) -> Result<ProductSummary> {
        self.get_json(&format!("/api/products/{product_id}/")).await
    }

    /// Lists buyer rooms for the support console, optionally filtered
    pub async fn buyer_rooms(&self, search: Option<&str>) -> Result<RoomDirectory> {
        let mut path = "/api/admin/buyer-rooms/".to_string();
        if let Some(query) = search {
            path.push_str("?search=");
            path.push_str(&urlencode(query));
        }
        self.get_json(&path).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .authorized(self.http.get(format!("{}{path}", self.base)))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChatError::Api(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let response = self
            .authorized(self.http.post(format!("{}{path}", self.base)))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChatError::Api(format!(
                "POST {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
