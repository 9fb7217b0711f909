//! Cupid API payload types
//!
//! Request bodies are serialized in the server's camelCase. Response types
//! only name the fields the harness reads; everything else is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Standard `{success, message, data}` response wrapper
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Accept ids sent either as JSON strings or numbers
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

// === Requests ===

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate<'a> {
    pub bio: &'a str,
    pub profile_image_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRegistration {
    pub token: String,
    pub device_type: &'static str,
    pub device_name: &'static str,
    pub app_version: &'static str,
}

/// Notification preferences, used both as request body and response payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub sound_enabled: Option<bool>,
    #[serde(default)]
    pub vibration_enabled: Option<bool>,
    #[serde(default)]
    pub show_preview: Option<bool>,
}

impl NotificationSettings {
    pub fn all_enabled() -> Self {
        Self {
            enabled: Some(true),
            sound_enabled: Some(true),
            vibration_enabled: Some(true),
            show_preview: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChannelRequest<'a> {
    #[serde(rename = "type")]
    pub channel_type: &'a str,
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub encrypted_content: &'a str,
    pub message_type: &'a str,
}

// === Responses ===

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceHealth>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredUser {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: LoginUser,
}

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidation {
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedToken {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PushTokenList {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SettingsResponse {
    #[serde(default)]
    pub settings: Option<NotificationSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineCount {
    #[serde(default)]
    pub total_online_users: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub channels: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelResponse {
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub messages: Option<MessagePage>,
}

#[derive(Debug, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}
