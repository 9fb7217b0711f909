//! Scripted in-memory transport
//!
//! Responses are queued per (method, path). The last queued response for a
//! route is sticky and answers every further request. Unscripted routes get
//! a 404. Every request is recorded for later assertions.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{HttpRequest, HttpResponse, Method, Transport};
use crate::common::{Error, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail,
}

#[derive(Debug, Default)]
struct FakeState {
    routes: HashMap<(Method, String), VecDeque<Scripted>>,
    requests: Vec<HttpRequest>,
}

/// Fake server; clones share the same script and request log
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) -> &Self {
        self.state()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
        self
    }

    /// Queue a JSON response
    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.respond_raw(method, path, status, &body.to_string())
    }

    /// Queue a response with a raw body
    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.push(
            method,
            path,
            Scripted::Respond(HttpResponse {
                status,
                retry_after: None,
                body: body.to_string(),
            }),
        )
    }

    /// Queue a 429 with an optional Retry-After header
    pub fn rate_limit(&self, method: Method, path: &str, retry_after: Option<&str>) -> &Self {
        self.push(
            method,
            path,
            Scripted::Respond(HttpResponse {
                status: 429,
                retry_after: retry_after.map(str::to_string),
                body: json!({"success": false, "message": "Too many requests"}).to_string(),
            }),
        )
    }

    /// Queue a connection failure
    pub fn fail(&self, method: Method, path: &str) -> &Self {
        self.push(method, path, Scripted::Fail)
    }

    /// Drop everything scripted for a route
    pub fn clear(&self, method: Method, path: &str) -> &Self {
        self.state().routes.remove(&(method, path.to_string()));
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    /// Number of requests received for a route
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .count()
    }

    /// Most recent request received for a route
    pub fn last_request(&self, method: Method, path: &str) -> Option<HttpRequest> {
        self.state()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == method && path_of(&r.url) == path)
            .cloned()
    }

    /// A server on which every endpoint succeeds
    ///
    /// Login hands out `access-1`/`refresh-1` for user `user-1`, refresh hands
    /// out `access-2`, the created channel is `channel-1` and the sent
    /// message is `message-1`.
    pub fn healthy_server(username: &str) -> Self {
        let fake = Self::new();
        let ok = |extra: serde_json::Value| {
            let mut body = json!({"success": true});
            if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
                body.extend(extra.clone());
            }
            body
        };

        fake.respond(
            Method::Get,
            "/api/v1/health",
            200,
            json!({"status": "UP", "services": {"db": {"status": "UP"}, "redis": {"status": "UP"}}}),
        );
        fake.respond(
            Method::Post,
            "/api/v1/auth/register",
            200,
            ok(json!({"data": {"id": "user-1", "username": username}})),
        );
        fake.respond(
            Method::Post,
            "/api/v1/auth/login",
            200,
            ok(json!({"data": {
                "accessToken": "access-1",
                "refreshToken": "refresh-1",
                "expiresIn": 3600000,
                "user": {"id": "user-1", "email": format!("{}@example.com", username)}
            }})),
        );
        fake.respond(
            Method::Post,
            "/api/v1/auth/validate",
            200,
            ok(json!({"data": {"userId": "user-1"}})),
        );
        fake.respond(
            Method::Get,
            "/api/v1/auth/me",
            200,
            ok(json!({"data": {"username": username, "email": format!("{}@example.com", username)}})),
        );
        for (method, path, message) in [
            (Method::Post, "/api/v1/auth/ping", "pong"),
            (Method::Put, "/api/v1/auth/profile", "Profile updated"),
            (Method::Post, "/api/v1/notifications/fcm-token", "Token registered"),
            (Method::Put, "/api/v1/notifications/settings", "Settings updated"),
            (Method::Post, "/api/v1/messages/message-1/read", "Marked as read"),
            (Method::Post, "/api/v1/auth/change-password", "Password changed"),
            (Method::Post, "/api/v1/auth/logout", "Logged out"),
        ] {
            fake.respond(method, path, 200, ok(json!({"message": message})));
        }
        fake.respond(
            Method::Get,
            "/api/v1/notifications/fcm-token",
            200,
            ok(json!({"count": 1})),
        );
        fake.respond(
            Method::Get,
            "/api/v1/notifications/settings",
            200,
            ok(json!({"settings": {"enabled": true, "soundEnabled": true}})),
        );
        fake.respond(
            Method::Get,
            "/api/v1/online-status/users",
            200,
            json!({"totalOnlineUsers": 3}),
        );
        fake.respond(
            Method::Get,
            "/api/v1/online-status/stats",
            200,
            json!({"totalOnlineUsers": 3}),
        );
        fake.respond(
            Method::Get,
            "/api/v1/channels",
            200,
            ok(json!({"channels": [{"id": "c-0"}]})),
        );
        fake.respond(
            Method::Post,
            "/api/v1/channels",
            201,
            ok(json!({"channel": {"id": "channel-1", "name": "x"}})),
        );
        fake.respond(
            Method::Get,
            "/api/v1/channels/channel-1",
            200,
            ok(json!({"channel": {"id": "channel-1", "name": "x"}})),
        );
        fake.respond(
            Method::Post,
            "/api/v1/channels/channel-1/messages",
            201,
            ok(json!({"data": {"id": "message-1"}})),
        );
        fake.respond(
            Method::Get,
            "/api/v1/channels/channel-1/messages",
            200,
            json!({"messages": {"content": [{"id": "message-1"}]}}),
        );
        fake.respond(
            Method::Post,
            "/api/v1/auth/refresh",
            200,
            ok(json!({"data": {"accessToken": "access-2"}})),
        );

        fake
    }
}

/// Path part of an absolute URL
fn path_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state();
        state.requests.push(request.clone());

        let path = path_of(&request.url);
        let scripted = match state.routes.get_mut(&(request.method, path.clone())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail) => Err(Error::connection_failed(
                &request.url,
                "connection refused",
            )),
            None => Ok(HttpResponse {
                status: 404,
                retry_after: None,
                body: json!({
                    "success": false,
                    "message": format!("No route for {} {}", request.method, path)
                })
                .to_string(),
            }),
        }
    }
}
