//! The step checklist
//!
//! Each step makes at most one request, judges the response and updates the
//! session. Steps never decide ordering; the `Runner` does.

use colored::Colorize;

use crate::api::protocol::{
    ChangePasswordRequest, ChannelList, ChannelResponse, CreateChannelRequest, CurrentUser,
    Envelope, HealthResponse, LoginData, LoginRequest, MessageList, NotificationSettings,
    OnlineCount, ProfileUpdate, PushTokenList, PushTokenRegistration, RefreshRequest,
    RefreshedToken, RegisterRequest, RegisteredUser, SendMessageRequest, SentMessage,
    SettingsResponse, TokenValidation,
};
use crate::api::{ApiCall, ApiClient, ApiResponse, Method, Transport};
use crate::common::{unix_timestamp, Error, Result};

use super::report::{Report, StepResult};
use super::session::{filled, is_blank, Account, Session};
use super::RunSettings;

/// Every check the harness knows, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    HealthCheck,
    LoginKnownAccount,
    Register,
    LoginNewAccount,
    ValidateToken,
    CurrentUser,
    Ping,
    UpdateProfile,
    RegisterPushToken,
    ListPushTokens,
    GetNotificationSettings,
    UpdateNotificationSettings,
    OnlineUsers,
    OnlineStats,
    ListChannels,
    CreateChannel,
    ChannelDetail,
    SendMessage,
    ListMessages,
    MarkMessageRead,
    ChangePassword,
    Relogin,
    RefreshToken,
    Logout,
}

/// Steps run once an access token is held, in order
pub const AUTHENTICATED_STEPS: [Step; 20] = [
    Step::ValidateToken,
    Step::CurrentUser,
    Step::Ping,
    Step::UpdateProfile,
    Step::RegisterPushToken,
    Step::ListPushTokens,
    Step::GetNotificationSettings,
    Step::UpdateNotificationSettings,
    Step::OnlineUsers,
    Step::OnlineStats,
    Step::ListChannels,
    Step::CreateChannel,
    Step::ChannelDetail,
    Step::SendMessage,
    Step::ListMessages,
    Step::MarkMessageRead,
    Step::ChangePassword,
    Step::Relogin,
    Step::RefreshToken,
    Step::Logout,
];

const LOGIN_PATH: &str = "/api/v1/auth/login";

// Fixed request content
const PROFILE_BIO: &str = "Smoke test user profile.";
const PROFILE_IMAGE_URL: &str = "https://example.com/profile.jpg";
const CHANNEL_TYPE: &str = "GROUP";
const CHANNEL_NAME: &str = "Smoke test group channel";
const CHANNEL_DESCRIPTION: &str = "Channel created by the API smoke test";
const MESSAGE_CONTENT: &str = "Smoke test message content.";
const PAGE_SIZE: u32 = 10;

impl Step {
    /// 1-based position in the full checklist
    pub fn number(&self) -> usize {
        *self as usize + 1
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::HealthCheck => "Health Check",
            Step::LoginKnownAccount => "Auth - Login (existing account)",
            Step::Register => "Auth - Register (new account)",
            Step::LoginNewAccount => "Auth - Login (new account)",
            Step::ValidateToken => "Auth - Validate Token",
            Step::CurrentUser => "Auth - Current User",
            Step::Ping => "Auth - Ping (last seen update)",
            Step::UpdateProfile => "Auth - Update Profile",
            Step::RegisterPushToken => "Notifications - Register FCM Token",
            Step::ListPushTokens => "Notifications - List FCM Tokens",
            Step::GetNotificationSettings => "Notifications - Get Settings",
            Step::UpdateNotificationSettings => "Notifications - Update Settings",
            Step::OnlineUsers => "Online Status - Users",
            Step::OnlineStats => "Online Status - Stats",
            Step::ListChannels => "Channels - List",
            Step::CreateChannel => "Channels - Create",
            Step::ChannelDetail => "Channels - Detail",
            Step::SendMessage => "Messages - Send",
            Step::ListMessages => "Messages - List",
            Step::MarkMessageRead => "Messages - Mark Read",
            Step::ChangePassword => "Auth - Change Password",
            Step::Relogin => "Auth - Login (after password change)",
            Step::RefreshToken => "Auth - Refresh Token",
            Step::Logout => "Auth - Logout",
        }
    }

    /// Soft steps report failure as a warning
    pub fn is_soft(&self) -> bool {
        matches!(self, Step::LoginKnownAccount | Step::Relogin)
    }

    /// Why this step cannot run yet, if it cannot
    pub fn missing_precondition(&self, session: &Session, settings: &RunSettings) -> Option<&'static str> {
        match self {
            Step::LoginKnownAccount if settings.known_account.is_none() => {
                Some("No existing account configured")
            }
            Step::ChannelDetail | Step::SendMessage | Step::ListMessages
                if is_blank(&session.channel_id) =>
            {
                Some("No channel id, skipping")
            }
            Step::MarkMessageRead if is_blank(&session.message_id) => {
                Some("No message id, skipping")
            }
            Step::ChangePassword | Step::Relogin if session.account.is_none() => {
                Some("No account credentials, skipping")
            }
            Step::RefreshToken if is_blank(&session.refresh_token) => {
                Some("No refresh token, skipping")
            }
            _ => None,
        }
    }

    /// Method and path of the step's request
    ///
    /// Only meaningful once `missing_precondition` returned `None`.
    pub fn route(&self, session: &Session) -> (Method, String) {
        let channel = session.channel_id.as_deref().unwrap_or_default();
        let message = session.message_id.as_deref().unwrap_or_default();

        let (method, path) = match self {
            Step::HealthCheck => (Method::Get, "/health".to_string()),
            Step::LoginKnownAccount | Step::LoginNewAccount | Step::Relogin => {
                (Method::Post, "/auth/login".to_string())
            }
            Step::Register => (Method::Post, "/auth/register".to_string()),
            Step::ValidateToken => (Method::Post, "/auth/validate".to_string()),
            Step::CurrentUser => (Method::Get, "/auth/me".to_string()),
            Step::Ping => (Method::Post, "/auth/ping".to_string()),
            Step::UpdateProfile => (Method::Put, "/auth/profile".to_string()),
            Step::RegisterPushToken => (Method::Post, "/notifications/fcm-token".to_string()),
            Step::ListPushTokens => (Method::Get, "/notifications/fcm-token".to_string()),
            Step::GetNotificationSettings => (Method::Get, "/notifications/settings".to_string()),
            Step::UpdateNotificationSettings => {
                (Method::Put, "/notifications/settings".to_string())
            }
            Step::OnlineUsers => (Method::Get, "/online-status/users".to_string()),
            Step::OnlineStats => (Method::Get, "/online-status/stats".to_string()),
            Step::ListChannels => (Method::Get, "/channels".to_string()),
            Step::CreateChannel => (Method::Post, "/channels".to_string()),
            Step::ChannelDetail => (Method::Get, format!("/channels/{}", channel)),
            Step::SendMessage => (Method::Post, format!("/channels/{}/messages", channel)),
            Step::ListMessages => (Method::Get, format!("/channels/{}/messages", channel)),
            Step::MarkMessageRead => (Method::Post, format!("/messages/{}/read", message)),
            Step::ChangePassword => (Method::Post, "/auth/change-password".to_string()),
            Step::RefreshToken => (Method::Post, "/auth/refresh".to_string()),
            Step::Logout => (Method::Post, "/auth/logout".to_string()),
        };
        (method, format!("{}{}", crate::api::API_PREFIX, path))
    }
}

/// Everything a step may touch
pub struct StepContext<'a, T> {
    pub api: &'a ApiClient<T>,
    pub session: &'a mut Session,
    pub settings: &'a RunSettings,
    pub report: &'a mut Report,
}

impl<T: Transport> StepContext<'_, T> {
    /// Send a call with the session's token and book the time spent
    async fn send(&mut self, call: ApiCall) -> Result<ApiResponse> {
        let response = self.api.send(&call, self.session.bearer()).await?;
        if let Some(delay) = response.retried_after {
            self.report.rate_limited(delay);
        }
        self.report.add_request_time(response.elapsed);
        Ok(response)
    }
}

/// Judge a response: expected status, and the success flag when `envelope`
fn verdict(response: &ApiResponse, expected: u16, envelope: bool) -> std::result::Result<(), StepResult> {
    if response.status != expected {
        return Err(StepResult::fail(format!("Status code: {}", response.status)));
    }
    if envelope && !response.success() {
        return Err(StepResult::fail(
            response.message().unwrap_or("Unknown error"),
        ));
    }
    Ok(())
}

/// Payload of a `{success, data}` response that must carry data
fn data<D: serde::de::DeserializeOwned>(response: &ApiResponse) -> Result<D> {
    response
        .parse::<Envelope<D>>()?
        .data
        .ok_or_else(|| Error::unexpected_response(&response.path, "missing data"))
}

/// `message` of the response, or a default
fn message_or(response: &ApiResponse, default: &str) -> String {
    response.message().unwrap_or(default).to_string()
}

macro_rules! judge {
    ($response:expr, $expected:expr, $envelope:expr) => {
        if let Err(failed) = verdict(&$response, $expected, $envelope) {
            return Ok(failed);
        }
    };
}

/// Run one step's request and evaluate it
///
/// Errors are transport failures or malformed payloads; the caller records
/// them as failures of this step.
pub async fn perform<T: Transport>(step: Step, ctx: &mut StepContext<'_, T>) -> Result<StepResult> {
    let (method, path) = step.route(ctx.session);
    let call = ApiCall::new(method, path);

    match step {
        Step::HealthCheck => health_check(ctx, call).await,
        Step::LoginKnownAccount => match ctx.settings.known_account.clone() {
            Some(account) => login(ctx, account, "Logged in with existing account").await,
            None => Ok(StepResult::skip("No existing account configured")),
        },
        Step::Register => register(ctx, call).await,
        Step::LoginNewAccount => {
            let account = ctx.settings.new_account.clone();
            login(ctx, account, "Access token issued").await
        }
        Step::ValidateToken => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let validation: TokenValidation = data(&response)?;
            Ok(StepResult::pass(format!("Valid - User ID: {}", validation.user_id)))
        }
        Step::CurrentUser => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let user: CurrentUser = data(&response)?;
            Ok(StepResult::pass(format!(
                "Username: {}, Email: {}",
                user.username,
                user.email.as_deref().unwrap_or("N/A")
            )))
        }
        Step::Ping => simple(ctx, call, "Ping succeeded").await,
        Step::UpdateProfile => {
            let call = call.json(&ProfileUpdate {
                bio: PROFILE_BIO,
                profile_image_url: PROFILE_IMAGE_URL,
            })?;
            simple(ctx, call, "Profile updated").await
        }
        Step::RegisterPushToken => {
            let call = call.json(&PushTokenRegistration {
                token: format!("test_fcm_token_{}", unix_timestamp()),
                device_type: "IOS",
                device_name: "iPhone 14",
                app_version: "1.0.0",
            })?;
            simple(ctx, call, "FCM token registered").await
        }
        Step::ListPushTokens => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let list: PushTokenList = response.parse()?;
            Ok(StepResult::pass(format!("Registered tokens: {}", list.count)))
        }
        Step::GetNotificationSettings => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let settings: SettingsResponse = response.parse()?;
            let enabled = settings
                .settings
                .and_then(|s| s.enabled)
                .map(|e| e.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            Ok(StepResult::pass(format!("Enabled: {}", enabled)))
        }
        Step::UpdateNotificationSettings => {
            let call = call.json(&NotificationSettings::all_enabled())?;
            simple(ctx, call, "Settings updated").await
        }
        Step::OnlineUsers => {
            let response = ctx.send(call).await?;
            judge!(response, 200, false);
            let online: OnlineCount = response.parse()?;
            Ok(StepResult::pass(format!("Online users: {}", online.total_online_users)))
        }
        Step::OnlineStats => {
            let response = ctx.send(call).await?;
            judge!(response, 200, false);
            let online: OnlineCount = response.parse()?;
            Ok(StepResult::pass(format!(
                "Total online users: {}",
                online.total_online_users
            )))
        }
        Step::ListChannels => {
            let call = call.param("page", 0).param("size", PAGE_SIZE);
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let list: ChannelList = response.parse()?;
            Ok(StepResult::pass(format!("Channels: {}", list.channels.len())))
        }
        Step::CreateChannel => {
            let call = call.json(&CreateChannelRequest {
                channel_type: CHANNEL_TYPE,
                name: CHANNEL_NAME,
                description: CHANNEL_DESCRIPTION,
            })?;
            let response = ctx.send(call).await?;
            judge!(response, 201, true);
            let created: ChannelResponse = response.parse()?;
            ctx.session.channel_id = filled(&created.channel.id);
            Ok(StepResult::pass(format!("Channel ID: {}", created.channel.id)))
        }
        Step::ChannelDetail => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let detail: ChannelResponse = response.parse()?;
            Ok(StepResult::pass(format!(
                "Name: {}",
                detail.channel.name.as_deref().unwrap_or("N/A")
            )))
        }
        Step::SendMessage => {
            let call = call.json(&SendMessageRequest {
                encrypted_content: MESSAGE_CONTENT,
                message_type: "TEXT",
            })?;
            let response = ctx.send(call).await?;
            judge!(response, 201, true);
            let sent: SentMessage = data(&response)?;
            ctx.session.message_id = filled(&sent.id);
            Ok(StepResult::pass(format!("Message ID: {}", sent.id)))
        }
        Step::ListMessages => {
            let call = call.param("page", 0).param("size", PAGE_SIZE);
            let response = ctx.send(call).await?;
            judge!(response, 200, false);
            let list: MessageList = response.parse()?;
            let count = list.messages.map(|page| page.content.len()).unwrap_or(0);
            Ok(StepResult::pass(format!("Messages: {}", count)))
        }
        Step::MarkMessageRead => simple(ctx, call, "Marked as read").await,
        Step::ChangePassword => change_password(ctx, call).await,
        Step::Relogin => match ctx.session.account.clone() {
            Some(account) => login(ctx, account, "Re-login succeeded").await,
            None => Ok(StepResult::skip("No account credentials, skipping")),
        },
        Step::RefreshToken => {
            let Some(refresh_token) = ctx.session.refresh_token.clone().filter(|t| !t.is_empty())
            else {
                return Ok(StepResult::skip("No refresh token, skipping"));
            };
            let call = call.json(&RefreshRequest {
                refresh_token: &refresh_token,
            })?;
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            let refreshed: RefreshedToken = data(&response)?;
            if refreshed.access_token.is_empty() {
                return Ok(StepResult::fail("Response carried an empty access token"));
            }
            ctx.session.access_token = Some(refreshed.access_token);
            Ok(StepResult::pass("New access token issued"))
        }
        Step::Logout => {
            let response = ctx.send(call).await?;
            judge!(response, 200, true);
            ctx.session.logout();
            Ok(StepResult::pass(message_or(&response, "Logged out")))
        }
    }
}

/// Steps that only need the envelope and echo the server's message
async fn simple<T: Transport>(
    ctx: &mut StepContext<'_, T>,
    call: ApiCall,
    default_message: &str,
) -> Result<StepResult> {
    let response = ctx.send(call).await?;
    judge!(response, 200, true);
    Ok(StepResult::pass(message_or(&response, default_message)))
}

async fn health_check<T: Transport>(
    ctx: &mut StepContext<'_, T>,
    call: ApiCall,
) -> Result<StepResult> {
    let response = ctx.send(call).await?;
    judge!(response, 200, false);
    let health: HealthResponse = response.parse()?;

    let mut result = StepResult::pass(format!(
        "Status: {}",
        health.status.as_deref().unwrap_or("UNKNOWN")
    ));
    for (name, service) in &health.services {
        let status = service.status.as_deref().unwrap_or("UNKNOWN");
        let status = if status == "UP" {
            status.green()
        } else {
            status.red()
        };
        result = result.with_detail(format!("{}: {}", name, status));
    }
    Ok(result)
}

async fn register<T: Transport>(
    ctx: &mut StepContext<'_, T>,
    call: ApiCall,
) -> Result<StepResult> {
    let account = &ctx.settings.new_account;
    let call = call.json(&RegisterRequest {
        username: &account.username,
        email: account.email.as_deref().unwrap_or_default(),
        password: &account.password,
    })?;

    let response = ctx.send(call).await?;
    judge!(response, 200, true);
    let user: RegisteredUser = data(&response)?;
    ctx.session.user_id = filled(&user.id);
    Ok(StepResult::pass(format!("User: {}", user.username)))
}

async fn login<T: Transport>(
    ctx: &mut StepContext<'_, T>,
    account: Account,
    success_message: &str,
) -> Result<StepResult> {
    let call = ApiCall::post(LOGIN_PATH).json(&LoginRequest {
        username: &account.username,
        password: &account.password,
    })?;

    let response = ctx.send(call).await?;
    judge!(response, 200, true);
    let issued: LoginData = data(&response)?;
    if issued.access_token.is_empty() {
        return Ok(StepResult::fail("Response carried an empty access token"));
    }

    let mut result = StepResult::pass(format!(
        "{} (User ID: {})",
        success_message, issued.user.id
    ));
    if let Some(expires_in) = issued.expires_in {
        result = result.with_detail(format!("Token expires in: {}ms", expires_in));
    }
    ctx.session.apply_login(account, &issued);
    Ok(result)
}

async fn change_password<T: Transport>(
    ctx: &mut StepContext<'_, T>,
    call: ApiCall,
) -> Result<StepResult> {
    let Some(current) = ctx.session.account.as_ref().map(|a| a.password.clone()) else {
        return Ok(StepResult::skip("No account credentials, skipping"));
    };
    let new_password = ctx.settings.new_password.clone();
    let call = call.json(&ChangePasswordRequest {
        current_password: &current,
        new_password: &new_password,
    })?;

    let response = ctx.send(call).await?;
    judge!(response, 200, true);
    ctx.session.update_password(&new_password);
    Ok(StepResult::pass(message_or(&response, "Password changed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientOptions;
    use crate::runner::report::{Outcome, OutcomeKind};
    use crate::testing::FakeTransport;
    use serde_json::json;
    use std::time::Duration;

    fn settings() -> RunSettings {
        RunSettings {
            known_account: Some(Account::new("gaheemm", "Android@12")),
            new_account: Account::generated(1700000000, "test123456"),
            new_password: "newtest123456".to_string(),
        }
    }

    fn api(fake: &FakeTransport) -> ApiClient<FakeTransport> {
        ApiClient::new(
            fake.clone(),
            ClientOptions {
                base_url: "http://localhost:8080".to_string(),
                bypass_rate_limit: true,
                fallback_retry_after: Duration::from_secs(2),
            },
        )
        .unwrap()
    }

    async fn run(
        step: Step,
        fake: &FakeTransport,
        session: &mut Session,
        report: &mut Report,
    ) -> Result<StepResult> {
        let api = api(fake);
        let settings = settings();
        let mut ctx = StepContext {
            api: &api,
            session,
            settings: &settings,
            report,
        };
        perform(step, &mut ctx).await
    }

    #[test]
    fn test_numbering_and_order() {
        assert_eq!(Step::HealthCheck.number(), 1);
        assert_eq!(Step::ValidateToken.number(), 5);
        assert_eq!(Step::Logout.number(), 24);
        assert_eq!(AUTHENTICATED_STEPS.first(), Some(&Step::ValidateToken));
        assert_eq!(AUTHENTICATED_STEPS.last(), Some(&Step::Logout));
        for pair in AUTHENTICATED_STEPS.windows(2) {
            assert!(pair[0].number() < pair[1].number());
        }
    }

    #[test]
    fn test_routes() {
        let mut session = Session::default();
        assert_eq!(
            Step::HealthCheck.route(&session),
            (Method::Get, "/api/v1/health".to_string())
        );
        session.channel_id = Some("c9".to_string());
        session.message_id = Some("m3".to_string());
        assert_eq!(
            Step::SendMessage.route(&session),
            (Method::Post, "/api/v1/channels/c9/messages".to_string())
        );
        assert_eq!(
            Step::MarkMessageRead.route(&session),
            (Method::Post, "/api/v1/messages/m3/read".to_string())
        );
    }

    #[test]
    fn test_id_dependent_steps_need_ids() {
        let session = Session::default();
        let settings = settings();
        for step in [Step::ChannelDetail, Step::SendMessage, Step::ListMessages] {
            assert_eq!(
                step.missing_precondition(&session, &settings),
                Some("No channel id, skipping")
            );
        }
        assert!(Step::MarkMessageRead
            .missing_precondition(&session, &settings)
            .is_some());
        assert!(Step::RefreshToken
            .missing_precondition(&session, &settings)
            .is_some());
        assert!(Step::Ping.missing_precondition(&session, &settings).is_none());
    }

    #[tokio::test]
    async fn test_login_known_account_populates_session() {
        let fake = FakeTransport::healthy_server("gaheemm");
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::LoginKnownAccount, &fake, &mut session, &mut report)
            .await
            .unwrap();

        assert_eq!(result.outcome.kind(), OutcomeKind::Passed);
        assert_eq!(session.access_token.as_deref(), Some("access-1"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(session.user_id.as_deref(), Some("user-1"));
        assert_eq!(session.account.as_ref().unwrap().username, "gaheemm");

        let sent = fake.last_request(Method::Post, "/api/v1/auth/login").unwrap();
        assert_eq!(
            sent.body,
            Some(json!({"username": "gaheemm", "password": "Android@12"}))
        );
        assert_eq!(sent.header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_status_mismatch_fails_with_code() {
        let fake = FakeTransport::new();
        fake.respond(Method::Get, "/api/v1/auth/me", 401, json!({"success": false}));
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::CurrentUser, &fake, &mut session, &mut report)
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Failed("Status code: 401".to_string()));
    }

    #[tokio::test]
    async fn test_success_false_fails_with_server_message() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::Post,
            "/api/v1/auth/ping",
            200,
            json!({"success": false, "message": "Session expired"}),
        );
        fake.respond(Method::Put, "/api/v1/auth/profile", 200, json!({}));
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::Ping, &fake, &mut session, &mut report).await.unwrap();
        assert_eq!(result.outcome, Outcome::Failed("Session expired".to_string()));

        let result = run(Step::UpdateProfile, &fake, &mut session, &mut report)
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Failed("Unknown error".to_string()));
    }

    #[tokio::test]
    async fn test_create_channel_sets_channel_id() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::Post,
            "/api/v1/channels",
            201,
            json!({"success": true, "channel": {"id": 77, "name": "x"}}),
        );
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::CreateChannel, &fake, &mut session, &mut report)
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Passed("Channel ID: 77".to_string()));
        assert_eq!(session.channel_id.as_deref(), Some("77"));
        let sent = fake.last_request(Method::Post, "/api/v1/channels").unwrap();
        assert_eq!(sent.body.unwrap()["type"], "GROUP");
    }

    #[tokio::test]
    async fn test_create_channel_expects_201() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::Post,
            "/api/v1/channels",
            200,
            json!({"success": true, "channel": {"id": "c"}}),
        );
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::CreateChannel, &fake, &mut session, &mut report)
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Failed("Status code: 200".to_string()));
        assert!(session.channel_id.is_none());
    }

    #[tokio::test]
    async fn test_status_only_steps_ignore_success_flag() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::Get,
            "/api/v1/online-status/users",
            200,
            json!({"totalOnlineUsers": 12}),
        );
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::OnlineUsers, &fake, &mut session, &mut report)
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Passed("Online users: 12".to_string()));
    }

    #[tokio::test]
    async fn test_list_channels_sends_paging() {
        let fake = FakeTransport::healthy_server("u");
        let mut session = Session::default();
        let mut report = Report::quiet();

        run(Step::ListChannels, &fake, &mut session, &mut report)
            .await
            .unwrap();

        let sent = fake.last_request(Method::Get, "/api/v1/channels").unwrap();
        assert_eq!(
            sent.query,
            vec![
                ("page".to_string(), "0".to_string()),
                ("size".to_string(), "10".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, "/api/v1/auth/validate", 200, json!({"success": true}));
        let mut session = Session::default();
        let mut report = Report::quiet();

        let err = run(Step::ValidateToken, &fake, &mut session, &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_change_password_then_relogin_uses_new_password() {
        let fake = FakeTransport::healthy_server("gaheemm");
        let mut session = Session::default();
        let mut report = Report::quiet();

        run(Step::LoginKnownAccount, &fake, &mut session, &mut report)
            .await
            .unwrap();
        let result = run(Step::ChangePassword, &fake, &mut session, &mut report)
            .await
            .unwrap();
        assert_eq!(result.outcome.kind(), OutcomeKind::Passed);

        let sent = fake
            .last_request(Method::Post, "/api/v1/auth/change-password")
            .unwrap();
        assert_eq!(
            sent.body,
            Some(json!({"currentPassword": "Android@12", "newPassword": "newtest123456"}))
        );

        run(Step::Relogin, &fake, &mut session, &mut report)
            .await
            .unwrap();
        let sent = fake.last_request(Method::Post, "/api/v1/auth/login").unwrap();
        assert_eq!(sent.body.unwrap()["password"], "newtest123456");
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token() {
        let fake = FakeTransport::healthy_server("u");
        let mut session = Session::default();
        session.access_token = Some("access-1".to_string());
        session.refresh_token = Some("refresh-1".to_string());
        let mut report = Report::quiet();

        run(Step::RefreshToken, &fake, &mut session, &mut report)
            .await
            .unwrap();

        assert_eq!(session.access_token.as_deref(), Some("access-2"));
        let sent = fake.last_request(Method::Post, "/api/v1/auth/refresh").unwrap();
        assert_eq!(sent.body, Some(json!({"refreshToken": "refresh-1"})));
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let fake = FakeTransport::healthy_server("u");
        let mut session = Session::default();
        session.access_token = Some("access-1".to_string());
        let mut report = Report::quiet();

        let result = run(Step::Logout, &fake, &mut session, &mut report)
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Passed("Logged out".to_string()));
        assert!(!session.is_authenticated());
        let sent = fake.last_request(Method::Post, "/api/v1/auth/logout").unwrap();
        assert_eq!(sent.header("Authorization"), Some("Bearer access-1"));
    }

    #[tokio::test]
    async fn test_health_lists_services() {
        let fake = FakeTransport::healthy_server("u");
        let mut session = Session::default();
        let mut report = Report::quiet();

        let result = run(Step::HealthCheck, &fake, &mut session, &mut report)
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Passed("Status: UP".to_string()));
        assert_eq!(result.details.len(), 2);
        assert!(result.details[0].starts_with("db: "));
    }
}
