//! Gateway to the remote account API.
//!
//! All calls go through one `reqwest::Client` and share two interceptors:
//! outgoing requests carry the stored token as `Authorization: Token <value>`,
//! and any 401 response tears the persisted session down and publishes a
//! [`GatewayEvent::Unauthorized`] for the session manager to act on. Failures
//! are normalized into [`AppError`] before they leave this module.

mod normalize;
pub mod types;

use crate::{
    APP_USER_AGENT,
    config::AppConfig,
    errors::AppError,
    store::TokenStore,
};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info_span, warn};

use self::types::{
    LoginRequest, LoginResponse, RegisterResponse, Registration, User, UsernameAvailability,
};

pub const LOGIN_PATH: &str = "/auth/";
pub const REGISTER_PATH: &str = "/register/";
pub const CURRENT_USER_PATH: &str = "/current-user/";
pub const CHECK_USERNAME_PATH: &str = "/check-username/";

const EVENT_CAPACITY: usize = 16;

/// Signals raised by the response interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The API answered 401 for the token still in the store; that token has
    /// already been cleared.
    Unauthorized,
}

pub struct ApiGateway {
    client: Client,
    config: AppConfig,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<GatewayEvent>,
}

impl ApiGateway {
    /// Builds a gateway that reads and writes the token through `store`.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the HTTP client cannot be initialized.
    pub fn new(config: AppConfig, store: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            config,
            store,
            events,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Subscribes to interceptor events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Exchanges credentials for a token and persists it.
    ///
    /// # Errors
    /// Returns the normalized error for any non-2xx response or transport failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let url = self.config.endpoint(LOGIN_PATH);
        let span = info_span!("api.login", http.method = "POST", url = %url);
        let request = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password });

        let response = self.send(request).instrument(span).await?;
        let body: LoginResponse = decode(response).await?;

        self.store
            .set(&SecretString::from(body.token.clone()), self.config.token_ttl_days)?;
        debug!("login succeeded, token stored");

        Ok(body)
    }

    /// Submits the registration form as multipart and persists the returned
    /// token, if any.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for field-level rejections, or the
    /// normalized error for other failures.
    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse, AppError> {
        let url = self.config.endpoint(REGISTER_PATH);
        let span = info_span!("api.register", http.method = "POST", url = %url);

        let mut form = Form::new()
            .text("first_name", registration.first_name.clone())
            .text("last_name", registration.last_name.clone())
            .text("username", registration.username.clone())
            .text("password", registration.password.clone())
            .text("confirm_password", registration.confirm_password.clone());

        if let Some(avatar) = &registration.avatar {
            let part = Part::bytes(avatar.bytes.clone())
                .file_name(avatar.file_name.clone())
                .mime_str(&avatar.content_type)
                .map_err(|err| AppError::Config(format!("Invalid avatar content type: {err}")))?;
            form = form.part("avatar", part);
        }

        let request = self.client.post(&url).multipart(form);
        let response = self.send(request).instrument(span).await?;
        let body: RegisterResponse = decode(response).await?;

        if let Some(token) = &body.token {
            self.store
                .set(&SecretString::from(token.clone()), self.config.token_ttl_days)?;
            debug!("registration returned a token, token stored");
        }

        Ok(body)
    }

    /// Fetches the identity bound to the stored token.
    ///
    /// # Errors
    /// Returns `AppError::Auth` on 401, or the normalized error otherwise.
    pub async fn fetch_current_user(&self) -> Result<User, AppError> {
        let url = self.config.endpoint(CURRENT_USER_PATH);
        let span = info_span!("api.current_user", http.method = "GET", url = %url);
        let response = self.send(self.client.get(&url)).instrument(span).await?;
        decode(response).await
    }

    /// Asks whether a username is still free. Fails open: any error reports
    /// the name as available so registration is never blocked by this check.
    pub async fn check_username_availability(&self, username: &str) -> bool {
        let url = self.config.endpoint(CHECK_USERNAME_PATH);
        let span = info_span!("api.check_username", http.method = "GET", url = %url);
        let request = self.client.get(&url).query(&[("username", username)]);

        let result = async {
            let response = self.send(request).await?;
            decode::<UsernameAvailability>(response).await
        }
        .instrument(span)
        .await;

        match result {
            Ok(availability) => availability.available,
            Err(err) => {
                warn!("username availability check failed, allowing: {err}");
                true
            }
        }
    }

    /// Clears the stored token, but only while it is still `token`. Returns
    /// whether anything was cleared.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the store cannot be read or cleared.
    pub(crate) fn forget(&self, token: Option<&SecretString>) -> Result<bool, AppError> {
        let current = self.store.get()?;
        let held = current.as_ref().map(|current| current.expose_secret())
            == token.map(|token| token.expose_secret());
        if held {
            self.store.clear()?;
        }
        Ok(held)
    }

    /// Runs both interceptors around a request.
    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let (request, sent) = self.authorize(request)?;
        let response = request.send().await.map_err(|err| {
            debug!("request failed without a response: {err}");
            normalize::connectivity()
        })?;

        let status = response.status();
        debug!("response status: {status}");

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session(sent.as_ref());
        }

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            Err(normalize::from_status(status.as_u16(), &body))
        }
    }

    /// Attaches the stored token and hands back the token that was sent.
    fn authorize(
        &self,
        request: RequestBuilder,
    ) -> Result<(RequestBuilder, Option<SecretString>), AppError> {
        let token = self.store.get()?;
        let request = match &token {
            Some(token) => request.header(AUTHORIZATION, format!("Token {}", token.expose_secret())),
            None => request,
        };
        Ok((request, token))
    }

    fn expire_session(&self, sent: Option<&SecretString>) {
        match self.forget(sent) {
            Ok(true) => {}
            Ok(false) => {
                debug!("401 for a token that has since been replaced, ignoring");
                return;
            }
            Err(err) => warn!("failed to clear expired session: {err}"),
        }
        // No subscriber simply means nothing is rendering the session yet.
        let _ = self.events.send(GatewayEvent::Unauthorized);
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|err| {
        debug!("failed to decode response: {err}");
        normalize::from_status(status, &Value::Null)
    })
}
