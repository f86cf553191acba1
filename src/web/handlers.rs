use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::ai::Summarizer;
use crate::app::{AppState, Banner, Phase, Session, SessionSnapshot};
use crate::constants::{DEFAULT_IMAP_PORT, SESSION_COOKIE};
use crate::credentials::CredentialStore;
use crate::error::DigestError;
use crate::mail::{Credentials, MailConnector};

use super::render;

type Shared<C, S> = State<Arc<AppState<C, S>>>;

/// A [`DigestError`] rendered as a JSON error response.
pub struct WebError(DigestError);

impl From<DigestError> for WebError {
    fn from(error: DigestError) -> Self {
        Self(error)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DigestError::Authentication(_) | DigestError::NotConnected => StatusCode::UNAUTHORIZED,
            DigestError::Connectivity(_) => StatusCode::BAD_GATEWAY,
            DigestError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DigestError::NotFound { .. } => StatusCode::NOT_FOUND,
            DigestError::InvalidTransition { .. } => StatusCode::CONFLICT,
            DigestError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": self.0.title(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// The caller's session, plus the `Set-Cookie` value when it was just created.
async fn load_session<C: MailConnector, S: Summarizer>(
    state: &AppState<C, S>,
    headers: &HeaderMap,
) -> Result<(Arc<Session>, Option<HeaderValue>), WebError> {
    let cookie = session_cookie(headers);
    let (session, created) = state.sessions.get_or_create(cookie.as_deref()).await?;
    if !created {
        return Ok((session, None));
    }

    let value = format!("{}={}; Path=/; HttpOnly; SameSite=Strict", SESSION_COOKIE, session.id);
    let value = HeaderValue::from_str(&value)
        .map_err(|e| DigestError::Config(format!("invalid session cookie: {}", e)))?;
    Ok((session, Some(value)))
}

fn with_cookie(response: impl IntoResponse, cookie: Option<HeaderValue>) -> Response {
    let mut response = response.into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Post/redirect/get back to the dashboard.
fn home(cookie: Option<HeaderValue>) -> Response {
    with_cookie(Redirect::to("/"), cookie)
}

fn connected(session: &Session) -> Result<(Credentials, String), DigestError> {
    let state = session.state();
    let credentials = state.credentials.clone().ok_or(DigestError::NotConnected)?;
    Ok((credentials, state.mailbox.clone()))
}

fn show_error(session: &Session, error: &DigestError) {
    session.state().banner = Some(Banner::from_error(error));
}

async fn run_refresh<C: MailConnector, S: Summarizer>(state: &AppState<C, S>, session: &Session) {
    match state.refresh(session).await {
        Ok(()) => {}
        // Mail errors are already on the banner
        Err(e @ (DigestError::Authentication(_) | DigestError::Connectivity(_))) => {
            tracing::debug!("Refresh aborted: {}", e);
        }
        Err(e) => show_error(session, &e),
    }
}

pub async fn dashboard<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (session, cookie) = load_session(&state, &headers).await?;
    let page = render::dashboard_page(&session.snapshot(), &state.config);
    Ok(with_cookie(Html(page), cookie))
}

#[derive(Debug, Deserialize)]
pub struct ConnectForm {
    pub server: String,
    #[serde(default)]
    pub port: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub mailbox: String,
}

pub async fn connect<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
    Form(form): Form<ConnectForm>,
) -> Result<Response, WebError> {
    let (session, cookie) = load_session(&state, &headers).await?;

    let server = form.server.trim().to_string();
    let username = form.username.trim().to_string();
    if server.is_empty() || username.is_empty() {
        show_error(&session, &DigestError::Config("server and username are required".into()));
        return Ok(home(cookie));
    }

    let port = match form.port.trim() {
        "" => DEFAULT_IMAP_PORT,
        raw => match raw.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                show_error(&session, &DigestError::Config(format!("invalid port '{}'", raw)));
                return Ok(home(cookie));
            }
        },
    };

    let password = if form.password.is_empty() {
        match stored_password(&state, &username).await {
            Some(password) => password,
            None => {
                show_error(
                    &session,
                    &DigestError::Authentication(format!(
                        "no password entered and none stored for {}",
                        username
                    )),
                );
                return Ok(home(cookie));
            }
        }
    } else {
        form.password
    };

    {
        let mut current = session.state();
        if current.phase.is_busy() {
            let busy = DigestError::InvalidTransition {
                from: current.phase,
                to: Phase::Fetching,
            };
            current.banner = Some(Banner::from_error(&busy));
            drop(current);
            return Ok(home(cookie));
        }
        current.credentials = Some(Credentials {
            server,
            port,
            username,
            password,
        });
        let mailbox = form.mailbox.trim();
        if !mailbox.is_empty() {
            current.mailbox = mailbox.to_string();
        }
    }

    run_refresh(&state, &session).await;
    Ok(home(cookie))
}

/// Password from the credential store, keyed by the account address when
/// the login matches the configured account.
async fn stored_password<C: MailConnector, S: Summarizer>(
    state: &AppState<C, S>,
    username: &str,
) -> Option<String> {
    let key = state
        .config
        .account
        .as_ref()
        .filter(|a| a.login() == username)
        .map(|a| a.email.clone())
        .unwrap_or_else(|| username.to_string());

    let lookup = tokio::task::spawn_blocking(move || CredentialStore::new(&key).get_password()).await;
    match lookup {
        Ok(Ok(password)) => Some(password),
        Ok(Err(e)) => {
            tracing::debug!("No stored password: {:#}", e);
            None
        }
        Err(e) => {
            tracing::warn!("Credential lookup task failed: {}", e);
            None
        }
    }
}

pub async fn refresh<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (session, cookie) = load_session(&state, &headers).await?;
    run_refresh(&state, &session).await;
    Ok(home(cookie))
}

pub async fn disconnect<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (session, cookie) = load_session(&state, &headers).await?;
    let result = session.state().disconnect();
    if let Err(e) = result {
        show_error(&session, &e);
    }
    Ok(home(cookie))
}

pub async fn session_json<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (session, cookie) = load_session(&state, &headers).await?;
    let snapshot: SessionSnapshot = session.snapshot();
    Ok(with_cookie(Json(snapshot), cookie))
}

pub async fn mailboxes<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, WebError> {
    let (session, _) = load_session(&state, &headers).await?;
    let (credentials, _) = connected(&session)?;
    Ok(Json(state.list_mailboxes(&credentials).await?))
}

pub async fn attachment<C: MailConnector, S: Summarizer>(
    State(state): Shared<C, S>,
    headers: HeaderMap,
    Path((uid, index)): Path<(u32, usize)>,
) -> Result<Response, WebError> {
    let (session, _) = load_session(&state, &headers).await?;
    let (credentials, mailbox) = connected(&session)?;
    let data = state.fetch_attachment(&credentials, &mailbox, uid, index).await?;

    let filename: String = data
        .filename
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect();
    let headers = [
        (CONTENT_TYPE, data.mime_type),
        (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];
    Ok((headers, data.data).into_response())
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: u64,
}

pub async fn health<C: MailConnector, S: Summarizer>(State(state): Shared<C, S>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.active_sessions(),
    })
}
