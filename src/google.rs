//! Google Calendar destination and single-account OAuth.

use anyhow::{Context, Result};
use google_calendar::Client;
use google_calendar::types::{EventDateTime, SendUpdates};
use icsmirror_core::{DestinationService, EventPayload, RemoteError};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

use crate::config::{self, AccountTokens, GoogleConfig};

const REDIRECT_PORT: u16 = 8085;
const REDIRECT_URI: &str = "http://localhost:8085/callback";

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

/// Refresh this long before the token actually expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// Inserts mirrored events through the Google Calendar API.
pub struct GoogleCalendar {
    client: Client,
}

impl GoogleCalendar {
    /// Build a client from stored tokens, refreshing them first if they are about to expire.
    pub async fn connect(google: &GoogleConfig) -> Result<Self> {
        let mut tokens = config::read_tokens()?.ok_or_else(|| {
            anyhow::anyhow!("Not authenticated with Google.\nRun `icsmirror auth` first.")
        })?;

        if tokens_need_refresh(&tokens) {
            log::info!("Google access token expired, refreshing");
            tokens = refreshed_tokens(google, &tokens).await?;
            config::write_tokens(&tokens)?;
        }

        Ok(GoogleCalendar {
            client: client_for(google, &tokens),
        })
    }
}

impl DestinationService for GoogleCalendar {
    async fn insert(&self, calendar_id: &str, payload: &EventPayload) -> Result<String, RemoteError> {
        let google_event = to_google_event(payload);

        let response = self
            .client
            .events()
            .insert(
                calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &google_event,
            )
            .await
            .map_err(|e| RemoteError::new(e.to_string()))?;

        Ok(response.body.id)
    }
}

fn to_google_event(payload: &EventPayload) -> google_calendar::types::Event {
    google_calendar::types::Event {
        summary: payload.summary.clone(),
        description: payload.description.clone(),
        start: Some(EventDateTime {
            date: None,
            date_time: Some(payload.start),
            time_zone: payload.time_zone.clone(),
        }),
        end: Some(EventDateTime {
            date: None,
            date_time: Some(payload.end),
            time_zone: payload.time_zone.clone(),
        }),
        color_id: payload
            .category
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn client_for(google: &GoogleConfig, tokens: &AccountTokens) -> Client {
    Client::new(
        google.client_id.clone(),
        google.client_secret.clone(),
        REDIRECT_URI.to_string(),
        tokens.access_token.clone(),
        tokens.refresh_token.clone(),
    )
}

fn tokens_need_refresh(tokens: &AccountTokens) -> bool {
    tokens.expires_at.is_some_and(|expires_at| {
        expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS) <= chrono::Utc::now()
    })
}

/// Turn an OAuth response into stored tokens, keeping `previous_refresh`
/// when Google omits a new refresh token.
fn tokens_from(access: google_calendar::AccessToken, previous_refresh: &str) -> AccountTokens {
    let refresh_token = match access.refresh_token.as_str() {
        "" => previous_refresh.to_string(),
        token => token.to_string(),
    };
    let expires_at = (access.expires_in > 0)
        .then(|| chrono::Utc::now() + chrono::Duration::seconds(access.expires_in));

    AccountTokens {
        access_token: access.access_token,
        refresh_token,
        expires_at,
    }
}

async fn refreshed_tokens(google: &GoogleConfig, tokens: &AccountTokens) -> Result<AccountTokens> {
    let access = client_for(google, tokens)
        .refresh_access_token()
        .await
        .context("Google rejected the token refresh")?;

    Ok(tokens_from(access, &tokens.refresh_token))
}

/// Pull `code` and `state` out of the redirect's request line.
fn parse_redirect(request_line: &str) -> Result<(String, String)> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .with_context(|| format!("Malformed OAuth redirect: {}", request_line.trim()))?;
    let url = url::Url::parse("http://localhost")?.join(target)?;
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        anyhow::bail!("Google denied access: {}", error);
    }

    match (params.get("code"), params.get("state")) {
        (Some(code), Some(state)) => Ok((code.clone(), state.clone())),
        _ => anyhow::bail!("OAuth redirect is missing code or state"),
    }
}

/// Accept a single redirect on the loopback port and answer the browser.
fn receive_redirect() -> Result<(String, String)> {
    let listener = TcpListener::bind(("127.0.0.1", REDIRECT_PORT))
        .with_context(|| format!("Port {} is unavailable for the OAuth redirect", REDIRECT_PORT))?;
    log::debug!("Listening for the OAuth redirect on port {}", REDIRECT_PORT);

    let (mut stream, _) = listener.accept()?;
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line)?;

    let outcome = parse_redirect(&request_line);
    let body = match &outcome {
        Ok(_) => "icsmirror is authorized. You can close this tab.",
        Err(_) => "icsmirror could not be authorized. Check the terminal.",
    };
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )?;
    stream.flush()?;

    outcome
}

/// Authorize icsmirror against the one Google account it writes with.
pub async fn authorize(google: &GoogleConfig) -> Result<AccountTokens> {
    let unauthorized = AccountTokens {
        access_token: String::new(),
        refresh_token: String::new(),
        expires_at: None,
    };
    let mut client = client_for(google, &unauthorized);

    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let consent_url = client.user_consent_url(&scopes);

    println!("Grant calendar access in your browser:\n\n  {}\n", consent_url);
    if let Err(e) = open::that(&consent_url) {
        log::warn!("Could not launch a browser ({}), open the link manually", e);
    }

    let (code, state) = receive_redirect()?;
    let access = client
        .get_access_token(&code, &state)
        .await
        .context("Could not exchange the authorization code")?;

    Ok(tokens_from(access, ""))
}
