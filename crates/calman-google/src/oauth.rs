//! OAuth 2.0 PKCE flow for Google APIs.
//!
//! Implements the Authorization Code flow with the PKCE extension
//! (RFC 7636), using a loopback redirect for desktop use:
//!
//! 1. Generate a random code verifier and its SHA-256 challenge
//! 2. Bind a local HTTP server on a loopback port
//! 3. Open the user's browser to Google's consent page
//! 4. Receive the redirect with the authorization code
//! 5. Exchange the code (with verifier) for access and refresh tokens
//!
//! The loopback server only accepts localhost connections, the state
//! parameter guards against CSRF, and PKCE keeps an intercepted
//! authorization code useless without the verifier.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::config::OAuthCredentials;
use crate::error::{ApiError, ApiResult};
use crate::tokens::TokenInfo;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser redirect before giving up.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for Google APIs.
///
/// Handles the PKCE flow for obtaining tokens and refreshing expired
/// access tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
        }
    }

    /// Runs the full PKCE flow and returns the obtained tokens.
    ///
    /// Starts the loopback server, opens the browser to the consent
    /// page, waits for the callback and exchanges the authorization
    /// code. Fails if no port in `port_range` is free, the user denies
    /// access, the callback times out, or the token exchange fails.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ApiResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) = Self::wait_for_callback(listener)?;

        if received_state != pkce.state {
            return Err(ApiError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens...");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Refreshes an expired access token using the refresh token.
    ///
    /// Returns the new access token and its expiry in seconds.
    pub async fn refresh_token(&self, refresh_token: &str) -> ApiResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ApiResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Tries to bind a TCP listener on an available port in the given range.
    fn bind_loopback_server(port_range: (u16, u16)) -> ApiResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            match TcpListener::bind(format!("127.0.0.1:{}", port)) {
                Ok(listener) => {
                    debug!("bound loopback server on port {}", port);
                    return Ok((listener, port));
                }
                Err(_) => continue,
            }
        }
        Err(ApiError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits for the OAuth callback and extracts the authorization code.
    fn wait_for_callback(listener: TcpListener) -> ApiResult<(String, String)> {
        listener
            .set_nonblocking(false)
            .map_err(|e| ApiError::internal(format!("failed to set blocking: {}", e)))?;

        let (tx, rx) = mpsc::channel();

        // Accept connections on a separate thread so the wait can time out
        let _handle = thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = Self::handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ApiError::authentication("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ApiError::internal("callback channel disconnected"))
            }
        }
    }

    /// Handles an incoming HTTP request on the callback server.
    ///
    /// Returns None for requests that are not the OAuth redirect, so
    /// the accept loop keeps waiting (browsers often probe for
    /// /favicon.ico first).
    fn handle_callback(mut stream: TcpStream) -> Option<ApiResult<(String, String)>> {
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();

        if reader.read_line(&mut request_line).is_err() {
            return None;
        }

        // Request line: GET /callback?code=...&state=... HTTP/1.1
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 || parts[0] != "GET" {
            return None;
        }

        let path = parts[1];
        if !path.starts_with("/callback") {
            return None;
        }

        let query_start = path.find('?').map(|i| i + 1).unwrap_or(path.len());
        let query = &path[query_start..];

        let mut code = None;
        let mut state = None;
        let mut error = None;

        for param in query.split('&') {
            let mut kv = param.splitn(2, '=');
            if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
                match key {
                    "code" => {
                        code = Some(urlencoding::decode(value).unwrap_or_default().into_owned())
                    }
                    "state" => {
                        state = Some(urlencoding::decode(value).unwrap_or_default().into_owned())
                    }
                    "error" => {
                        error = Some(urlencoding::decode(value).unwrap_or_default().into_owned())
                    }
                    _ => {}
                }
            }
        }

        let response = if error.is_some() || code.is_none() {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        } else {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization complete</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        };

        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        if let Some(error) = error {
            return Some(Err(ApiError::authentication(format!(
                "authorization denied: {}",
                error
            ))));
        }

        match (code, state) {
            (Some(c), Some(s)) => Some(Ok((c, s))),
            (Some(c), None) => Some(Ok((c, String::new()))),
            _ => Some(Err(ApiError::authentication(
                "missing authorization code in callback",
            ))),
        }
    }
}

/// PKCE flow state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the Google OAuth authorization URL.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
