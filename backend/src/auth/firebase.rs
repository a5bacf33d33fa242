use std::collections::HashMap;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::jwt::JwtError;
use crate::store::firebase_db::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("no profile stored for user {0}")]
    MissingProfile(String),
    #[error("profile lookup failed: {0}")]
    Store(#[from] StoreError),
    #[error("token error: {0}")]
    Jwt(#[from] JwtError),
}

#[derive(Debug, Deserialize)]
pub struct ProviderUser {
    #[serde(rename = "localId")]
    pub local_id: String,
    pub email: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshedTokens {
    pub id_token: String,
    pub refresh_token: String,
}

/// Email/password identity provider speaking the Firebase Auth REST API.
#[derive(Clone)]
pub struct FirebaseAuthService {
    http_client: HttpClient,
    api_key: String,
    identity_url: String,
    token_url: String,
}

impl FirebaseAuthService {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoints(
            api_key,
            "https://identitytoolkit.googleapis.com/v1".to_string(),
            "https://securetoken.googleapis.com/v1".to_string(),
        )
    }

    pub fn with_endpoints(api_key: String, identity_url: String, token_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, base: &str, action: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/{}", base, action))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, AuthError> {
        let url = self.endpoint(&self.identity_url, "accounts:signInWithPassword")?;
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self.http_client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(classify_provider_error(&response.text().await?));
        }

        let user: ProviderUser = serde_json::from_str(&response.text().await?)?;
        Ok(user)
    }

    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderUser, AuthError> {
        let url = self.endpoint(&self.identity_url, "accounts:signUp")?;
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self.http_client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(classify_provider_error(&response.text().await?));
        }

        let user: ProviderUser = serde_json::from_str(&response.text().await?)?;
        Ok(user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidCredentials("empty refresh token".to_string()));
        }

        let url = self.endpoint(&self.token_url, "token")?;
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_provider_error(&response.text().await?));
        }

        let tokens: RefreshedTokens = serde_json::from_str(&response.text().await?)?;
        Ok(tokens)
    }
}

// The provider reports failures as {"error": {"message": "REASON"}}.
// Credential rejections become recoverable InvalidCredentials; anything
// else stays a Provider error so callers can tell the cases apart.
pub(crate) fn classify_provider_error(body: &str) -> AuthError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    let credential_failure = [
        "INVALID_PASSWORD",
        "EMAIL_NOT_FOUND",
        "INVALID_LOGIN_CREDENTIALS",
        "USER_DISABLED",
        "EMAIL_EXISTS",
        "INVALID_REFRESH_TOKEN",
    ]
    .iter()
    .any(|reason| message.starts_with(reason));

    if credential_failure {
        AuthError::InvalidCredentials(message)
    } else {
        AuthError::Provider(message)
    }
}
