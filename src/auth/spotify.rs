//! Spotify accounts service client
//!
//! Builds the authorize URL and performs the authorization code
//! exchange against the token endpoint.

use serde::Deserialize;
use url::Url;

use crate::config::SpotifyConfig;
use crate::error::{AppError, TokenExchangeError};

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body returned by the token endpoint
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Build the URL the browser is sent to on login
///
/// Query: response_type=code, client_id, scope, redirect_uri
pub fn authorize_url(config: &SpotifyConfig) -> Result<Url, AppError> {
    Url::parse_with_params(
        &config.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", config.scope.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ],
    )
    .map_err(|e| AppError::Config(format!("spotify.authorize_url is invalid: {e}")))
}

/// Exchange an authorization code for access and refresh tokens
///
/// The request is form-encoded and bounded by the configured timeout.
/// No retry is attempted.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &SpotifyConfig,
    code: &str,
) -> Result<TokenResponse, TokenExchangeError> {
    let response = client
        .post(&config.token_url)
        .timeout(config.token_timeout())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(TokenExchangeError::from_transport)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ProviderError>(&body) {
            Ok(ProviderError {
                error,
                error_description: Some(description),
            }) => format!("{error}: {description}"),
            Ok(ProviderError { error, .. }) => error,
            Err(_) => format!("unrecognized error body ({} bytes)", body.len()),
        };
        return Err(TokenExchangeError::Rejected { status, error });
    }

    let body = response
        .bytes()
        .await
        .map_err(TokenExchangeError::from_transport)?;

    serde_json::from_slice::<TokenResponse>(&body)
        .map_err(|e| TokenExchangeError::MalformedResponse(e.to_string()))
}

/// Front-end URL carrying the tokens in its fragment
pub fn frontend_redirect(config: &SpotifyConfig, tokens: &TokenResponse) -> String {
    format!(
        "{}#access_token={}&refresh_token={}",
        config.frontend_callback_url,
        urlencoding::encode(&tokens.access_token),
        urlencoding::encode(&tokens.refresh_token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn authorize_url_carries_fixed_parameters() {
        let config = valid_config().spotify;
        let url = authorize_url(&config).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), config.client_id.clone())));
        assert!(pairs.contains(&("scope".to_string(), config.scope.clone())));
        assert!(pairs.contains(&("redirect_uri".to_string(), config.redirect_uri.clone())));
    }

    #[test]
    fn frontend_redirect_puts_tokens_in_fragment() {
        let config = valid_config().spotify;
        let tokens = TokenResponse {
            access_token: "A".to_string(),
            refresh_token: "B".to_string(),
            token_type: None,
            expires_in: None,
            scope: None,
        };

        assert_eq!(
            frontend_redirect(&config, &tokens),
            "https://makin-music.vercel.app/auth/callback#access_token=A&refresh_token=B"
        );
    }

    #[test]
    fn frontend_redirect_escapes_token_characters() {
        let config = valid_config().spotify;
        let tokens = TokenResponse {
            access_token: "a&b".to_string(),
            refresh_token: "c=d".to_string(),
            token_type: None,
            expires_in: None,
            scope: None,
        };

        let url = frontend_redirect(&config, &tokens);
        assert!(url.ends_with("#access_token=a%26b&refresh_token=c%3Dd"));
    }

    #[test]
    fn token_response_requires_refresh_token() {
        let parsed = serde_json::from_str::<TokenResponse>(r#"{"access_token":"A"}"#);
        assert!(parsed.is_err());
    }
}
