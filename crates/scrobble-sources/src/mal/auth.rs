use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchange a refresh token for a new access token
pub async fn refresh_access_token(
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<TokenInfo> {
    let client = Client::new();
    let form = [
        ("client_id", client_id),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let response = client
        .post(token_url)
        .form(&form)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!("Token refresh failed: {} - {}", status, error_text));
    }

    let token_response: TokenResponse = response.json().await?;
    let expires_at = Utc::now() + Duration::seconds(token_response.expires_in - 120);

    Ok(TokenInfo {
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_refresh_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 2678400,
                "access_token": "new-access",
                "refresh_token": "new-refresh"
            })))
            .mount(&server)
            .await;

        let token_url = format!("{}/v1/oauth2/token", server.uri());
        let info = refresh_access_token(&token_url, "client", "old-refresh")
            .await
            .unwrap();
        assert_eq!(info.access_token, "new-access");
        assert_eq!(info.refresh_token, "new-refresh");
        assert!(info.expires_at > Utc::now() + Duration::days(30));
    }

    #[tokio::test]
    async fn test_refresh_access_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let token_url = format!("{}/v1/oauth2/token", server.uri());
        let err = refresh_access_token(&token_url, "client", "expired")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
