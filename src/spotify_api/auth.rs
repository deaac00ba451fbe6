use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;

use crate::error::{SyncError, SyncResult};
use crate::spotify_api::types::Authorization;

pub const TOKEN_PATH: &str = "/api/token";

/// `Basic base64(client_id:client_secret)`, as the token endpoint expects.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Exchange a one-time authorization code for a token bundle.
/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
pub async fn exchange_code_for_token(
    client: &Client,
    // Base of the accounts service, e.g. https://accounts.spotify.com
    accounts_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    // Must match the redirect URI used when the code was issued
    redirect_uri: &str,
) -> SyncResult<Authorization> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];

    request_token(client, accounts_url, client_id, client_secret, &params).await
}

/// Trade a refresh token for a fresh access token.
///
/// The response may omit `refresh_token`; callers merge it with the one they
/// already hold (see [`Authorization::merge_refresh`]).
pub async fn refresh_access_token(
    client: &Client,
    accounts_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> SyncResult<Authorization> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    request_token(client, accounts_url, client_id, client_secret, &params).await
}

async fn request_token(
    client: &Client,
    accounts_url: &str,
    client_id: &str,
    client_secret: &str,
    params: &[(&str, &str)],
) -> SyncResult<Authorization> {
    let url = format!("{}{}", accounts_url.trim_end_matches('/'), TOKEN_PATH);

    let response = client
        .post(&url)
        // Serializes to x-www-form-urlencoded and sets the content type
        .form(&params)
        .header(
            reqwest::header::AUTHORIZATION,
            basic_auth_header(client_id, client_secret),
        )
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!("Token endpoint responded with {}", status);
        return Err(SyncError::AuthExchange { body });
    }

    let authorization: Authorization =
        serde_json::from_str(&body).map_err(|_| SyncError::MalformedResponse {
            context: url.clone(),
            body: body.clone(),
        })?;

    if authorization.access_token.is_empty() {
        return Err(SyncError::AuthExchange { body });
    }

    Ok(authorization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_basic_auth_header() {
        // btoa("a:b")
        assert_eq!(basic_auth_header("a", "b"), "Basic YTpi");
        assert_eq!(
            basic_auth_header("client", "secret"),
            "Basic Y2xpZW50OnNlY3JldA=="
        );
    }

    #[tokio::test]
    async fn test_exchange_code_for_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/token")
            .match_header("authorization", "Basic YTpi")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "c".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:8888/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"refresh_token":"rt","scope":"user-read-recently-played"}"#,
            )
            .create_async()
            .await;

        let auth = exchange_code_for_token(
            &Client::new(),
            &server.url(),
            "a",
            "b",
            "c",
            "http://localhost:8888/callback",
        )
        .await
        .unwrap();

        assert_eq!(auth.access_token, "at");
        assert_eq!(auth.refresh_token.as_deref(), Some("rt"));
        assert_eq!(auth.expires_in, 3600);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_without_access_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let err = exchange_code_for_token(&Client::new(), &server.url(), "a", "b", "c", "uri")
            .await
            .unwrap_err();

        match err {
            SyncError::AuthExchange { body } => assert!(body.contains("token_type")),
            other => panic!("Expected AuthExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#)
            .create_async()
            .await;

        let err = exchange_code_for_token(&Client::new(), &server.url(), "a", "b", "used", "uri")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::AuthExchange { ref body } if body.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/token")
            .match_header("authorization", "Basic YTpi")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"fresh","token_type":"Bearer","expires_in":3600,"scope":"user-read-recently-played"}"#,
            )
            .create_async()
            .await;

        let auth = refresh_access_token(&Client::new(), &server.url(), "a", "b", "rt")
            .await
            .unwrap();

        assert_eq!(auth.access_token, "fresh");
        assert!(auth.refresh_token.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_non_json_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = refresh_access_token(&Client::new(), &server.url(), "a", "b", "rt")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 9 on the loopback interface
        let err = refresh_access_token(&Client::new(), "http://127.0.0.1:9", "a", "b", "rt")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
    }
}
