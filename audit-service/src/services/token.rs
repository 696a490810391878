//! Bearer-token exchange for signed delegation assertions.

use anyhow::anyhow;
use serde::Deserialize;
use service_core::observability::TracedClientExt;

use crate::services::credentials::ScopedCredential;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange a signed assertion for a short-lived access token at the
/// credential's token endpoint.
pub(crate) async fn fetch_access_token(
    http: &reqwest::Client,
    credential: &ScopedCredential,
) -> Result<String, anyhow::Error> {
    let params = [
        ("grant_type", JWT_BEARER_GRANT),
        ("assertion", credential.assertion.as_str()),
    ];

    let response = http
        .traced_post(&credential.token_uri)
        .form(&params)
        .send()
        .await
        .map_err(|e| anyhow!("token endpoint request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "token endpoint returned {} for subject {}: {}",
            status,
            credential.subject,
            body
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| anyhow!("token endpoint returned an unreadable body: {}", e))?;

    Ok(token.access_token)
}
