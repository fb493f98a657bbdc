//! HTTP client for the Chorely auth API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::ProviderError;
use crate::web::dto::{
    LoginRequest, LogoutRequest, OkResponse, PinLoginRequest, PinLoginResponse,
    RedeemTokenRequest, RefreshRequest, SessionResponse, UserPayload,
};
use crate::web::error::ErrorBody;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client for the auth endpoints.
#[derive(Clone)]
pub struct AuthApi {
    base_url: Url,
    http: reqwest::Client,
}

impl AuthApi {
    /// Create a client for a server base URL such as `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> crate::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| crate::ChorelyError::Validation(format!("invalid base URL: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                crate::ChorelyError::Internal(format!("HTTP client setup failed: {}", e))
            })?;

        Ok(Self { base_url, http })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Transport(format!("invalid response body: {}", e)));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("request failed with status {}", status));

        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// POST /api/auth/pin-login
    pub async fn pin_login(
        &self,
        user_id: &str,
        pin: &str,
    ) -> Result<PinLoginResponse, ProviderError> {
        let body = PinLoginRequest {
            user_id: user_id.to_string(),
            pin: pin.to_string(),
        };
        self.post("/api/auth/pin-login", &body).await
    }

    /// POST /api/auth/login
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionResponse, ProviderError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/api/auth/login", &body).await
    }

    /// POST /api/auth/token
    pub async fn redeem_token(&self, token: &str) -> Result<SessionResponse, ProviderError> {
        let body = RedeemTokenRequest {
            token: token.to_string(),
        };
        self.post("/api/auth/token", &body).await
    }

    /// POST /api/auth/refresh
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionResponse, ProviderError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post("/api/auth/refresh", &body).await
    }

    /// POST /api/auth/logout
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ProviderError> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };
        let _: OkResponse = self.post("/api/auth/logout", &body).await?;
        Ok(())
    }

    /// GET /api/auth/me
    pub async fn me(&self, access_token: &str) -> Result<UserPayload, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("/api/auth/me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Self::parse(response).await
    }
}
