//! Request DTOs for the Web API.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::pin_format;

/// PIN login request.
///
/// Fields default to empty strings so presence checks happen in the
/// handler with the exact wire messages, not in serde.
#[derive(Debug, Serialize, Deserialize)]
pub struct PinLoginRequest {
    /// User ID of the kid signing in.
    #[serde(rename = "userId", default)]
    pub user_id: String,
    /// 4-digit PIN.
    #[serde(default)]
    pub pin: String,
}

/// Password login request.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

/// One-time token redemption request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemTokenRequest {
    /// Token from a PIN exchange.
    #[serde(default)]
    pub token: String,
}

/// Token refresh request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke.
    pub refresh_token: String,
}

/// Parent registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

/// Kid account creation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateKidRequest {
    /// Email address for the kid account.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    /// 4-digit PIN.
    #[validate(custom(function = pin_format))]
    pub pin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_login_request_camel_case() {
        let req: PinLoginRequest =
            serde_json::from_str(r#"{"userId": "u2", "pin": "1234"}"#).unwrap();
        assert_eq!(req.user_id, "u2");
        assert_eq!(req.pin, "1234");
    }

    #[test]
    fn test_pin_login_request_missing_fields_default_empty() {
        let req: PinLoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_id.is_empty());
        assert!(req.pin.is_empty());
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "parent@example.com".to_string(),
            password: "long enough".to_string(),
            name: "Pat".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..ok_clone(&ok)
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..ok_clone(&ok)
        };
        assert!(short_password.validate().is_err());
    }

    fn ok_clone(r: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            email: r.email.clone(),
            password: r.password.clone(),
            name: r.name.clone(),
        }
    }

    #[test]
    fn test_create_kid_request_pin_validation() {
        let ok = CreateKidRequest {
            email: "kid2@example.com".to_string(),
            name: "Bobby Kid".to_string(),
            pin: "5678".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_pin = CreateKidRequest {
            pin: "56789".to_string(),
            email: ok.email.clone(),
            name: ok.name.clone(),
        };
        assert!(bad_pin.validate().is_err());

        let alpha_pin = CreateKidRequest {
            pin: "abcd".to_string(),
            email: ok.email.clone(),
            name: ok.name.clone(),
        };
        assert!(alpha_pin.validate().is_err());
    }
}
