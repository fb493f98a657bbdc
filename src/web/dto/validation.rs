//! JSON extractors and custom validators for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::auth::validate_pin;
use crate::web::error::ApiError;

/// A JSON extractor whose rejection is the flat API error shape.
///
/// Used where the handler itself owns the field checks and their messages.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        Ok(AppJson(value))
    }
}

/// A JSON extractor that also validates the request body.
///
/// Validation failures return the first field message as a flat error.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        value
            .validate()
            .map_err(|errors| ApiError::invalid_request(first_validation_message(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    for (field, field_errors) in errors.field_errors() {
        if let Some(error) = field_errors.first() {
            return error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
        }
    }
    "Validation failed".to_string()
}

/// Validate that a string is exactly four ASCII digits.
pub fn pin_format(value: &str) -> Result<(), validator::ValidationError> {
    if validate_pin(value).is_err() {
        return Err(validator::ValidationError::new("pin_format")
            .with_message("PIN must be 4 digits".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(serde::Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Too short"))]
        value: String,
    }

    #[test]
    fn test_first_validation_message() {
        let sample = Sample {
            value: "ab".to_string(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors), "Too short");
    }

    #[test]
    fn test_pin_format_validator() {
        assert!(pin_format("1234").is_ok());
        assert!(pin_format("123").is_err());
        assert!(pin_format("12a4").is_err());

        let err = pin_format("abc").unwrap_err();
        assert_eq!(err.message.unwrap(), "PIN must be 4 digits");
    }
}
