//! services/client/src/feedback.rs
//!
//! Turns the outcome of an action into the status line shown to the user.
//! No API error is ever left unreported.

use price_analysis_core::ports::PortError;
use std::fmt;

use crate::adapters::wire::server_message;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub success: bool,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.success { "ok" } else { "error" };
        write!(f, "[{}] {}", marker, self.message)
    }
}

impl From<&ClientError> for StatusMessage {
    fn from(error: &ClientError) -> Self {
        let message = match error {
            ClientError::Validation(errors) => {
                let mut fields: Vec<String> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| match &e.message {
                            Some(message) => format!("{}: {}", field, message),
                            None => format!("{}: invalid value", field),
                        })
                    })
                    .collect();
                fields.sort();
                format!("Please correct the form. {}", fields.join("; "))
            }
            ClientError::Port(port) => port_message(port),
            ClientError::Forbidden(_) => "This action requires administrator access.".to_string(),
            ClientError::Rejected(message) => message.clone(),
            other => other.to_string(),
        };
        Self::failure(message)
    }
}

fn port_message(error: &PortError) -> String {
    match error {
        PortError::Unauthorized | PortError::RefreshFailed(_) => {
            "Your session has ended. Please sign in again.".to_string()
        }
        PortError::SubscriptionExpired => {
            "Your subscription has expired. Ask an administrator to extend your access.".to_string()
        }
        PortError::Http { status, message } => {
            server_message(message).unwrap_or_else(|| status_fallback(*status).to_string())
        }
        PortError::Transport(_) => {
            "Could not reach the server. Check your connection and try again.".to_string()
        }
        PortError::Decode(_) => "The server sent a response that could not be read.".to_string(),
        PortError::Storage(detail) => format!("Could not access the saved session: {}", detail),
        PortError::Unexpected(detail) => format!("Unexpected error: {}", detail),
    }
}

fn status_fallback(status: u16) -> &'static str {
    match status {
        400 => "The server rejected the data as invalid.",
        401 => "Authorization failed.",
        403 => "Access denied.",
        404 => "The requested resource was not found.",
        500..=599 => "The server failed to process the request. Try again later.",
        _ => "The request failed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::LoginForm;
    use validator::Validate;

    fn status(error: ClientError) -> StatusMessage {
        StatusMessage::from(&error)
    }

    #[test]
    fn server_message_wins_over_status_text() {
        let message = status(ClientError::Port(PortError::Http {
            status: 400,
            message: r#"{"message":"File must be .xlsx"}"#.into(),
        }));
        assert_eq!(message, StatusMessage::failure("File must be .xlsx"));

        let message = status(ClientError::Port(PortError::Http {
            status: 502,
            message: "<html>Bad Gateway</html>".into(),
        }));
        assert_eq!(
            message.message,
            "The server failed to process the request. Try again later."
        );
    }

    #[test]
    fn session_and_entitlement_errors_ask_for_action() {
        assert!(status(ClientError::Port(PortError::RefreshFailed("401".into())))
            .message
            .contains("sign in again"));
        assert!(status(ClientError::Port(PortError::SubscriptionExpired))
            .message
            .contains("administrator"));
    }

    #[test]
    fn validation_errors_name_the_fields() {
        let errors = LoginForm { phone: "1".into(), password: "x".into() }
            .validate()
            .unwrap_err();
        let message = status(ClientError::Validation(errors));
        assert!(!message.success);
        assert!(message.message.contains("password: Password must be at least 6 characters."));
        assert!(message.message.contains("phone: Phone number must contain at least 10 digits."));
    }

    #[test]
    fn renders_with_marker() {
        assert_eq!(StatusMessage::success("Template saved").to_string(), "[ok] Template saved");
    }
}
