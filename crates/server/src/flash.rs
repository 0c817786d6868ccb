use axum::http::HeaderMap;

use timetabler_core::errors::{ApplicationError, AuthError};

use crate::auth::read_cookie;

pub const FLASH_COOKIE: &str = "timetabler_flash";

/// One-shot notice shown on the sign-in page. Only the code travels in the
/// cookie; the text is resolved server-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashMessage {
    InvalidCredentials,
    InvalidRole,
    SignInRequired,
    NotAuthorized,
    LoggedOut,
}

impl FlashMessage {
    const ALL: [FlashMessage; 5] = [
        FlashMessage::InvalidCredentials,
        FlashMessage::InvalidRole,
        FlashMessage::SignInRequired,
        FlashMessage::NotAuthorized,
        FlashMessage::LoggedOut,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidRole => "invalid_role",
            Self::SignInRequired => "sign_in_required",
            Self::NotAuthorized => "not_authorized",
            Self::LoggedOut => "logged_out",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|message| message.code() == code)
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => {
                ApplicationError::Auth(AuthError::InvalidCredentials).user_message()
            }
            Self::InvalidRole => {
                ApplicationError::Auth(AuthError::UnexpectedRole(String::new())).user_message()
            }
            Self::SignInRequired => "Please sign in to continue.",
            Self::NotAuthorized => "You are not authorized to view that page.",
            Self::LoggedOut => "You have been successfully logged out.",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }

    pub fn set_cookie(&self) -> String {
        format!("{FLASH_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60", self.code())
    }

    pub fn clear_cookie() -> String {
        format!("{FLASH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        read_cookie(headers, FLASH_COOKIE).and_then(|code| Self::from_code(&code))
    }
}

impl From<&AuthError> for FlashMessage {
    fn from(error: &AuthError) -> Self {
        match error {
            AuthError::UnexpectedRole(_) => Self::InvalidRole,
            AuthError::InvalidCredentials | AuthError::Hashing(_) => Self::InvalidCredentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    use super::FlashMessage;

    #[test]
    fn codes_resolve_back_to_messages() {
        for message in FlashMessage::ALL {
            assert_eq!(FlashMessage::from_code(message.code()), Some(message));
        }
        assert_eq!(FlashMessage::from_code("<script>"), None);
    }

    #[test]
    fn auth_messages_match_user_facing_errors() {
        assert_eq!(FlashMessage::InvalidRole.text(), "Invalid user role.");
        assert_eq!(FlashMessage::InvalidCredentials.text(), "Invalid username or password.");
    }

    #[test]
    fn flash_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("timetabler_session=abc; timetabler_flash=logged_out"),
        );
        assert_eq!(FlashMessage::from_headers(&headers), Some(FlashMessage::LoggedOut));
    }
}
