//! User-visible notices and Sentry context.
//!
//! Every failure caught at an operation boundary is turned into a [`Notice`]
//! instead of propagating to the rendering layer. Turning an error into a
//! notice also leaves a Sentry breadcrumb, so a later captured event shows
//! the trail of declined or failed actions leading up to it.

use serde::Serialize;

use crate::error::StorefrontError;

/// Severity of a notice, mapped to toast styling by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    const fn sentry_level(self) -> sentry::Level {
        match self {
            Self::Success | Self::Info => sentry::Level::Info,
            Self::Warning => sentry::Level::Warning,
            Self::Error => sentry::Level::Error,
        }
    }
}

/// A message shown to the user, with an optional navigation redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<&'static str>,
}

impl Notice {
    /// A success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            redirect_to: None,
        }
    }

    /// An informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            redirect_to: None,
        }
    }

    /// Translate a failure into what the user is told.
    ///
    /// - network failures: transient warning, the user may retry
    /// - server rejections: the server's own reason
    /// - authorization: a redirect plus notice, never silent
    /// - partial checkout: how many orders went through, and why the rest did not
    #[must_use]
    pub fn from_error(err: &StorefrontError) -> Self {
        let notice = match err {
            StorefrontError::Network(_) => Self {
                level: NoticeLevel::Warning,
                message: "Could not reach the store. Check your connection and try again."
                    .to_string(),
                redirect_to: None,
            },
            StorefrontError::MutationRejected(reason) => Self {
                level: NoticeLevel::Error,
                message: reason.clone(),
                redirect_to: None,
            },
            StorefrontError::Authorization { redirect_to, .. } => Self {
                level: NoticeLevel::Warning,
                message: if *redirect_to == crate::session::LOGIN_REDIRECT {
                    "Please log in to continue.".to_string()
                } else {
                    "You do not have access to that page.".to_string()
                },
                redirect_to: Some(*redirect_to),
            },
            StorefrontError::InvalidInput(reason) => Self {
                level: NoticeLevel::Error,
                message: reason.clone(),
                redirect_to: None,
            },
            StorefrontError::PartialCheckout { placed, source } => Self {
                level: NoticeLevel::Error,
                message: format!(
                    "{} order(s) were placed, but the rest could not be: {source}",
                    placed.len()
                ),
                redirect_to: None,
            },
        };

        let detail = err.to_string();
        add_breadcrumb(
            "storefront.notice",
            &notice.message,
            notice.level,
            &[("error", detail.as_str())],
        );
        notice
    }

    /// Collapse an operation result into a notice.
    pub fn from_result<T>(result: &Result<T, StorefrontError>, success: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::success(success),
            Err(err) => Self::from_error(err),
        }
    }
}

/// Record a breadcrumb for a user-facing event.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", NoticeLevel::Info, &[("item_id", "65a1")]);
/// ```
pub fn add_breadcrumb(category: &str, message: &str, level: NoticeLevel, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: level.sentry_level(),
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Associate subsequent Sentry events with the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop associating Sentry events with a user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
