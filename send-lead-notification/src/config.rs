use std::borrow::Cow;
use tracing::warn;

const RESEND_API_URL: &str = "https://api.resend.com";

pub const RESEND_API_KEY_VARIABLE: &str = "RESEND_API_KEY";
pub const EMAIL_FROM_VARIABLE: &str = "EMAIL_FROM";
pub const EMAIL_TO_VARIABLE: &str = "EMAIL_TO";
const RESEND_API_URL_VARIABLE: &str = "RESEND_API_URL";

/// Settings read from the process environment at start-up.
///
/// Nothing here is required to start. A missing value only fails the dispatch which needs it, so
/// a misconfigured deployment still answers preflight and validation requests normally.
#[derive(Clone, Debug)]
pub struct Config {
    pub resend_api_key: Option<String>,
    pub resend_api_url: Cow<'static, str>,
    pub email_from: Option<String>,
    pub email_to: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            resend_api_key: non_empty_var(RESEND_API_KEY_VARIABLE),
            resend_api_url: non_empty_var(RESEND_API_URL_VARIABLE)
                .map(Cow::Owned)
                .unwrap_or(RESEND_API_URL.into()),
            email_from: non_empty_var(EMAIL_FROM_VARIABLE),
            email_to: non_empty_var(EMAIL_TO_VARIABLE),
        };
        config.warn_about_missing_values();
        config
    }

    fn warn_about_missing_values(&self) {
        for (name, value) in [
            (RESEND_API_KEY_VARIABLE, &self.resend_api_key),
            (EMAIL_FROM_VARIABLE, &self.email_from),
            (EMAIL_TO_VARIABLE, &self.email_to),
        ] {
            if value.is_none() {
                warn!("Environment variable {name} is not set; lead notifications will fail.");
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
