use crate::config::{Config, RESEND_API_KEY_VARIABLE};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const EMAILS_PATH: &str = "/emails";

/// One message handed to the email provider.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryReceipt {
    pub id: String,
}

#[async_trait]
pub trait EmailDelivery {
    async fn send(&self, email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Client for the Resend transactional email API.
///
/// Built once at start-up; the underlying connection pool is shared by every invocation.
pub struct ResendClient {
    client: Client,
    api_url: Cow<'static, str>,
    api_key: Option<String>,
}

impl ResendClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_url: config.resend_api_url.clone(),
            api_key: config.resend_api_key.clone(),
        }
    }

    fn emails_url(&self) -> String {
        format!("{}{EMAILS_PATH}", self.api_url.trim_end_matches('/'))
    }

    async fn process_response(response: Response) -> Result<DeliveryReceipt, DeliveryError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ResendErrorResponse>().await {
                Ok(body) => body.message,
                Err(error) => format!("(unreadable error body: {error})"),
            };
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let body: ResendSendResponse = response
            .json()
            .await
            .map_err(|error| DeliveryError::InvalidResponse(error.to_string()))?;
        Ok(DeliveryReceipt { id: body.id })
    }
}

#[async_trait]
impl EmailDelivery for ResendClient {
    async fn send(&self, email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(DeliveryError::MissingConfiguration(RESEND_API_KEY_VARIABLE));
        };
        let payload = ResendSendPayload {
            from: &email.from,
            to: [&email.to],
            reply_to: &email.reply_to,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };
        let response = self
            .client
            .post(self.emails_url())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;
        Self::process_response(response).await
    }
}

#[derive(Serialize)]
struct ResendSendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ResendSendResponse {
    id: String,
}

#[derive(Deserialize)]
struct ResendErrorResponse {
    message: String,
}

#[derive(Debug)]
pub enum DeliveryError {
    MissingConfiguration(&'static str),
    Transport(reqwest::Error),
    Rejected { status: u16, message: String },
    InvalidResponse(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::MissingConfiguration(name) => {
                write!(f, "Missing configuration {name}")
            }
            DeliveryError::Transport(error) => write!(f, "Error contacting Resend: {error}"),
            DeliveryError::Rejected { status, message } => {
                write!(f, "Resend rejected the email with status {status}: {message}")
            }
            DeliveryError::InvalidResponse(error) => {
                write!(f, "Invalid response from Resend: {error}")
            }
        }
    }
}

impl std::error::Error for DeliveryError {}
