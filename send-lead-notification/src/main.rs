mod config;
mod delivery;
mod notification;

use chrono::Utc;
use config::{Config, EMAIL_FROM_VARIABLE, EMAIL_TO_VARIABLE};
use delivery::{DeliveryError, DeliveryReceipt, EmailDelivery, OutboundEmail, ResendClient};
use lambda_http::{
    http::{response::Builder, Method, StatusCode},
    run, service_fn, Body, Error, Request, RequestPayloadExt, Response,
};
use notification::{render_notification, LeadNotification};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{error, info};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

const SUCCESS_MESSAGE: &str = "Grazie! Ti contatteremo entro 24 ore.";
const GENERIC_ERROR_MESSAGE: &str = "Si è verificato un errore. Riprova o scrivici direttamente.";
const REQUIRED_FIELDS_MESSAGE: &str = "Name and email are required";
const INVALID_EMAIL_MESSAGE: &str = "Please provide a valid email address";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env();
    let handler = ContactSubmissionHandler::new(ResendClient::new(&config), &config);
    run(service_fn(|event| handler.handle(event))).await
}

struct ContactSubmissionHandler<DeliveryT: EmailDelivery> {
    delivery: DeliveryT,
    sender: Option<String>,
    recipient: Option<String>,
}

impl<DeliveryT: EmailDelivery> ContactSubmissionHandler<DeliveryT> {
    fn new(delivery: DeliveryT, config: &Config) -> Self {
        Self {
            delivery,
            sender: config.email_from.clone(),
            recipient: config.email_to.clone(),
        }
    }

    async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        match *event.method() {
            Method::OPTIONS => return Ok(cors_response(StatusCode::OK).body(Body::Empty)?),
            Method::POST => {}
            _ => {
                return json_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    &MethodNotAllowedResponse {
                        error: METHOD_NOT_ALLOWED_MESSAGE,
                    },
                )
            }
        }
        match self.process_submission(event).await {
            Ok(receipt) => {
                info!("Email sent successfully: {}", receipt.id);
                json_response(
                    StatusCode::OK,
                    &SubmissionResponse {
                        success: true,
                        message: Some(SUCCESS_MESSAGE),
                        error: None,
                    },
                )
            }
            Err(error) => {
                error.log();
                error.into_response()
            }
        }
    }

    async fn process_submission(&self, event: Request) -> Result<DeliveryReceipt, SubmissionError> {
        let submission = ContactSubmission::from_request(&event)?;
        let validated_submission = submission.validate()?;
        let notification = render_notification(&validated_submission, Utc::now())
            .map_err(|error| {
                SubmissionError::Unexpected(format!("Error rendering notification: {error}"))
            })?;
        let email = self.construct_email(&validated_submission, notification)?;
        Ok(self.delivery.send(email).await?)
    }

    fn construct_email(
        &self,
        submission: &ValidatedSubmission,
        notification: LeadNotification,
    ) -> Result<OutboundEmail, SubmissionError> {
        let Some(from) = self.sender.clone() else {
            return Err(DeliveryError::MissingConfiguration(EMAIL_FROM_VARIABLE).into());
        };
        let Some(to) = self.recipient.clone() else {
            return Err(DeliveryError::MissingConfiguration(EMAIL_TO_VARIABLE).into());
        };
        Ok(OutboundEmail {
            from,
            to,
            reply_to: submission.email.into(),
            subject: notification.subject,
            html: notification.html,
            text: notification.text,
        })
    }
}

fn cors_response(status: StatusCode) -> Builder {
    CORS_HEADERS
        .iter()
        .fold(Response::builder().status(status), |builder, (name, value)| {
            builder.header(*name, *value)
        })
}

fn json_response(status: StatusCode, payload: &impl Serialize) -> Result<Response<Body>, Error> {
    Ok(cors_response(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(payload)?.into())?)
}

#[derive(Serialize)]
struct SubmissionResponse<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct MethodNotAllowedResponse<'a> {
    error: &'a str,
}

#[derive(Debug, Default)]
struct ContactSubmission {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    message: Option<String>,
    budget: Option<String>,
    zone: Option<String>,
    move_in_date: Option<String>,
    duration: Option<String>,
}

impl ContactSubmission {
    fn from_request(event: &Request) -> Result<Self, ValidationError> {
        let body: &[u8] = event.body().as_ref();
        if body.is_empty() {
            return Ok(Self::default());
        }
        // Only an object carries named fields; arrays and scalars are rejected here.
        let fields: Map<String, Value> = match event.payload() {
            Ok(Some(fields)) => fields,
            // No usable Content-Type; browsers posting with fetch() often omit it.
            Ok(None) => serde_json::from_slice(body)
                .map_err(|error| ValidationError::MalformedBody(error.to_string()))?,
            Err(error) => return Err(ValidationError::MalformedBody(error.to_string())),
        };
        Ok(Self::from_fields(&fields))
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let field = |key: &str| fields.get(key).and_then(text_value);
        Self {
            name: field("name"),
            email: field("email"),
            phone: field("phone"),
            message: field("message"),
            budget: field("budget"),
            zone: field("zone"),
            move_in_date: field("moveInDate"),
            duration: field("duration"),
        }
    }

    fn validate(&self) -> Result<ValidatedSubmission, ValidationError> {
        let (Some(name), Some(email)) = (self.name.as_deref(), self.email.as_deref()) else {
            return Err(ValidationError::MissingRequiredFields);
        };
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail(email.into()));
        }
        Ok(ValidatedSubmission {
            name,
            email,
            phone: self.phone.as_deref(),
            message: self.message.as_deref(),
            budget: self.budget.as_deref(),
            zone: self.zone.as_deref(),
            move_in_date: self.move_in_date.as_deref(),
            duration: self.duration.as_deref(),
        })
    }
}

/// Strings and numbers are kept as text. Empty strings, `null` and any other JSON type count as
/// absent.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap())
        .is_match(email)
}

struct ValidatedSubmission<'a> {
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    message: Option<&'a str>,
    budget: Option<&'a str>,
    zone: Option<&'a str>,
    move_in_date: Option<&'a str>,
    duration: Option<&'a str>,
}

#[derive(Debug)]
enum ValidationError {
    MissingRequiredFields,
    InvalidEmail(String),
    MalformedBody(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingRequiredFields => write!(f, "Missing name or email"),
            ValidationError::InvalidEmail(email) => write!(f, "Invalid email address {email}"),
            ValidationError::MalformedBody(description) => {
                write!(f, "Unreadable request body: {description}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
enum SubmissionError {
    Validation(ValidationError),
    Delivery(DeliveryError),
    Unexpected(String),
}

impl SubmissionError {
    fn log(&self) {
        match self {
            SubmissionError::Validation(error) => {
                info!("Rejected contact form submission: {error}");
            }
            SubmissionError::Delivery(error) => {
                error!("Contact form error sending lead notification: {error}");
            }
            SubmissionError::Unexpected(description) => {
                error!("Contact form error: {description}");
            }
        }
    }

    fn into_response(self) -> Result<Response<Body>, Error> {
        let (status, message) = match self {
            SubmissionError::Validation(ValidationError::InvalidEmail(_)) => {
                (StatusCode::BAD_REQUEST, INVALID_EMAIL_MESSAGE)
            }
            SubmissionError::Validation(_) => (StatusCode::BAD_REQUEST, REQUIRED_FIELDS_MESSAGE),
            SubmissionError::Delivery(_) | SubmissionError::Unexpected(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
        };
        json_response(
            status,
            &SubmissionResponse {
                success: false,
                message: None,
                error: Some(message),
            },
        )
    }
}

impl From<ValidationError> for SubmissionError {
    fn from(error: ValidationError) -> Self {
        SubmissionError::Validation(error)
    }
}

impl From<DeliveryError> for SubmissionError {
    fn from(error: DeliveryError) -> Self {
        SubmissionError::Delivery(error)
    }
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionError::Validation(error) => write!(f, "Validation error: {error}"),
            SubmissionError::Delivery(error) => write!(f, "Delivery error: {error}"),
            SubmissionError::Unexpected(description) => {
                write!(f, "Unexpected error: {description}")
            }
        }
    }
}

impl std::error::Error for SubmissionError {}
