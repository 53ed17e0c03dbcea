use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::{
    borrow::Cow,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

const EMAILS_PATH: &str = "/emails";

/// Stand-in for the Resend HTTP API which records every email it is asked to send.
#[derive(Clone, Default)]
pub struct FakeResend {
    required_api_key: Option<Cow<'static, str>>,
    rejection: Option<(StatusCode, Cow<'static, str>)>,
    return_invalid_response: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ReceivedEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
    #[serde(skip)]
    pub authorization: Option<String>,
}

pub struct RunningFakeResend {
    base_url: String,
    received: Arc<Mutex<Vec<ReceivedEmail>>>,
}

#[derive(Clone)]
struct ServerState {
    fake: Arc<FakeResend>,
    received: Arc<Mutex<Vec<ReceivedEmail>>>,
}

impl FakeResend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_api_key(self, api_key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            required_api_key: Some(api_key.into()),
            ..self
        }
    }

    pub fn reject_with(self, status: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            rejection: Some((
                StatusCode::from_u16(status).unwrap(),
                message.into(),
            )),
            ..self
        }
    }

    pub fn return_invalid_response(self) -> Self {
        Self {
            return_invalid_response: true,
            ..self
        }
    }

    pub async fn start(self) -> RunningFakeResend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(EMAILS_PATH, post(send_email))
            .with_state(ServerState {
                fake: Arc::new(self),
                received: received.clone(),
            });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        RunningFakeResend {
            base_url: format!("http://{address}"),
            received,
        }
    }
}

impl RunningFakeResend {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn received_emails(&self) -> Vec<ReceivedEmail> {
        self.received.lock().unwrap().clone()
    }
}

async fn send_email(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(mut email): Json<ReceivedEmail>,
) -> Response {
    email.authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    debug!("Fake Resend got email {email:?}");

    if let Some(required_api_key) = state.fake.required_api_key.as_ref() {
        if email.authorization.as_deref() != Some(format!("Bearer {required_api_key}").as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "statusCode": 401,
                    "name": "validation_error",
                    "message": "API key is invalid",
                })),
            )
                .into_response();
        }
    }

    if let Some((status, message)) = state.fake.rejection.as_ref() {
        return (
            *status,
            Json(json!({
                "statusCode": status.as_u16(),
                "name": "application_error",
                "message": message,
            })),
        )
            .into_response();
    }

    let id = {
        let mut received = state.received.lock().unwrap();
        received.push(email);
        format!("fake-email-id-{}", received.len())
    };

    if state.fake.return_invalid_response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            "Invalid response",
        )
            .into_response()
    } else {
        (StatusCode::OK, Json(json!({ "id": id }))).into_response()
    }
}
