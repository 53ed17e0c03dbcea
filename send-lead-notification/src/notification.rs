use crate::ValidatedSubmission;
use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tinytemplate::{error::Error, format_unescaped, TinyTemplate};

const HTML_TEMPLATE_NAME: &str = "lead-notification-html";
const TEXT_TEMPLATE_NAME: &str = "lead-notification-text";
const HTML_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/lead-notification.html"
));
const TEXT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/lead-notification.txt"
));
const STYLESHEET: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/lead-notification.css"
));

const RECEIPT_LOCALE: Locale = Locale::it_IT;
const RECEIPT_TIME_ZONE: Tz = chrono_tz::Europe::Rome;
// Full date, short time.
const RECEIPT_FORMAT: &str = "%A %-d %B %Y alle ore %H:%M";

/// The rendered email announcing one lead.
#[derive(Debug)]
pub struct LeadNotification {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Serialize)]
struct Context<'a> {
    stylesheet: &'static str,
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    budget: Option<&'a str>,
    zone: Option<&'a str>,
    move_in_date: Option<&'a str>,
    duration: Option<&'a str>,
    message: Option<&'a str>,
    received_at: String,
}

pub fn render_notification(
    submission: &ValidatedSubmission,
    received_at: DateTime<Utc>,
) -> Result<LeadNotification, Error> {
    let context = Context {
        stylesheet: STYLESHEET,
        name: submission.name,
        email: submission.email,
        phone: submission.phone,
        budget: submission.budget,
        zone: submission.zone,
        move_in_date: submission.move_in_date,
        duration: submission.duration,
        message: submission.message,
        received_at: format_receipt_timestamp(received_at),
    };

    let mut html_templates = TinyTemplate::new();
    html_templates.add_template(HTML_TEMPLATE_NAME, HTML_TEMPLATE)?;

    // Plain text must not be HTML-escaped.
    let mut text_templates = TinyTemplate::new();
    text_templates.set_default_formatter(&format_unescaped);
    text_templates.add_template(TEXT_TEMPLATE_NAME, TEXT_TEMPLATE)?;

    Ok(LeadNotification {
        subject: render_subject(submission.name),
        html: html_templates.render(HTML_TEMPLATE_NAME, &context)?,
        text: text_templates.render(TEXT_TEMPLATE_NAME, &context)?,
    })
}

fn render_subject(name: &str) -> String {
    format!("🔥 BOOM: Nuovo contatto da {name}")
}

pub fn format_receipt_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&RECEIPT_TIME_ZONE)
        .format_localized(RECEIPT_FORMAT, RECEIPT_LOCALE)
        .to_string()
}
