//! Concrete storage and alert sinks

use crate::domain::errors::SinkError;

pub mod csv_sink;
pub mod discord;
pub mod factory;
pub mod jsonl_sink;
pub mod message;
pub mod row;
pub mod sqlite_sink;
pub mod telegram;

pub use csv_sink::CsvSink;
pub use discord::DiscordSink;
pub use factory::SinkFactory;
pub use jsonl_sink::JsonlSink;
pub use row::DetectionRow;
pub use sqlite_sink::SqliteSink;
pub use telegram::TelegramSink;

/// Map a failed HTTP send to a `SinkError` that never contains `secret`.
///
/// Webhook URLs and bot tokens travel in the request URL, which reqwest
/// includes in its error text.
pub(crate) fn redacted_send_error(err: reqwest_middleware::Error, secret: &str) -> SinkError {
    let text = match err {
        reqwest_middleware::Error::Reqwest(err) => err.without_url().to_string(),
        other => other.to_string(),
    };
    if secret.is_empty() {
        SinkError::Http(text)
    } else {
        SinkError::Http(text.replace(secret, "[redacted]"))
    }
}
