use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::model::Stay;

/// Outcome of a best-effort notification. Attached to the primary result as
/// metadata — a failed notice never fails the operation that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeOutcome {
    pub delivered: bool,
    pub error: Option<String>,
}

impl NoticeOutcome {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
pub enum SmsError {
    MissingPhone,
    Gateway(String),
}

impl std::fmt::Display for SmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmsError::MissingPhone => write!(f, "customer phone number not available"),
            SmsError::Gateway(e) => write!(f, "sms gateway error: {e}"),
        }
    }
}

impl std::error::Error for SmsError {}

#[async_trait]
pub trait SmsClient: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<(), SmsError>;
}

/// Default client: writes the message to the log instead of a gateway.
/// Swapped for a real gateway client via `Engine` construction.
pub struct LogOnlySms;

#[async_trait]
impl SmsClient for LogOnlySms {
    async fn send(&self, to: &str, message: &str) -> Result<(), SmsError> {
        info!(to, message, "sms (log-only)");
        Ok(())
    }
}

/// Builds and sends the guest-facing reservation notices.
pub struct ReservationNotices {
    client: Arc<dyn SmsClient>,
    hotel_name: String,
}

impl ReservationNotices {
    pub fn new(client: Arc<dyn SmsClient>, hotel_name: String) -> Self {
        Self { client, hotel_name }
    }

    pub async fn booking_recorded(
        &self,
        phone: Option<&str>,
        code: &str,
        stay: &Stay,
    ) -> NoticeOutcome {
        let message = format!(
            "Welcome to {}! Your booking {} is recorded. Arrival {}, departure {}.",
            self.hotel_name, code, stay.check_in, stay.check_out
        );
        self.dispatch(phone, code, &message).await
    }

    pub async fn booking_confirmed(
        &self,
        phone: Option<&str>,
        code: &str,
        stay: &Stay,
    ) -> NoticeOutcome {
        let message = format!(
            "Your booking {} at {} is confirmed. Arrival {}, departure {}. See you soon!",
            code, self.hotel_name, stay.check_in, stay.check_out
        );
        self.dispatch(phone, code, &message).await
    }

    async fn dispatch(&self, phone: Option<&str>, code: &str, message: &str) -> NoticeOutcome {
        let Some(phone) = phone else {
            warn!(code, "sms skipped: customer has no phone number");
            return NoticeOutcome::failed(SmsError::MissingPhone.to_string());
        };
        match self.client.send(phone, message).await {
            Ok(()) => NoticeOutcome::delivered(),
            Err(e) => {
                warn!(code, error = %e, "sms send failed");
                NoticeOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSms;

    #[async_trait]
    impl SmsClient for FailingSms {
        async fn send(&self, _to: &str, _message: &str) -> Result<(), SmsError> {
            Err(SmsError::Gateway("gateway timeout".into()))
        }
    }

    fn stay() -> Stay {
        Stay::new("2024-01-01".parse().unwrap(), "2024-01-05".parse().unwrap())
    }

    #[tokio::test]
    async fn log_only_always_delivers() {
        let notices = ReservationNotices::new(Arc::new(LogOnlySms), "Test Hotel".into());
        let outcome = notices
            .booking_recorded(Some("+249912000000"), "RES-1", &stay())
            .await;
        assert!(outcome.delivered);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn missing_phone_reported_not_raised() {
        let notices = ReservationNotices::new(Arc::new(LogOnlySms), "Test Hotel".into());
        let outcome = notices.booking_confirmed(None, "RES-1", &stay()).await;
        assert!(!outcome.delivered);
        assert_eq!(
            outcome.error.as_deref(),
            Some("customer phone number not available")
        );
    }

    #[tokio::test]
    async fn gateway_failure_captured() {
        let notices = ReservationNotices::new(Arc::new(FailingSms), "Test Hotel".into());
        let outcome = notices
            .booking_recorded(Some("+249912000000"), "RES-1", &stay())
            .await;
        assert!(!outcome.delivered);
        assert!(outcome.error.unwrap().contains("gateway timeout"));
    }
}
