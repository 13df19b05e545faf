use anyhow::Result;
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared::{BookingError, PaymentStatus, RefundCommand};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::Payment;

/// External refund collaborator. Unlike notifications, a refund failure is
/// surfaced to the caller — money movement must not fail silently.
#[async_trait]
pub trait RefundGateway: Send + Sync {
    async fn refund(&self, command: &RefundCommand) -> Result<()>;
}

/// Hands refund commands to the payment side over Kafka, keyed by payment
/// id so retries for one payment stay ordered.
pub struct KafkaRefundGateway {
    producer: FutureProducer,
    topic: String,
}

impl KafkaRefundGateway {
    pub fn new(producer: FutureProducer, topic: String) -> Self {
        Self { producer, topic }
    }
}

#[async_trait]
impl RefundGateway for KafkaRefundGateway {
    async fn refund(&self, command: &RefundCommand) -> Result<()> {
        let json = serde_json::to_string(command)?;
        let key = command.payment_id.to_string();
        let record = FutureRecord::to(&self.topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("failed to send refund command: {}", e))?;

        Ok(())
    }
}

/// Refund decision and dispatch for a cancelled booking. Only a COMPLETED
/// payment is refunded; an absent, pending, failed or already-refunded
/// payment is skipped without error. Returns whether a refund was sent.
pub async fn dispatch_refund(
    gateway: &dyn RefundGateway,
    payment: Option<&Payment>,
    booking_id: i32,
    reason: &str,
    bank_code: &str,
    account_number: &str,
) -> Result<bool, BookingError> {
    let Some(payment) = payment else {
        debug!("no payment found for booking {}, skipping refund", booking_id);
        return Ok(false);
    };

    if payment.status()? != PaymentStatus::Completed {
        debug!(
            "payment {} is {}, skipping refund for booking {}",
            payment.id, payment.status, booking_id
        );
        return Ok(false);
    }

    let command = RefundCommand {
        payment_id: payment.id,
        booking_id,
        amount: payment.amount.clone(),
        reason: format!("booking cancelled: {reason}"),
        bank_code: bank_code.to_string(),
        account_number: account_number.to_string(),
    };

    gateway
        .refund(&command)
        .await
        .map_err(|e| BookingError::RefundFailed(format!("{e:#}")))?;

    info!(
        "refund dispatched for payment {} of booking {}",
        payment.id, booking_id
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::sync::Mutex;

    struct RecordingGateway {
        commands: Mutex<Vec<RefundCommand>>,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RefundGateway for RecordingGateway {
        async fn refund(&self, command: &RefundCommand) -> Result<()> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl RefundGateway for FailingGateway {
        async fn refund(&self, _command: &RefundCommand) -> Result<()> {
            Err(anyhow::anyhow!("payment side unreachable"))
        }
    }

    fn payment(status: &str) -> Payment {
        Payment {
            id: 7,
            booking_id: 3,
            status: status.to_string(),
            amount: "150000".parse::<BigDecimal>().unwrap(),
        }
    }

    #[tokio::test]
    async fn completed_payment_is_refunded_exactly_once_with_bank_details() {
        let gateway = RecordingGateway::new();
        let p = payment("COMPLETED");

        let sent = dispatch_refund(&gateway, Some(&p), 3, "change of plans", "VCB", "0123456789")
            .await
            .unwrap();
        assert!(sent);

        let commands = gateway.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].payment_id, 7);
        assert_eq!(commands[0].bank_code, "VCB");
        assert_eq!(commands[0].account_number, "0123456789");
        assert_eq!(commands[0].amount, "150000".parse::<BigDecimal>().unwrap());
    }

    #[tokio::test]
    async fn missing_payment_skips_the_gateway() {
        let gateway = RecordingGateway::new();
        let sent = dispatch_refund(&gateway, None, 3, "reason", "", "")
            .await
            .unwrap();
        assert!(!sent);
        assert!(gateway.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_completed_payment_skips_the_gateway() {
        for status in ["PENDING", "FAILED", "CANCELLED", "REFUNDED"] {
            let gateway = RecordingGateway::new();
            let p = payment(status);
            let sent = dispatch_refund(&gateway, Some(&p), 3, "reason", "", "")
                .await
                .unwrap();
            assert!(!sent, "payment status {status} must not refund");
            assert!(gateway.commands.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn gateway_failures_propagate() {
        let p = payment("COMPLETED");
        let err = dispatch_refund(&FailingGateway, Some(&p), 3, "reason", "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::RefundFailed(_)));
    }
}
