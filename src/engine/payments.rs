use rust_decimal::Decimal;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::now_ms;
use super::ledger::compute_balance;
use super::{Engine, EngineError};

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub reservation_id: Option<Ulid>,
    pub method: PaymentMethod,
    pub amount: Decimal,
    /// Defaults to USD.
    pub currency: Option<String>,
    /// Defaults to completed.
    pub status: Option<PaymentStatus>,
    /// Generated (`PAY-XXXXXXXX`) when absent; must be unique when given.
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl Engine {
    /// Record a payment against a customer's account. The customer's
    /// balance is recomputed under the customer write lock and the payment
    /// is rejected when it would overdraw it — the lock serializes
    /// concurrent payments for the same customer, so two under-balance
    /// payments can never both slip past a shared snapshot.
    pub async fn record_payment(&self, req: NewPayment) -> Result<Payment, EngineError> {
        if req.amount <= Decimal::ZERO {
            return Err(EngineError::Validation("amount must be positive"));
        }
        let currency = req.currency.unwrap_or_else(|| "USD".into());
        if currency.len() != CURRENCY_LEN {
            return Err(EngineError::Validation("currency must be a 3-letter code"));
        }
        if req.notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
        if req
            .reference
            .as_deref()
            .is_some_and(|r| r.len() > MAX_REFERENCE_LEN)
        {
            return Err(EngineError::LimitExceeded("reference too long"));
        }

        let customer = self
            .get_customer_arc(&req.customer_id)
            .ok_or(EngineError::NotFound(req.customer_id))?;
        let mut guard = customer.write_owned().await;

        if let Some(rid) = req.reservation_id {
            if !self.reservations.contains_key(&rid) {
                return Err(EngineError::NotFound(rid));
            }
        }

        let reference = match req.reference {
            Some(r) if !r.is_empty() => {
                if self.payment_refs.contains_key(&r) {
                    return Err(EngineError::AlreadyExists(r));
                }
                r
            }
            _ => Self::payment_reference(req.id),
        };

        // The over-payment guard, inside the same critical section as the
        // append below.
        let charges = self.charges_for(&guard).await;
        let summary = compute_balance(&charges, &guard.payments);
        if req.amount > summary.balance {
            return Err(EngineError::PaymentExceedsBalance {
                balance: summary.balance,
                amount: req.amount,
            });
        }

        let payment = Payment {
            id: req.id,
            customer_id: req.customer_id,
            reservation_id: req.reservation_id,
            reference: reference.clone(),
            method: req.method,
            amount: req.amount,
            currency,
            status: req.status.unwrap_or(PaymentStatus::Completed),
            notes: req.notes,
            created_at: now_ms(),
        };

        let event = Event::PaymentRecorded {
            id: payment.id,
            customer_id: req.customer_id,
            reservation_id: payment.reservation_id,
            reference: reference.clone(),
            method: payment.method,
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: payment.status,
            notes: payment.notes.clone(),
            created_at: payment.created_at,
        };
        self.wal_append(&event).await?;

        guard.payments.push(payment.clone());
        self.payment_refs.insert(reference, payment.id);
        self.notify.send(req.customer_id, &event);

        Ok(payment)
    }
}
