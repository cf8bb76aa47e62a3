use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::{date_from_ms, Payment};

/// One room's contribution to a reservation's debit, with the nightly
/// price already resolved (room type lookup, zero when the type is gone).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRoom {
    pub number: String,
    pub nightly_price: Decimal,
}

/// Snapshot of a reservation as the ledger sees it. Assembled by the
/// engine; the calculations below never touch shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationCharge {
    pub id: Ulid,
    pub code: String,
    pub check_in: NaiveDate,
    pub nights: i64,
    pub rooms: Vec<LedgerRoom>,
}

impl ReservationCharge {
    pub fn debit(&self) -> Decimal {
        let nights = Decimal::from(self.nights);
        self.rooms
            .iter()
            .map(|r| r.nightly_price * nights)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntryKind {
    Reservation,
    Payment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: LedgerEntryKind,
    pub date: NaiveDate,
    pub description: String,
    /// Room list for reservations, payment method for payments.
    pub detail: String,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Running balance after applying this entry.
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
}

/// Merge a customer's reservations (debits, dated by check-in) and
/// payments (credits, dated by creation) into one sequence ordered by
/// date ascending, ties kept in insertion order, with a running balance.
///
/// Every reservation debits regardless of status and every payment
/// credits regardless of status — the balance is always recomputed from
/// source records, never stored.
pub fn compute_ledger(
    charges: &[ReservationCharge],
    payments: &[Payment],
) -> (Vec<LedgerEntry>, Decimal) {
    enum Item<'a> {
        Charge(&'a ReservationCharge),
        Payment(&'a Payment),
    }

    let mut items: Vec<(NaiveDate, Item)> = Vec::with_capacity(charges.len() + payments.len());
    for c in charges {
        items.push((c.check_in, Item::Charge(c)));
    }
    for p in payments {
        items.push((date_from_ms(p.created_at), Item::Payment(p)));
    }
    // Stable: same-day entries keep insertion order (reservations first,
    // each list already in creation order).
    items.sort_by_key(|(date, _)| *date);

    let mut entries = Vec::with_capacity(items.len());
    let mut balance = Decimal::ZERO;
    for (date, item) in items {
        match item {
            Item::Charge(c) => {
                let debit = c.debit();
                balance += debit;
                let rooms = c
                    .rooms
                    .iter()
                    .map(|r| r.number.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                entries.push(LedgerEntry {
                    kind: LedgerEntryKind::Reservation,
                    date,
                    description: format!("Reservation {}", c.code),
                    detail: rooms,
                    debit,
                    credit: Decimal::ZERO,
                    balance,
                });
            }
            Item::Payment(p) => {
                balance -= p.amount;
                entries.push(LedgerEntry {
                    kind: LedgerEntryKind::Payment,
                    date,
                    description: format!("Payment {}", p.reference),
                    detail: p.method.as_str().to_string(),
                    debit: Decimal::ZERO,
                    credit: p.amount,
                    balance,
                });
            }
        }
    }

    (entries, balance)
}

/// The authoritative "amount owed": `total_debit − total_credit`,
/// recomputed on every call.
pub fn compute_balance(charges: &[ReservationCharge], payments: &[Payment]) -> BalanceSummary {
    let total_debit: Decimal = charges.iter().map(|c| c.debit()).sum();
    let total_credit: Decimal = payments.iter().map(|p| p.amount).sum();
    BalanceSummary {
        total_debit,
        total_credit,
        balance: total_debit - total_credit,
    }
}
