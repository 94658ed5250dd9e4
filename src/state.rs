use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{current_due, Installment, LoanStatus};

/// mutable financial state of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanState {
    pub original_amount: Money,
    pub remaining_principal: Money,
    pub total_paid: Money,
    pub total_penalties: Money,
    pub status: LoanStatus,
    pub next_payment_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,
}

impl LoanState {
    /// create state for a freshly originated loan
    pub fn new(original_amount: Money) -> Self {
        Self {
            original_amount,
            remaining_principal: original_amount,
            total_paid: Money::ZERO,
            total_penalties: Money::ZERO,
            status: LoanStatus::Active,
            next_payment_date: None,
            last_payment_date: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// share of the original amount already repaid
    ///
    /// Goes negative when penalties have pushed the balance above the original
    /// amount.
    pub fn paid_fraction(&self) -> rust_decimal::Decimal {
        if self.original_amount.is_zero() {
            return rust_decimal::Decimal::ZERO;
        }
        (self.original_amount - self.remaining_principal).as_decimal()
            / self.original_amount.as_decimal()
    }

    /// record money received against the balance
    pub fn record_payment(&mut self, amount: Money, date: NaiveDate) {
        self.total_paid += amount;
        self.remaining_principal = (self.remaining_principal - amount).non_negative();
        self.last_payment_date = Some(date);
    }

    /// fold newly accrued penalties into the balance
    pub fn record_penalty(&mut self, amount: Money) {
        self.remaining_principal += amount;
        self.total_penalties += amount;
    }

    /// close the loan; nothing is owed afterwards
    pub fn close(&mut self) {
        self.status = LoanStatus::Closed;
        self.remaining_principal = Money::ZERO;
        self.next_payment_date = None;
    }

    /// point the next payment date at the earliest unpaid installment
    pub fn sync_next_payment(&mut self, installments: &[Installment]) {
        self.next_payment_date = if self.is_closed() {
            None
        } else {
            current_due(installments).map(|(_, i)| i.due_date)
        };
    }

    /// recompute Active/Overdue from the installment list
    ///
    /// Closed is terminal and is never left. Returns the previous status when it
    /// changed.
    pub fn refresh_status(
        &mut self,
        installments: &[Installment],
        today: NaiveDate,
    ) -> Option<LoanStatus> {
        if self.is_closed() {
            return None;
        }

        let old_status = self.status;
        let new_status = if !self.remaining_principal.is_positive() {
            LoanStatus::Closed
        } else if installments.iter().any(|i| i.is_overdue(today)) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        };

        if new_status == LoanStatus::Closed {
            self.close();
        } else {
            self.status = new_status;
            self.sync_next_payment(installments);
        }

        (old_status != new_status).then_some(old_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_record_payment_clamps_at_zero() {
        let mut state = LoanState::new(Money::from_major(1000));
        state.record_payment(Money::from_major(1200), date(2024, 2, 1));

        assert_eq!(state.remaining_principal, Money::ZERO);
        assert_eq!(state.total_paid, Money::from_major(1200));
        assert_eq!(state.last_payment_date, Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_paid_fraction() {
        let mut state = LoanState::new(Money::from_major(100_000));
        state.record_payment(Money::from_major(30_000), date(2024, 2, 1));
        assert_eq!(state.paid_fraction(), dec!(0.3));

        state.record_penalty(Money::from_major(40_000));
        assert!(state.paid_fraction() < dec!(0));
    }

    #[test]
    fn test_refresh_status_transitions() {
        let mut state = LoanState::new(Money::from_major(2000));
        let mut installments = vec![
            Installment::scheduled(date(2024, 2, 1), Money::from_major(1000)),
            Installment::scheduled(date(2024, 3, 1), Money::from_major(1000)),
        ];

        assert_eq!(state.refresh_status(&installments, date(2024, 2, 1)), None);
        assert_eq!(state.next_payment_date, Some(date(2024, 2, 1)));

        assert_eq!(
            state.refresh_status(&installments, date(2024, 2, 2)),
            Some(LoanStatus::Active)
        );
        assert_eq!(state.status, LoanStatus::Overdue);

        installments[0].settle(date(2024, 2, 3), Money::from_major(1000));
        state.record_payment(Money::from_major(1000), date(2024, 2, 3));
        assert_eq!(
            state.refresh_status(&installments, date(2024, 2, 3)),
            Some(LoanStatus::Overdue)
        );
        assert_eq!(state.status, LoanStatus::Active);
        assert_eq!(state.next_payment_date, Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut state = LoanState::new(Money::from_major(500));
        state.close();
        state.remaining_principal = Money::from_major(10);

        let installments = vec![Installment::scheduled(date(2024, 1, 1), Money::from_major(10))];
        assert_eq!(state.refresh_status(&installments, date(2024, 6, 1)), None);
        assert_eq!(state.status, LoanStatus::Closed);
    }
}
