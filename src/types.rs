use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// unique identifier for a loan
pub type LoanId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// performing, nothing past due
    Active,
    /// at least one installment unpaid after its due date
    Overdue,
    /// fully repaid, terminal
    Closed,
}

impl LoanStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, LoanStatus::Closed)
    }

    /// payments are accepted while the loan is open
    pub fn accepts_payment(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }
}

/// how the remaining schedule is rebuilt after an extra payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecalculationPolicy {
    /// keep the number of installments, lower each payment
    ReducePayment,
    /// keep the payment size, shorten the schedule
    ReduceTerm,
}

/// immutable loan parameters fixed at origination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub origination_date: NaiveDate,
}

impl LoanTerms {
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        origination_date: NaiveDate,
    ) -> Result<Self> {
        let terms = Self {
            principal,
            annual_rate,
            term_months,
            origination_date,
        };
        terms.validate()?;
        Ok(terms)
    }

    /// check the shape of the loan before anything is generated from it
    pub fn validate(&self) -> Result<()> {
        if self.term_months == 0 {
            return Err(LoanError::InvalidTerm {
                term_months: self.term_months,
            });
        }
        if !self.principal.is_positive() {
            return Err(LoanError::InvalidPrincipal {
                amount: self.principal,
            });
        }
        if self.annual_rate.is_negative() {
            return Err(LoanError::InvalidInterestRate {
                rate: self.annual_rate,
            });
        }
        Ok(())
    }
}

/// one scheduled repayment of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub due_date: NaiveDate,
    pub planned_amount: Money,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
    pub penalty_date: Option<NaiveDate>,
    pub penalty_amount: Money,
}

impl Installment {
    /// new unpaid installment without penalties
    pub fn scheduled(due_date: NaiveDate, planned_amount: Money) -> Self {
        Self {
            due_date,
            planned_amount,
            paid_date: None,
            paid_amount: None,
            penalty_date: None,
            penalty_amount: Money::ZERO,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid_date.is_some()
    }

    /// unpaid and due strictly before the given date
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        !self.is_paid() && self.due_date < as_of
    }

    /// planned amount plus any penalty recorded on it
    pub fn amount_due(&self) -> Money {
        self.planned_amount + self.penalty_amount
    }

    pub(crate) fn settle(&mut self, date: NaiveDate, amount: Money) {
        self.paid_date = Some(date);
        self.paid_amount = Some(amount);
    }
}

/// repayment made outside the schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyPayment {
    pub date: NaiveDate,
    pub amount: Money,
    pub policy: RecalculationPolicy,
}

/// earliest unpaid installment, by due date
pub fn current_due(installments: &[Installment]) -> Option<(usize, &Installment)> {
    installments
        .iter()
        .enumerate()
        .filter(|(_, i)| !i.is_paid())
        .min_by_key(|(_, i)| i.due_date)
}

/// number of installments still waiting for payment
pub fn unpaid_count(installments: &[Installment]) -> usize {
    installments.iter().filter(|i| !i.is_paid()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_terms_validation() {
        let start = date(2024, 1, 1);
        assert!(LoanTerms::new(Money::from_major(1000), Rate::from_percentage(10), 12, start).is_ok());

        assert_eq!(
            LoanTerms::new(Money::from_major(1000), Rate::from_percentage(10), 0, start),
            Err(LoanError::InvalidTerm { term_months: 0 })
        );
        assert!(matches!(
            LoanTerms::new(Money::ZERO, Rate::from_percentage(10), 12, start),
            Err(LoanError::InvalidPrincipal { .. })
        ));
        assert!(matches!(
            LoanTerms::new(Money::from_major(1000), Rate::from_percent(dec!(-1)), 12, start),
            Err(LoanError::InvalidInterestRate { .. })
        ));
    }

    #[test]
    fn test_current_due_is_earliest_unpaid() {
        let mut first = Installment::scheduled(date(2024, 2, 1), Money::from_major(100));
        first.settle(date(2024, 2, 1), Money::from_major(100));
        let second = Installment::scheduled(date(2024, 3, 1), Money::from_major(100));
        let third = Installment::scheduled(date(2024, 4, 1), Money::from_major(100));

        let installments = vec![first, third, second];
        let (index, due) = current_due(&installments).unwrap();
        assert_eq!(index, 2);
        assert_eq!(due.due_date, date(2024, 3, 1));
        assert_eq!(unpaid_count(&installments), 2);
    }

    #[test]
    fn test_overdue_and_amount_due() {
        let mut installment = Installment::scheduled(date(2024, 1, 10), Money::from_major(1000));
        assert!(!installment.is_overdue(date(2024, 1, 10)));
        assert!(installment.is_overdue(date(2024, 1, 11)));

        installment.penalty_amount = Money::from_major(50);
        assert_eq!(installment.amount_due(), Money::from_major(1050));

        installment.settle(date(2024, 1, 12), Money::from_major(1050));
        assert!(!installment.is_overdue(date(2024, 2, 1)));
    }
}
