use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{Installment, LoanId};

use super::annuity::compute_monthly_payment;

/// one row of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
}

/// annuity amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub loan_id: LoanId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub start_date: NaiveDate,
    /// fixed payment, already rounded to the currency unit
    pub monthly_payment: Money,
    pub payments: Vec<ScheduledPayment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    /// generate an annuity schedule
    ///
    /// Due dates fall on `start_date` plus 1..=n calendar months. The final row
    /// takes whatever balance is left so the principal portions add up to the
    /// principal exactly. Rows after the balance reaches zero carry nothing. The caller is expected to have checked the loan is
    /// amortizable (see [`super::annuity::ensure_amortizable`]).
    pub fn generate(
        loan_id: LoanId,
        principal: Money,
        term_months: u32,
        interest_rate: Rate,
        start_date: NaiveDate,
    ) -> Result<Self> {
        let monthly_payment =
            compute_monthly_payment(principal, interest_rate, term_months)?.round_currency();
        let monthly_rate = interest_rate.monthly_rate().as_decimal();

        let mut payments = Vec::with_capacity(term_months as usize);
        let mut balance = principal;

        for month in 1..=term_months {
            let due_date = add_months(start_date, month)?;
            let interest_portion = (balance * monthly_rate).round_currency();

            // a row never takes more principal than is left
            let principal_portion = if month == term_months {
                balance
            } else {
                (monthly_payment - interest_portion).min(balance)
            };
            let payment_amount = principal_portion + interest_portion;

            let ending_balance = balance - principal_portion;

            payments.push(ScheduledPayment {
                payment_number: month,
                due_date,
                beginning_balance: balance,
                payment_amount,
                principal_portion,
                interest_portion,
                ending_balance,
            });

            balance = ending_balance;
        }

        let total_interest = payments.iter().map(|p| p.interest_portion).sum();
        let total_payment = payments.iter().map(|p| p.payment_amount).sum();

        Ok(Self {
            loan_id,
            principal,
            interest_rate,
            term_months,
            start_date,
            monthly_payment,
            payments,
            total_interest,
            total_payment,
        })
    }

    /// get payment for specific period (1-based)
    pub fn get_payment(&self, payment_number: u32) -> Option<&ScheduledPayment> {
        payment_number
            .checked_sub(1)
            .and_then(|index| self.payments.get(index as usize))
    }

    pub fn total_principal(&self) -> Money {
        self.payments.iter().map(|p| p.principal_portion).sum()
    }

    /// unpaid installments for this schedule
    pub fn installments(&self) -> Vec<Installment> {
        self.payments
            .iter()
            .map(|p| Installment::scheduled(p.due_date, p.payment_amount))
            .collect()
    }
}

/// generate the installment list for a loan
pub fn generate_schedule(
    loan_id: LoanId,
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
    start_date: NaiveDate,
) -> Result<Vec<Installment>> {
    AmortizationSchedule::generate(loan_id, principal, term_months, annual_rate, start_date)
        .map(|schedule| schedule.installments())
}

/// add calendar months, clamping to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("date overflow adding {} months to {}", months, date),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_annuity_schedule() {
        let principal = Money::from_major(500_000);
        let schedule = AmortizationSchedule::generate(
            Uuid::new_v4(),
            principal,
            12,
            Rate::from_percentage(10),
            date(2024, 1, 15),
        )
        .unwrap();

        assert_eq!(schedule.payments.len(), 12);
        assert_eq!(schedule.monthly_payment, Money::from(dec!(43957.94)));
        assert_eq!(schedule.total_principal(), principal);

        let first = &schedule.payments[0];
        assert_eq!(first.due_date, date(2024, 2, 15));
        assert_eq!(first.interest_portion, Money::from(dec!(4166.67)));
        assert_eq!(first.principal_portion, Money::from(dec!(39791.27)));

        for payment in &schedule.payments[..11] {
            assert_eq!(payment.payment_amount, schedule.monthly_payment);
        }

        let last = &schedule.payments[11];
        assert_eq!(last.due_date, date(2025, 1, 15));
        assert_eq!(last.ending_balance, Money::ZERO);
        assert_eq!(last.payment_amount, last.principal_portion + last.interest_portion);
        assert!((last.payment_amount - schedule.monthly_payment).abs() < Money::ONE);
    }

    #[test]
    fn test_zero_rate_schedule_absorbs_residual() {
        let principal = Money::from_major(1000);
        let schedule =
            AmortizationSchedule::generate(Uuid::new_v4(), principal, 3, Rate::ZERO, date(2024, 1, 1))
                .unwrap();

        let amounts: Vec<Money> = schedule.payments.iter().map(|p| p.payment_amount).collect();
        assert_eq!(
            amounts,
            vec![
                Money::from(dec!(333.33)),
                Money::from(dec!(333.33)),
                Money::from(dec!(333.34)),
            ]
        );
        assert_eq!(schedule.total_interest, Money::ZERO);
        assert_eq!(schedule.total_principal(), principal);
    }

    #[test]
    fn test_month_end_due_dates_clamp() {
        let installments = generate_schedule(
            Uuid::new_v4(),
            Money::from_major(3000),
            3,
            Rate::from_percentage(12),
            date(2024, 1, 31),
        )
        .unwrap();

        let due: Vec<NaiveDate> = installments.iter().map(|i| i.due_date).collect();
        assert_eq!(due, vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]);
        assert!(installments.iter().all(|i| !i.is_paid() && i.penalty_amount.is_zero()));
    }

    #[test]
    fn test_cents_balance_never_goes_negative() {
        let schedule = AmortizationSchedule::generate(
            Uuid::new_v4(),
            Money::from_minor(6),
            11,
            Rate::from_percent(dec!(15.5)),
            date(2024, 1, 10),
        )
        .unwrap();

        let amounts: Vec<Money> = schedule.payments.iter().map(|p| p.payment_amount).collect();
        let mut expected = vec![Money::MINOR_UNIT; 6];
        expected.extend(vec![Money::ZERO; 5]);
        assert_eq!(amounts, expected);

        assert!(schedule.payments.iter().all(|p| !p.ending_balance.is_negative()));
        assert_eq!(schedule.total_principal(), Money::from_minor(6));
        assert_eq!(schedule.payments[10].ending_balance, Money::ZERO);
    }

    #[test]
    fn test_invalid_term() {
        let result = AmortizationSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(1000),
            0,
            Rate::from_percentage(10),
            date(2024, 1, 1),
        );
        assert_eq!(result, Err(LoanError::InvalidTerm { term_months: 0 }));
    }

    #[test]
    fn test_get_payment() {
        let schedule = AmortizationSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(10_000),
            6,
            Rate::from_percentage(12),
            date(2024, 1, 1),
        )
        .unwrap();

        assert!(schedule.get_payment(0).is_none());
        assert_eq!(schedule.get_payment(1).map(|p| p.payment_number), Some(1));
        assert!(schedule.get_payment(7).is_none());
    }
}
