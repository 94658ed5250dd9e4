/// serialization support for loans
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::Loan;
use crate::types::{EarlyPayment, Installment, LoanId, LoanStatus};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub status: LoanStatus,
    pub origination_date: NaiveDate,
    pub financial: FinancialView,
    pub payments: PaymentView,
    pub installments: Vec<InstallmentView>,
    pub early_payments: Vec<EarlyPayment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub original_amount: Money,
    pub remaining_principal: Money,
    pub total_penalties: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub total_paid: Money,
    pub last_payment_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub next_payment_amount: Option<Money>,
    pub paid_count: u32,
    pub remaining_count: u32,
    pub overdue_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub number: u32,
    pub due_date: NaiveDate,
    pub planned_amount: Money,
    pub penalty_amount: Money,
    pub amount_due: Money,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
}

impl InstallmentView {
    fn from_installment(number: u32, installment: &Installment) -> Self {
        InstallmentView {
            number,
            due_date: installment.due_date,
            planned_amount: installment.planned_amount,
            penalty_amount: installment.penalty_amount,
            amount_due: installment.amount_due(),
            paid_date: installment.paid_date,
            paid_amount: installment.paid_amount,
        }
    }
}

impl LoanView {
    /// snapshot a loan; overdue counts are taken as of `as_of`
    pub fn from_loan(loan: &Loan, as_of: NaiveDate) -> Self {
        let paid_count = loan.installments.iter().filter(|i| i.is_paid()).count() as u32;
        let overdue_count = loan.installments.iter().filter(|i| i.is_overdue(as_of)).count() as u32;

        LoanView {
            id: loan.id,
            status: loan.state.status,
            origination_date: loan.terms.origination_date,
            financial: FinancialView {
                original_amount: loan.state.original_amount,
                remaining_principal: loan.state.remaining_principal,
                total_penalties: loan.state.total_penalties,
                interest_rate: loan.terms.annual_rate,
                term_months: loan.terms.term_months,
            },
            payments: PaymentView {
                total_paid: loan.state.total_paid,
                last_payment_date: loan.state.last_payment_date,
                next_payment_date: loan.state.next_payment_date,
                next_payment_amount: loan.next_payment().map(|q| q.minimum_payment()),
                paid_count,
                remaining_count: loan.installments.len() as u32 - paid_count,
                overdue_count,
            },
            installments: loan
                .installments
                .iter()
                .zip(1..)
                .map(|(installment, number)| InstallmentView::from_installment(number, installment))
                .collect(),
            early_payments: loan.early_payments.clone(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Loan {
    pub fn view(&self, as_of: NaiveDate) -> LoanView {
        LoanView::from_loan(self, as_of)
    }

    pub fn to_json_pretty(&self, as_of: NaiveDate) -> Result<String, serde_json::Error> {
        self.view(as_of).to_json_pretty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::payments::PaymentRequest;
    use crate::types::{LoanTerms, RecalculationPolicy};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_view_after_payment() {
        let terms = LoanTerms::new(
            Money::from_major(12_000),
            Rate::from_percentage(12),
            12,
            date(2024, 1, 10),
        )
        .unwrap();
        let mut loan = Loan::originate(terms, &EngineConfig::default()).unwrap();
        let due = loan.installments[0].planned_amount;
        loan.apply_payment(&PaymentRequest {
            amount: due,
            payment_date: date(2024, 2, 10),
            policy: RecalculationPolicy::ReducePayment,
        })
        .unwrap();

        let view = LoanView::from_loan(&loan, date(2024, 4, 1));
        assert_eq!(view.payments.paid_count, 1);
        assert_eq!(view.payments.remaining_count, 11);
        assert_eq!(view.payments.overdue_count, 1);
        assert_eq!(view.payments.next_payment_date, Some(date(2024, 3, 10)));
        assert_eq!(view.installments[0].number, 1);
        assert_eq!(view.installments[0].paid_amount, Some(due));
        assert_eq!(view.financial.remaining_principal, Money::from_major(12_000) - due);
    }

    #[test]
    fn test_json_uses_string_decimals() {
        let terms = LoanTerms::new(
            Money::from_major(10_000),
            Rate::from_percentage(10),
            6,
            date(2024, 1, 1),
        )
        .unwrap();
        let loan = Loan::originate(terms, &EngineConfig::default()).unwrap();

        let json = loan.to_json_pretty(date(2024, 1, 1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "Active");
        assert_eq!(value["financial"]["term_months"], 6);
        assert!(value["financial"]["original_amount"].is_string());
        assert_eq!(value["installments"].as_array().map(Vec::len), Some(6));
    }
}
