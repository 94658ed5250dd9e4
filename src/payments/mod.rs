pub mod amortization;
pub mod annuity;
pub mod repayment;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::LoanState;
use crate::types::{current_due, Installment, RecalculationPolicy};

pub use amortization::{add_months, generate_schedule, AmortizationSchedule, ScheduledPayment};
pub use annuity::{compute_monthly_payment, ensure_amortizable};
pub use repayment::{reduced_term, PaymentKind, Recalculation, RepaymentCalculator, RepaymentOutcome};

/// payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub payment_date: NaiveDate,
    /// used only when the payment exceeds the amount due
    pub policy: RecalculationPolicy,
}

/// what the borrower owes on the next installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentQuote {
    pub due_date: NaiveDate,
    pub planned_amount: Money,
    pub penalty_amount: Money,
    pub total_due: Money,
    /// the amount that would close the loan outright
    pub payoff_amount: Money,
}

impl PaymentQuote {
    /// quote the earliest unpaid installment, if the loan still has one
    pub fn next(state: &LoanState, installments: &[Installment]) -> Option<Self> {
        if state.is_closed() {
            return None;
        }
        current_due(installments).map(|(_, due)| Self {
            due_date: due.due_date,
            planned_amount: due.planned_amount,
            penalty_amount: due.penalty_amount,
            total_due: due.amount_due(),
            payoff_amount: state.remaining_principal,
        })
    }

    /// smallest payment the loan will accept right now
    pub fn minimum_payment(&self) -> Money {
        self.total_due.min(self.payoff_amount)
    }
}
