use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::state::LoanState;
use crate::types::{
    current_due, unpaid_count, EarlyPayment, Installment, LoanId, LoanTerms, RecalculationPolicy,
};

use super::amortization::AmortizationSchedule;
use super::PaymentRequest;

/// how a payment was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// exactly the amount due on the current installment
    Scheduled,
    /// more than due; the rest of the schedule was rebuilt
    Overpayment,
    /// cleared the remaining balance without matching the amount due
    Payoff,
    /// out-of-schedule repayment
    Early,
}

/// summary of a schedule rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recalculation {
    pub policy: RecalculationPolicy,
    pub anchor_date: NaiveDate,
    pub old_remaining_count: u32,
    pub new_term_months: u32,
    pub new_monthly_payment: Money,
}

/// result of applying money to a loan
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentOutcome {
    pub state: LoanState,
    pub installments: Vec<Installment>,
    pub kind: PaymentKind,
    pub applied_amount: Money,
    /// part of an early repayment above the balance, not taken
    pub excess: Money,
    pub required_minimum: Option<Money>,
    pub recalculation: Option<Recalculation>,
    pub early_payment: Option<EarlyPayment>,
    pub discarded_installments: usize,
}

impl RepaymentOutcome {
    pub fn closed_loan(&self) -> bool {
        self.state.is_closed()
    }
}

/// applies payments and rebuilds schedules
pub struct RepaymentCalculator {
    loan_id: LoanId,
}

impl RepaymentCalculator {
    pub fn new(loan_id: LoanId) -> Self {
        Self { loan_id }
    }

    /// apply a payment against the earliest unpaid installment
    ///
    /// Nothing passed in is modified; on error the caller keeps its old values.
    /// Anything above the remaining balance is returned as `excess`.
    pub fn apply_payment(
        &self,
        terms: &LoanTerms,
        state: &LoanState,
        installments: &[Installment],
        request: &PaymentRequest,
    ) -> Result<RepaymentOutcome> {
        validate_request(state, request.amount)?;

        let (index, due) = current_due(installments).ok_or(LoanError::NoInstallmentDue {
            status: state.status,
        })?;
        let required = due.amount_due();
        let amount = request.amount;
        let exact = amount.eq_currency(required);

        if amount < required && !exact && amount < state.remaining_principal {
            return Err(LoanError::InsufficientPayment {
                required,
                provided: amount,
                shortfall: (required - amount).round_currency(),
            });
        }

        let anchor_date = due.due_date;
        let applied_amount = amount.min(state.remaining_principal);
        let excess = amount - applied_amount;
        let mut state = state.clone();
        let mut installments = installments.to_vec();

        installments[index].settle(request.payment_date, applied_amount);
        state.record_payment(applied_amount, request.payment_date);

        let kind = if exact {
            PaymentKind::Scheduled
        } else if !state.remaining_principal.is_positive() {
            PaymentKind::Payoff
        } else {
            PaymentKind::Overpayment
        };

        let mut recalculation = None;
        let discarded_installments;

        if !state.remaining_principal.is_positive() {
            discarded_installments = close_loan(&mut state, &mut installments);
        } else if kind == PaymentKind::Overpayment {
            let remaining_count = unpaid_count(&installments);
            let (rebuilt, recalc) = self.rebuild(
                terms,
                &state,
                installments,
                request.policy,
                remaining_count,
                anchor_date,
            )?;
            discarded_installments = remaining_count;
            installments = rebuilt;
            recalculation = Some(recalc);
            state.refresh_status(&installments, request.payment_date);
        } else {
            discarded_installments = 0;
            state.refresh_status(&installments, request.payment_date);
        }

        debug!(
            loan_id = %self.loan_id,
            amount = %applied_amount,
            required = %required,
            kind = ?kind,
            remaining = %state.remaining_principal,
            "payment applied"
        );

        Ok(RepaymentOutcome {
            state,
            installments,
            kind,
            applied_amount,
            excess,
            required_minimum: Some(required),
            recalculation,
            early_payment: None,
            discarded_installments,
        })
    }

    /// apply an out-of-schedule repayment
    ///
    /// No minimum applies. Amounts above the balance are cut to the balance. All
    /// unpaid installments are replaced by a schedule built under `policy`,
    /// anchored at the last paid installment (or the origination date).
    pub fn early_repayment(
        &self,
        terms: &LoanTerms,
        state: &LoanState,
        installments: &[Installment],
        request: &PaymentRequest,
    ) -> Result<RepaymentOutcome> {
        validate_request(state, request.amount)?;

        let applied_amount = request.amount.min(state.remaining_principal);
        let excess = request.amount - applied_amount;
        let remaining_count = unpaid_count(installments);

        let mut state = state.clone();
        let mut installments = installments.to_vec();
        state.record_payment(applied_amount, request.payment_date);

        let early_payment = EarlyPayment {
            date: request.payment_date,
            amount: applied_amount,
            policy: request.policy,
        };

        let mut recalculation = None;
        let discarded_installments;

        if !state.remaining_principal.is_positive() {
            discarded_installments = close_loan(&mut state, &mut installments);
        } else {
            let anchor_date = installments
                .iter()
                .filter(|i| i.is_paid())
                .map(|i| i.due_date)
                .max()
                .unwrap_or(terms.origination_date);

            let (rebuilt, recalc) = self.rebuild(
                terms,
                &state,
                installments,
                request.policy,
                remaining_count,
                anchor_date,
            )?;
            discarded_installments = remaining_count;
            installments = rebuilt;
            recalculation = Some(recalc);
            state.refresh_status(&installments, request.payment_date);
        }

        debug!(
            loan_id = %self.loan_id,
            amount = %applied_amount,
            excess = %excess,
            policy = ?request.policy,
            remaining = %state.remaining_principal,
            "early repayment applied"
        );

        Ok(RepaymentOutcome {
            state,
            installments,
            kind: PaymentKind::Early,
            applied_amount,
            excess,
            required_minimum: None,
            recalculation,
            early_payment: Some(early_payment),
            discarded_installments,
        })
    }

    /// drop unpaid installments and regenerate them from the remaining balance
    ///
    /// The n-th new row inherits the penalty stamp of the n-th discarded row.
    fn rebuild(
        &self,
        terms: &LoanTerms,
        state: &LoanState,
        installments: Vec<Installment>,
        policy: RecalculationPolicy,
        remaining_count: usize,
        anchor_date: NaiveDate,
    ) -> Result<(Vec<Installment>, Recalculation)> {
        let old_remaining_count = u32::try_from(remaining_count.max(1)).map_err(|_| {
            LoanError::CalculationError {
                message: format!("{} remaining installments", remaining_count),
            }
        })?;

        let new_term_months = match policy {
            RecalculationPolicy::ReducePayment => old_remaining_count,
            RecalculationPolicy::ReduceTerm => reduced_term(old_remaining_count, state.paid_fraction()),
        };

        let schedule = AmortizationSchedule::generate(
            self.loan_id,
            state.remaining_principal,
            new_term_months,
            terms.annual_rate,
            anchor_date,
        )?;

        let (mut rebuilt, discarded): (Vec<Installment>, Vec<Installment>) =
            installments.into_iter().partition(|i| i.is_paid());

        // penalties already folded into the balance stay stamped on the rows
        // that replace the discarded ones, so accrual resumes from them
        let mut fresh = schedule.installments();
        for (row, old) in fresh.iter_mut().zip(&discarded) {
            row.penalty_date = old.penalty_date;
            row.penalty_amount = old.penalty_amount;
        }
        rebuilt.extend(fresh);

        debug!(
            loan_id = %self.loan_id,
            policy = ?policy,
            old_remaining_count,
            new_term_months,
            monthly_payment = %schedule.monthly_payment,
            "schedule recalculated"
        );

        Ok((
            rebuilt,
            Recalculation {
                policy,
                anchor_date,
                old_remaining_count,
                new_term_months,
                new_monthly_payment: schedule.monthly_payment,
            },
        ))
    }
}

/// number of installments left after a reduce-term repayment
///
/// `max(1, round(remaining * (1 - paid_fraction)))` with ties to even, never
/// more than `remaining`.
pub fn reduced_term(remaining_count: u32, paid_fraction: Decimal) -> u32 {
    let scaled = (Decimal::from(remaining_count) * (Decimal::ONE - paid_fraction))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    scaled
        .to_u32()
        .unwrap_or(remaining_count)
        .clamp(1, remaining_count.max(1))
}

fn validate_request(state: &LoanState, amount: Money) -> Result<()> {
    if !state.status.accepts_payment() {
        return Err(LoanError::LoanClosed);
    }
    if !amount.is_positive() {
        return Err(LoanError::InvalidPaymentAmount { amount });
    }
    Ok(())
}

/// close the loan and drop whatever is still unpaid
fn close_loan(state: &mut LoanState, installments: &mut Vec<Installment>) -> usize {
    let before = installments.len();
    installments.retain(|i| i.is_paid());
    state.close();
    before - installments.len()
}
