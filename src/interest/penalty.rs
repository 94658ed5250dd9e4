use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::state::LoanState;
use crate::types::{Installment, LoanStatus};

/// penalty configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// simple penalty per day overdue, applied to the planned amount
    pub daily_rate: Rate,
    /// days after the due date before penalties start
    pub grace_period_days: u32,
}

impl PenaltyConfig {
    pub fn new(daily_rate: Rate) -> Self {
        Self {
            daily_rate,
            grace_period_days: 0,
        }
    }
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self::new(Rate::from_decimal(dec!(0.01)))
    }
}

/// penalties recorded on the installment list for one as-of date
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyAccrual {
    pub installments: Vec<Installment>,
    pub total_new_penalty: Money,
    /// indices of installments whose penalty grew
    pub penalized: Vec<usize>,
    /// installments already accrued on or after the as-of date
    pub duplicates_skipped: usize,
}

/// loan after penalties have been folded into it
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyOutcome {
    pub state: LoanState,
    pub installments: Vec<Installment>,
    pub total_new_penalty: Money,
    pub penalized_count: usize,
    pub duplicates_skipped: usize,
}

/// engine for overdue installment penalties
#[derive(Debug, Clone, Default)]
pub struct PenaltyEngine {
    pub config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    /// cumulative penalty for an installment `days_overdue` days late
    pub fn calculate_penalty(&self, planned_amount: Money, days_overdue: u32) -> Money {
        let days_charged = days_overdue.saturating_sub(self.config.grace_period_days);
        if days_charged == 0 {
            return Money::ZERO;
        }
        (planned_amount * (self.config.daily_rate.as_decimal() * Decimal::from(days_charged)))
            .round_currency()
    }

    /// record penalties on unpaid installments that are past due on `as_of`
    ///
    /// The penalty kept on an installment is cumulative; only its increase counts
    /// as new. An installment already stamped with `as_of` or a later date is
    /// left alone, so repeated runs on one day accrue once.
    pub fn accrue(&self, installments: &[Installment], as_of: NaiveDate) -> PenaltyAccrual {
        let mut updated = installments.to_vec();
        let mut total_new_penalty = Money::ZERO;
        let mut penalized = Vec::new();
        let mut duplicates_skipped = 0;

        for (index, installment) in updated.iter_mut().enumerate() {
            if !installment.is_overdue(as_of) {
                continue;
            }
            if installment.penalty_date.is_some_and(|d| d >= as_of) {
                duplicates_skipped += 1;
                continue;
            }

            let days_overdue = (as_of - installment.due_date).num_days();
            let days_overdue = u32::try_from(days_overdue).unwrap_or(u32::MAX);
            let penalty = self.calculate_penalty(installment.planned_amount, days_overdue);
            let increase = penalty - installment.penalty_amount;
            if !increase.is_positive() {
                continue;
            }

            installment.penalty_amount = penalty;
            installment.penalty_date = Some(as_of);
            total_new_penalty += increase;
            penalized.push(index);
        }

        PenaltyAccrual {
            installments: updated,
            total_new_penalty,
            penalized,
            duplicates_skipped,
        }
    }

    /// accrue penalties and fold them into the loan balance
    ///
    /// New penalty is added to the remaining principal, which is then split in
    /// equal shares over every unpaid installment. A closed loan comes back
    /// unchanged.
    pub fn apply(
        &self,
        state: &LoanState,
        installments: &[Installment],
        as_of: NaiveDate,
    ) -> PenaltyOutcome {
        if state.is_closed() {
            return PenaltyOutcome {
                state: state.clone(),
                installments: installments.to_vec(),
                total_new_penalty: Money::ZERO,
                penalized_count: 0,
                duplicates_skipped: 0,
            };
        }

        let accrual = self.accrue(installments, as_of);
        let mut state = state.clone();
        let mut installments = accrual.installments;

        if accrual.total_new_penalty.is_positive() {
            state.record_penalty(accrual.total_new_penalty);
            redistribute_evenly(&mut installments, state.remaining_principal);
        }
        if !accrual.penalized.is_empty() {
            state.status = LoanStatus::Overdue;
        }
        state.sync_next_payment(&installments);

        PenaltyOutcome {
            state,
            installments,
            total_new_penalty: accrual.total_new_penalty,
            penalized_count: accrual.penalized.len(),
            duplicates_skipped: accrual.duplicates_skipped,
        }
    }
}

/// spread `balance` over the unpaid installments in equal currency amounts
///
/// The last unpaid installment takes the rounding residual.
fn redistribute_evenly(installments: &mut [Installment], balance: Money) {
    let unpaid: Vec<usize> = installments
        .iter()
        .enumerate()
        .filter(|(_, i)| !i.is_paid())
        .map(|(index, _)| index)
        .collect();

    let Some((&last, rest)) = unpaid.split_last() else {
        return;
    };

    let share = (balance / Decimal::from(unpaid.len())).round_currency();
    for &index in rest {
        installments[index].planned_amount = share;
    }
    let assigned = share * Decimal::from(rest.len());
    installments[last].planned_amount = (balance - assigned).non_negative();
}
