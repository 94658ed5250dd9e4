use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, LoanProduct};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::interest::PenaltyEngine;
use crate::payments::{
    ensure_amortizable, AmortizationSchedule, PaymentKind, PaymentQuote, PaymentRequest,
    RepaymentCalculator, RepaymentOutcome,
};
use crate::state::LoanState;
use crate::types::{EarlyPayment, Installment, LoanId, LoanStatus, LoanTerms, RecalculationPolicy};

/// a loan with its schedule and payment history
///
/// Mutations go through `&mut self`, so one handle has one writer. Callers that
/// share a loan across processes must still serialize writes per loan id.
#[derive(Debug, Clone)]
pub struct Loan {
    pub id: LoanId,
    pub terms: LoanTerms,
    pub state: LoanState,
    pub installments: Vec<Installment>,
    pub early_payments: Vec<EarlyPayment>,
    pub events: EventStore,
    penalties: PenaltyEngine,
}

impl Loan {
    /// originate a loan and generate its initial schedule
    pub fn originate(terms: LoanTerms, config: &EngineConfig) -> Result<Self> {
        terms.validate()?;

        let id = Uuid::new_v4();
        let schedule = AmortizationSchedule::generate(
            id,
            terms.principal,
            terms.term_months,
            terms.annual_rate,
            terms.origination_date,
        )?;
        ensure_amortizable(terms.principal, terms.annual_rate, schedule.monthly_payment)?;

        let installments = schedule.installments();
        let mut state = LoanState::new(terms.principal);
        state.sync_next_payment(&installments);

        let mut loan = Self {
            id,
            terms,
            state,
            installments,
            early_payments: Vec::new(),
            events: EventStore::new(),
            penalties: PenaltyEngine::new(config.penalty.clone()),
        };

        loan.events.emit(Event::LoanOriginated {
            loan_id: id,
            principal: loan.terms.principal,
            term_months: loan.terms.term_months,
            origination_date: loan.terms.origination_date,
        });
        if let Some(first) = schedule.get_payment(1) {
            loan.events.emit(Event::ScheduleGenerated {
                loan_id: id,
                installments: schedule.term_months,
                monthly_payment: schedule.monthly_payment,
                first_due_date: first.due_date,
            });
        }

        info!(
            loan_id = %id,
            principal = %loan.terms.principal,
            rate = %loan.terms.annual_rate,
            term_months = loan.terms.term_months,
            monthly_payment = %schedule.monthly_payment,
            "loan originated"
        );

        Ok(loan)
    }

    /// originate a catalog product today
    pub fn from_product(
        product: &LoanProduct,
        amount: Money,
        term_months: u32,
        config: &EngineConfig,
        time_provider: &SafeTimeProvider,
    ) -> Result<Self> {
        let today = time_provider.now().date_naive();
        let terms = product.terms(amount, term_months, today)?;
        Self::originate(terms, config)
    }

    /// rebuild a loan from persisted values
    pub fn restore(
        id: LoanId,
        terms: LoanTerms,
        state: LoanState,
        mut installments: Vec<Installment>,
        config: &EngineConfig,
    ) -> Result<Self> {
        terms.validate()?;
        installments.sort_by_key(|i| i.due_date);
        if installments.windows(2).any(|w| w[0].due_date == w[1].due_date) {
            return Err(LoanError::InvalidConfiguration {
                message: format!("loan {} has duplicate installment due dates", id),
            });
        }

        Ok(Self {
            id,
            terms,
            state,
            installments,
            early_payments: Vec::new(),
            events: EventStore::new(),
            penalties: PenaltyEngine::new(config.penalty.clone()),
        })
    }

    /// accrue penalties for today and fold them into the balance
    pub fn accrue_penalties(&mut self, time_provider: &SafeTimeProvider) -> Money {
        let today = time_provider.now().date_naive();
        self.accrue_penalties_on(today)
    }

    /// accrue penalties as of an explicit date
    pub fn accrue_penalties_on(&mut self, as_of: NaiveDate) -> Money {
        let old_status = self.state.status;
        let outcome = self.penalties.apply(&self.state, &self.installments, as_of);

        if outcome.duplicates_skipped > 0 {
            info!(
                loan_id = %self.id,
                skipped = outcome.duplicates_skipped,
                date = %as_of,
                "penalty already accrued for date"
            );
        }

        self.state = outcome.state;
        self.installments = outcome.installments;

        if outcome.total_new_penalty.is_positive() {
            self.events.emit(Event::PenaltyAccrued {
                loan_id: self.id,
                amount: outcome.total_new_penalty,
                installments: outcome.penalized_count as u32,
                date: as_of,
            });
            warn!(
                loan_id = %self.id,
                penalty = %outcome.total_new_penalty,
                remaining = %self.state.remaining_principal,
                "overdue penalty accrued"
            );
        }
        self.emit_status_change(old_status, as_of);

        outcome.total_new_penalty
    }

    /// pay against the current installment today
    pub fn make_payment(
        &mut self,
        amount: Money,
        policy: RecalculationPolicy,
        time_provider: &SafeTimeProvider,
    ) -> Result<RepaymentOutcome> {
        let request = PaymentRequest {
            amount,
            payment_date: time_provider.now().date_naive(),
            policy,
        };
        self.apply_payment(&request)
    }

    /// pay against the current installment
    pub fn apply_payment(&mut self, request: &PaymentRequest) -> Result<RepaymentOutcome> {
        let calculator = RepaymentCalculator::new(self.id);
        let outcome = match calculator.apply_payment(&self.terms, &self.state, &self.installments, request) {
            Ok(outcome) => outcome,
            Err(LoanError::InsufficientPayment { required, provided, shortfall }) => {
                warn!(
                    loan_id = %self.id,
                    required = %required,
                    provided = %provided,
                    "payment below required minimum"
                );
                self.events.emit(Event::PaymentRejected {
                    loan_id: self.id,
                    provided,
                    required,
                    date: request.payment_date,
                });
                return Err(LoanError::InsufficientPayment { required, provided, shortfall });
            }
            Err(e) => return Err(e),
        };

        self.commit(&outcome, request.payment_date);
        Ok(outcome)
    }

    /// out-of-schedule repayment today
    pub fn early_repayment(
        &mut self,
        amount: Money,
        policy: RecalculationPolicy,
        time_provider: &SafeTimeProvider,
    ) -> Result<RepaymentOutcome> {
        let request = PaymentRequest {
            amount,
            payment_date: time_provider.now().date_naive(),
            policy,
        };
        self.apply_early_repayment(&request)
    }

    /// out-of-schedule repayment
    pub fn apply_early_repayment(&mut self, request: &PaymentRequest) -> Result<RepaymentOutcome> {
        let calculator = RepaymentCalculator::new(self.id);
        let outcome =
            calculator.early_repayment(&self.terms, &self.state, &self.installments, request)?;

        if let Some(early) = &outcome.early_payment {
            self.early_payments.push(early.clone());
        }
        self.commit(&outcome, request.payment_date);
        Ok(outcome)
    }

    /// daily job: accrue penalties then refresh the status
    pub fn update_daily_status(&mut self, time_provider: &SafeTimeProvider) -> LoanStatus {
        let today = time_provider.now().date_naive();
        self.accrue_penalties_on(today);

        let old_status = self.state.status;
        self.state.refresh_status(&self.installments, today);
        self.emit_status_change(old_status, today);
        self.state.status
    }

    /// what is owed on the next installment
    pub fn next_payment(&self) -> Option<PaymentQuote> {
        PaymentQuote::next(&self.state, &self.installments)
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// installments not yet paid, in due-date order
    pub fn unpaid_installments(&self) -> impl Iterator<Item = &Installment> {
        self.installments.iter().filter(|i| !i.is_paid())
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn commit(&mut self, outcome: &RepaymentOutcome, date: NaiveDate) {
        let old_status = self.state.status;
        self.state = outcome.state.clone();
        self.installments = outcome.installments.clone();

        match outcome.kind {
            PaymentKind::Early => {
                if let Some(early) = &outcome.early_payment {
                    self.events.emit(Event::EarlyRepaymentApplied {
                        loan_id: self.id,
                        amount: early.amount,
                        policy: early.policy,
                        remaining_principal: self.state.remaining_principal,
                        date,
                    });
                }
            }
            kind => {
                self.events.emit(Event::PaymentApplied {
                    loan_id: self.id,
                    amount: outcome.applied_amount,
                    kind,
                    remaining_principal: self.state.remaining_principal,
                    date,
                });
            }
        }

        if let Some(recalc) = &outcome.recalculation {
            self.events.emit(Event::ScheduleRecalculated {
                loan_id: self.id,
                policy: recalc.policy,
                discarded: outcome.discarded_installments as u32,
                new_term_months: recalc.new_term_months,
                new_monthly_payment: recalc.new_monthly_payment,
            });
        }

        if self.state.is_closed() && old_status != LoanStatus::Closed {
            self.events.emit(Event::LoanClosed {
                loan_id: self.id,
                final_payment: outcome.applied_amount,
                date,
            });
            info!(loan_id = %self.id, total_paid = %self.state.total_paid, "loan closed");
        } else {
            self.emit_status_change(old_status, date);
        }
    }

    fn emit_status_change(&mut self, old_status: LoanStatus, date: NaiveDate) {
        if old_status != self.state.status {
            self.events.emit(Event::StatusChanged {
                loan_id: self.id,
                old_status,
                new_status: self.state.status,
                date,
            });
        }
    }
}
