use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::PaymentKind;
use crate::types::{LoanId, LoanStatus, RecalculationPolicy};

/// all events that can be emitted for a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanOriginated {
        loan_id: LoanId,
        principal: Money,
        term_months: u32,
        origination_date: NaiveDate,
    },
    ScheduleGenerated {
        loan_id: LoanId,
        installments: u32,
        monthly_payment: Money,
        first_due_date: NaiveDate,
    },
    LoanClosed {
        loan_id: LoanId,
        final_payment: Money,
        date: NaiveDate,
    },

    // payment events
    PaymentApplied {
        loan_id: LoanId,
        amount: Money,
        kind: PaymentKind,
        remaining_principal: Money,
        date: NaiveDate,
    },
    EarlyRepaymentApplied {
        loan_id: LoanId,
        amount: Money,
        policy: RecalculationPolicy,
        remaining_principal: Money,
        date: NaiveDate,
    },
    PaymentRejected {
        loan_id: LoanId,
        provided: Money,
        required: Money,
        date: NaiveDate,
    },
    ScheduleRecalculated {
        loan_id: LoanId,
        policy: RecalculationPolicy,
        discarded: u32,
        new_term_months: u32,
        new_monthly_payment: Money,
    },

    // overdue events
    PenaltyAccrued {
        loan_id: LoanId,
        amount: Money,
        installments: u32,
        date: NaiveDate,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
