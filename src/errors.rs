use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::LoanStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("invalid term: {term_months} months")]
    InvalidTerm {
        term_months: u32,
    },

    #[error("invalid principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("insufficient payment: required {required}, provided {provided}, short by {shortfall}")]
    InsufficientPayment {
        required: Money,
        provided: Money,
        shortfall: Money,
    },

    #[error("loan not amortizable: payment {payment} does not cover interest {interest}")]
    LoanNotAmortizable {
        payment: Money,
        interest: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("loan is closed")]
    LoanClosed,

    #[error("no installment due: status is {status:?}")]
    NoInstallmentDue {
        status: LoanStatus,
    },

    #[error("amount {amount} outside product range {min}..={max}")]
    AmountOutOfRange {
        amount: Money,
        min: Money,
        max: Money,
    },

    #[error("term {term_months} outside product range {min}..={max} months")]
    TermOutOfRange {
        term_months: u32,
        min: u32,
        max: u32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
