use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// fixed monthly payment that amortizes `principal` over `term_months`
///
/// `A = P * r * (1 + r)^n / ((1 + r)^n - 1)` with `r` the monthly rate, or a
/// straight split when the rate is zero. The result keeps full decimal
/// precision; callers round when they turn it into an installment.
pub fn compute_monthly_payment(principal: Money, annual_rate: Rate, term_months: u32) -> Result<Money> {
    if term_months == 0 {
        return Err(LoanError::InvalidTerm { term_months });
    }
    if !principal.is_positive() {
        return Err(LoanError::InvalidPrincipal { amount: principal });
    }
    if annual_rate.is_negative() {
        return Err(LoanError::InvalidInterestRate { rate: annual_rate });
    }

    let r = annual_rate.monthly_rate().as_decimal();
    if r.is_zero() {
        return Ok(principal / Decimal::from(term_months));
    }

    let compound = compound_factor(r, term_months)?;
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(LoanError::CalculationError {
            message: format!("rate {} too small to amortize over {} months", annual_rate, term_months),
        });
    }

    let payment = principal
        .as_decimal()
        .checked_mul(r * compound)
        .ok_or_else(|| LoanError::CalculationError {
            message: "monthly payment overflow".to_string(),
        })?
        / denominator;

    Ok(Money::from_decimal(payment))
}

/// reject a payment that can never pay the loan down
///
/// The schedule generator assumes the check already happened.
pub fn ensure_amortizable(principal: Money, annual_rate: Rate, payment: Money) -> Result<()> {
    let interest = principal * annual_rate.monthly_rate().as_decimal();
    if payment <= interest {
        return Err(LoanError::LoanNotAmortizable { payment, interest });
    }
    Ok(())
}

/// (1 + r)^n by repeated multiplication
fn compound_factor(r: Decimal, n: u32) -> Result<Decimal> {
    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..n {
        compound = compound.checked_mul(base).ok_or_else(|| LoanError::CalculationError {
            message: format!("compound factor overflow after {} periods", n),
        })?;
    }
    Ok(compound)
}
