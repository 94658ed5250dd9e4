//! Property-based tests for schedule, penalty and repayment invariants.
//!
//! - principal portions of a schedule add up to the principal
//! - planned amounts are never negative, even for balances of a few cents
//! - accruing penalties twice on one date equals accruing once
//! - every accepted payment lowers the remaining balance
//! - reduce-term never leaves more installments than reduce-payment

use chrono::NaiveDate;
use loan_servicing_rs::{
    AmortizationSchedule, EngineConfig, Installment, Loan, LoanTerms, Money, PaymentRequest,
    PenaltyEngine, Rate, RecalculationPolicy, RepaymentCalculator, Uuid,
};
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

fn arb_principal() -> impl Strategy<Value = Money> {
    (100_000i64..=100_000_000).prop_map(Money::from_minor)
}

fn arb_rate() -> impl Strategy<Value = Rate> {
    (0u32..=3_000).prop_map(Rate::from_bps)
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..=2030, 1u32..=12, 1u32..=31).prop_map(|(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .or_else(|| NaiveDate::from_ymd_opt(y, m, 28))
            .unwrap()
    })
}

fn arb_policy() -> impl Strategy<Value = RecalculationPolicy> {
    prop_oneof![
        Just(RecalculationPolicy::ReducePayment),
        Just(RecalculationPolicy::ReduceTerm),
    ]
}

fn arb_loan() -> impl Strategy<Value = Loan> {
    (arb_principal(), arb_rate(), 1u32..=36, arb_date()).prop_map(|(principal, rate, term, start)| {
        let terms = LoanTerms::new(principal, rate, term, start).unwrap();
        Loan::originate(terms, &EngineConfig::default()).unwrap()
    })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_principal_portions_sum_to_principal(
        principal in arb_principal(),
        rate in arb_rate(),
        term in 1u32..=120,
        start in arb_date(),
    ) {
        let schedule = AmortizationSchedule::generate(Uuid::new_v4(), principal, term, rate, start).unwrap();

        prop_assert_eq!(schedule.payments.len(), term as usize);
        prop_assert_eq!(schedule.total_principal(), principal);
        prop_assert!(schedule.payments.last().unwrap().ending_balance.is_zero());

        let dates: Vec<NaiveDate> = schedule.payments.iter().map(|p| p.due_date).collect();
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_planned_amounts_never_negative(
        cents in 1i64..=10_000,
        rate in arb_rate(),
        term in 1u32..=60,
        start in arb_date(),
    ) {
        let principal = Money::from_minor(cents);
        let schedule = AmortizationSchedule::generate(Uuid::new_v4(), principal, term, rate, start).unwrap();

        prop_assert!(schedule.payments.iter().all(|p| !p.payment_amount.is_negative()));
        prop_assert!(schedule.payments.iter().all(|p| !p.ending_balance.is_negative()));
        prop_assert_eq!(schedule.total_principal(), principal);
    }

    #[test]
    fn prop_rebuilt_planned_amounts_never_negative(
        mut loan in arb_loan(),
        left_cents in 1i64..=500,
        policy in arb_policy(),
    ) {
        let quote = loan.next_payment().unwrap();
        let amount = loan.state.remaining_principal - Money::from_minor(left_cents);
        prop_assume!(amount > quote.total_due);

        loan.apply_payment(&PaymentRequest { amount, payment_date: quote.due_date, policy }).unwrap();

        prop_assert!(loan.installments.iter().all(|i| !i.planned_amount.is_negative()));
        let unpaid: Money = loan.unpaid_installments().map(|i| i.planned_amount).sum();
        prop_assert!(unpaid >= loan.state.remaining_principal);
    }

    #[test]
    fn prop_penalty_accrual_is_idempotent_per_day(
        planned in proptest::collection::vec(10_000i64..=5_000_000, 1..=12),
        start in arb_date(),
        days_late in 1i64..=400,
    ) {
        let installments: Vec<Installment> = planned
            .iter()
            .enumerate()
            .map(|(i, &minor)| {
                Installment::scheduled(start + chrono::Duration::days(30 * i as i64), Money::from_minor(minor))
            })
            .collect();
        let as_of = start + chrono::Duration::days(days_late);
        let engine = PenaltyEngine::default();

        let once = engine.accrue(&installments, as_of);
        let twice = engine.accrue(&once.installments, as_of);

        prop_assert_eq!(&twice.installments, &once.installments);
        prop_assert_eq!(twice.total_new_penalty, Money::ZERO);
        prop_assert_eq!(twice.duplicates_skipped, once.penalized.len());
    }

    #[test]
    fn prop_accepted_payments_reduce_balance(
        mut loan in arb_loan(),
        extras in proptest::collection::vec(0i64..=500_000, 1..=12),
        policy in arb_policy(),
    ) {
        for extra in extras {
            let Some(quote) = loan.next_payment() else { break };
            let before = loan.state.remaining_principal;
            let request = PaymentRequest {
                amount: quote.minimum_payment() + Money::from_minor(extra),
                payment_date: quote.due_date,
                policy,
            };

            loan.apply_payment(&request).unwrap();

            prop_assert!(loan.state.remaining_principal < before);
            prop_assert!(!loan.state.remaining_principal.is_negative());
        }
    }

    #[test]
    fn prop_reduce_term_never_longer_than_reduce_payment(
        loan in arb_loan(),
        fraction in 1u32..=99,
        early in any::<bool>(),
    ) {
        let calculator = RepaymentCalculator::new(loan.id);
        let quote = loan.next_payment().unwrap();
        let amount = if early {
            (loan.state.remaining_principal * rust_decimal::Decimal::from(fraction) / rust_decimal::Decimal::from(100))
                .round_currency()
        } else {
            quote.total_due + Money::from_major(i64::from(fraction) * 10)
        };
        prop_assume!(amount.is_positive());

        let run = |policy| {
            let request = PaymentRequest { amount, payment_date: quote.due_date, policy };
            if early {
                calculator.early_repayment(&loan.terms, &loan.state, &loan.installments, &request)
            } else {
                calculator.apply_payment(&loan.terms, &loan.state, &loan.installments, &request)
            }
        };

        let term = run(RecalculationPolicy::ReduceTerm).unwrap();
        let payment = run(RecalculationPolicy::ReducePayment).unwrap();

        prop_assert!(term.installments.len() <= payment.installments.len());
        prop_assert_eq!(term.state.remaining_principal, payment.state.remaining_principal);
    }
}
