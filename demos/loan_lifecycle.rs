/// loan lifecycle - origination, late payment, early repayment, payoff
use chrono::{Duration, TimeZone, Utc};
use loan_servicing_rs::{
    EngineConfig, Loan, Money, RecalculationPolicy, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let config = EngineConfig::default();
    let product = config.product("basic").ok_or("missing basic product")?;

    let mut loan = Loan::from_product(product, Money::from_major(120_000), 12, &config, &time)?;
    println!("loan {} originated on {}", loan.id, time.now().format("%Y-%m-%d"));
    for (number, installment) in loan.installments.iter().enumerate() {
        println!("  #{:>2} {} {}", number + 1, installment.due_date, installment.planned_amount);
    }

    // first installment paid on time
    controller.advance(Duration::days(31));
    let quote = loan.next_payment().ok_or("nothing due")?;
    loan.make_payment(quote.total_due, RecalculationPolicy::ReducePayment, &time)?;
    println!("\npaid {} on {}", quote.total_due, time.now().format("%Y-%m-%d"));

    // second installment late by five days
    controller.advance(Duration::days(34));
    let status = loan.update_daily_status(&time);
    println!("\nstatus on {}: {:?}", time.now().format("%Y-%m-%d"), status);
    println!("penalties so far: {}", loan.state.total_penalties);

    let quote = loan.next_payment().ok_or("nothing due")?;
    loan.make_payment(quote.total_due, RecalculationPolicy::ReducePayment, &time)?;
    println!("caught up with {}", quote.total_due);

    // early repayment shortens the schedule
    controller.advance(Duration::days(10));
    let outcome = loan.early_repayment(Money::from_major(40_000), RecalculationPolicy::ReduceTerm, &time)?;
    if let Some(recalc) = &outcome.recalculation {
        println!(
            "\nearly repayment: {} installments -> {}, new payment {}",
            recalc.old_remaining_count, recalc.new_term_months, recalc.new_monthly_payment
        );
    }

    // pay off whatever is left
    let payoff = loan.state.remaining_principal;
    loan.make_payment(payoff, RecalculationPolicy::ReducePayment, &time)?;
    println!("\npaid off {}; final status: {:?}", payoff, loan.state.status);

    println!("\n{}", loan.to_json_pretty(time.now().date_naive())?);

    for event in loan.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
