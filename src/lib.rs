pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod loan;
pub mod payments;
pub mod serialization;
pub mod state;
pub mod types;

// re-export key types
pub use config::{EngineConfig, LoanProduct};
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use interest::{PenaltyAccrual, PenaltyConfig, PenaltyEngine, PenaltyOutcome};
pub use loan::Loan;
pub use payments::{
    compute_monthly_payment, ensure_amortizable, generate_schedule, AmortizationSchedule,
    PaymentKind, PaymentQuote, PaymentRequest, Recalculation, RepaymentCalculator,
    RepaymentOutcome, ScheduledPayment,
};
pub use serialization::LoanView;
pub use state::LoanState;
pub use types::{EarlyPayment, Installment, LoanId, LoanStatus, LoanTerms, RecalculationPolicy};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
