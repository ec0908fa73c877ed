//! billing-engine: recurring-charge scheduling and invoice generation.
//!
//! Given a customer's billing schedule (amount, frequency, due day,
//! notification preferences, installment limits, late-fee rules), the engine
//! computes when the next charge is due, generates exactly one invoice per
//! billing cycle, tracks installment progress to completion, and computes
//! overdue surcharges. Persistence, payment capture, and reminder delivery
//! are consumed through the collaborator traits in [`store`].

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
