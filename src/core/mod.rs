//! Core business logic - framework-agnostic recurring transaction engine and persistence.

/// Storage seams and the `SeaORM`-backed ledger
pub mod ledger;
/// Catch-up processor for recurring templates
pub mod processor;
/// Recurring template persistence
pub mod recurring;
/// Occurrence stepping and due checks
pub mod schedule;
/// Periodic processing tied to user sessions
pub mod scheduler;
/// Domain types for templates and generated transactions
pub mod template;
/// Transaction persistence
pub mod transaction;
