//! Prestamos API Library
//!
//! Backend for a small-business loan-management application: client registry,
//! loan origination under a flat simple-interest model, weekly/biweekly/monthly
//! payment collection, collector assignment, cash-register ledger, reporting
//! and session-cookie authentication.
//!
//! # Modules
//!
//! - `amortization`: flat-interest quote, schedule projection and payment
//!   classification (the core calculator).
//! - `app`: router assembly and the shared tower layers.
//! - `auth`: argon2 password hashing, DB-backed sessions, auth middleware.
//! - `config`: configuration management.
//! - `db`: database connection and pool management.
//! - `errors`: error handling types.
//! - `handlers`: HTTP handlers for clients, collectors, notes and the cash
//!   register, plus the shared `AppState`.
//! - `loan_handlers`: loan CRUD and amortization endpoints.
//! - `models`: database models and request/response types.
//! - `payment_handlers`: payment registration and corrections.
//! - `reports`: statistics and daily-collections endpoints.
//! - `storage`: transactional storage flows for loans and payments.
//! - `validation`: shared input validation helpers.

pub mod amortization;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod loan_handlers;
pub mod models;
pub mod payment_handlers;
pub mod reports;
pub mod storage;
pub mod validation;
