//! # deme-service
//!
//! The external surface of DEME:
//!
//! - `list_profiles`: summaries of every loaded governance profile
//! - `evaluate_options`: run all registered judges over submitted options
//! - `govern_decision`: aggregate an evaluation report into a decision
//!
//! plus `decide` (evaluate then govern) and `check_invariance`.
//!
//! Profiles and the judge registry are loaded once from [`ServiceConfig`]
//! and shared read-only behind `Arc`.

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::{ConfigError, ServiceError, ServiceResult};
pub use service::DemeService;
