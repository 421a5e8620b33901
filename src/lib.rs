// Library surface for the binary, integration tests and reuse.
pub mod achievements;
pub mod admission;
pub mod app_dirs;
pub mod config;
pub mod diff;
pub mod error;
pub mod metrics;
pub mod passages;
pub mod runtime;
pub mod session;
pub mod store;
pub mod validator;

pub use admission::{admit, Admission, RejectReason, Submission};
pub use diff::{diff, diff_prefix, ErrorReport};
pub use error::{Error, Result};
pub use metrics::{compute_result, compute_result_default, ScoringPolicy, TestResult};
pub use validator::{detect_invalid_pattern, is_plausible_human_input};
