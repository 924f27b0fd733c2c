//! Search orchestration
//!
//! [`Search`] fans IP and domain targets out over the target backends;
//! [`CompanySearch`] walks a company list one name at a time.

mod company;
mod executor;
mod models;
mod pagination;

#[cfg(test)]
mod mock;

pub use company::{CompanyOutcome, CompanySearch, DEFAULT_COMPANY_PAUSE};
pub use executor::{Search, TargetOutcome};
pub use models::{BatchOutcome, CompanyResults};
