//! Domain call sites
//!
//! One parameterized fusion engine serves every scoring domain; these
//! modules configure it per domain (band ladder, weight table, boosts,
//! brand rules) and wire up the collaborator sets.

pub mod phone;
pub mod site;

pub use phone::{PhoneAnalysis, PhoneAnalyzer};
pub use site::{SiteAnalysis, SiteAnalyzer};
