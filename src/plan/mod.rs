// ABOUTME: Plan module: steps, structurally validated plans, plan documents and static analysis
// ABOUTME: Exports plan construction, parsing and analysis types

pub mod definition;
pub mod document;
pub mod error;
pub mod step;
pub mod validation;

pub use definition::Plan;
pub use document::{DocumentFormat, PlanDocument, PlanParser};
pub use error::{PlanError, PlanViolation};
pub use step::Step;
pub use validation::{AnalysisIssue, AnalysisReport, PlanAnalyzer};
