pub mod span;
pub mod trace;

pub use span::{SpanAnalyzer, SpanReport, SpanThresholds};
pub use trace::{group_by_request, RequestTrace, ServiceInterval};
