use crate::core::product::TestItem;
use crate::matching::engine::MatchResult;
use crate::utils::validation::sanitize;

/// Decides how test and compliance costs are charged to line items.
///
/// Called once per run with the whole batch; must return exactly one cost per
/// item, in item order.
pub trait TestCostPolicy: Send + Sync {
    /// Stable policy name, reported alongside priced output
    fn name(&self) -> &'static str;

    /// Test cost charged to each matched item
    fn assign(&self, items: &[MatchResult], tests: &[TestItem]) -> Vec<f64>;
}

/// Every item is charged the full sum of all tests.
///
/// All tests are assumed mandatory for every item of a single response.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformAggregateTestCost;

impl UniformAggregateTestCost {
    pub const NAME: &'static str = "uniform-aggregate-test-cost";
}

impl TestCostPolicy for UniformAggregateTestCost {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn assign(&self, items: &[MatchResult], tests: &[TestItem]) -> Vec<f64> {
        vec![aggregate_test_cost(tests); items.len()]
    }
}

/// Sum of all test costs, `0` for an empty set, sanitized if non-finite
#[must_use]
pub fn aggregate_test_cost(tests: &[TestItem]) -> f64 {
    sanitize(tests.iter().map(|t| t.cost).sum())
}
