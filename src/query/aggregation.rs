//! Aggregation function wrappers
//!
//! Named InfluxQL functions applied to a field, to `*`, or to an expression
//! that is already rendered. Only text is produced here; the store does the
//! computation.

use serde::{Deserialize, Serialize};

/// Aggregation functions available in queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Mean,
    Median,
    Mode,
    Spread,
    StdDev,
    Integral,
    Distinct,
}

impl AggregateFunction {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "mean" | "avg" => Some(Self::Mean),
            "median" => Some(Self::Median),
            "mode" => Some(Self::Mode),
            "spread" => Some(Self::Spread),
            "stddev" | "std_dev" => Some(Self::StdDev),
            "integral" => Some(Self::Integral),
            "distinct" => Some(Self::Distinct),
            _ => None,
        }
    }

    /// Function name as it appears in InfluxQL
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Mean => "MEAN",
            Self::Median => "MEDIAN",
            Self::Mode => "MODE",
            Self::Spread => "SPREAD",
            Self::StdDev => "STDDEV",
            Self::Integral => "INTEGRAL",
            Self::Distinct => "DISTINCT",
        }
    }

    /// Whether an already rendered expression calls this function.
    ///
    /// Only `NAME(` counts as a call when not preceded by an identifier
    /// character, so a column such as `ACCOUNT` is not mistaken for `COUNT`.
    pub fn applied_in(&self, expression: &str) -> bool {
        let call = format!("{}(", self.name());
        expression.match_indices(&call).any(|(at, _)| {
            !expression[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        })
    }
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What an aggregation is applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// `*`
    All,
    /// A field name, double-quoted on render
    Field(String),
    /// An expression that is already rendered, inserted verbatim
    Expression(String),
}

impl Argument {
    fn evaluate(&self) -> String {
        match self {
            Self::All => "*".to_string(),
            Self::Field(name) => format!("\"{}\"", name),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        if value == "*" {
            Self::All
        } else {
            Self::Field(value.to_string())
        }
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<crate::query::Field> for Argument {
    fn from(value: crate::query::Field) -> Self {
        Self::Field(value.name().to_string())
    }
}

/// A function call expression such as `MEAN("speed")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub function: AggregateFunction,
    pub argument: Argument,
}

impl Aggregation {
    /// Apply `function` to `argument`
    pub fn new(function: AggregateFunction, argument: impl Into<Argument>) -> Self {
        Self {
            function,
            argument: argument.into(),
        }
    }

    /// Wrap an expression that is already rendered
    pub fn wrap(function: AggregateFunction, expression: impl Into<String>) -> Self {
        Self {
            function,
            argument: Argument::Expression(expression.into()),
        }
    }

    pub fn count(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Count, argument)
    }

    pub fn sum(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Sum, argument)
    }

    pub fn mean(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Mean, argument)
    }

    pub fn median(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Median, argument)
    }

    pub fn mode(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Mode, argument)
    }

    pub fn spread(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Spread, argument)
    }

    pub fn std_dev(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::StdDev, argument)
    }

    pub fn integral(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Integral, argument)
    }

    pub fn distinct(argument: impl Into<Argument>) -> Self {
        Self::new(AggregateFunction::Distinct, argument)
    }

    /// Render as `FUNC(arg)`
    pub fn evaluate(&self) -> String {
        format!("{}({})", self.function, self.argument.evaluate())
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.evaluate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_field_and_star() {
        assert_eq!(Aggregation::mean("speed").evaluate(), "MEAN(\"speed\")");
        assert_eq!(Aggregation::count("*").evaluate(), "COUNT(*)");
        assert_eq!(Aggregation::std_dev("rpm").evaluate(), "STDDEV(\"rpm\")");
        assert_eq!(Aggregation::integral("*").evaluate(), "INTEGRAL(*)");
    }

    #[test]
    fn test_wrap_rendered_expression() {
        let agg = Aggregation::wrap(AggregateFunction::Distinct, "\"name\"");
        assert_eq!(agg.evaluate(), "DISTINCT(\"name\")");

        let nested = Aggregation::wrap(AggregateFunction::Count, agg.evaluate());
        assert_eq!(nested.evaluate(), "COUNT(DISTINCT(\"name\"))");
    }

    #[test]
    fn test_applied_in() {
        assert!(AggregateFunction::Count.applied_in("COUNT(\"a\")"));
        assert!(!AggregateFunction::Count.applied_in("\"a\""));
        assert!(AggregateFunction::Distinct.applied_in("COUNT(DISTINCT(\"a\"))"));
    }

    #[test]
    fn test_applied_in_ignores_column_names() {
        assert!(!AggregateFunction::Count.applied_in("\"ACCOUNT\""));
        assert!(!AggregateFunction::Count.applied_in("ACCOUNT(\"a\")"));
        assert!(!AggregateFunction::Sum.applied_in("\"SUMMARY\""));
        assert!(!AggregateFunction::Distinct.applied_in("\"DISTINCT\""));
        assert!(AggregateFunction::Sum.applied_in("SUM(\"a\") + 1"));
    }

    #[test]
    fn test_from_str() {
        assert_eq!(AggregateFunction::from_str("stddev"), Some(AggregateFunction::StdDev));
        assert_eq!(AggregateFunction::from_str("AVG"), Some(AggregateFunction::Mean));
        assert_eq!(AggregateFunction::from_str("max"), None);
    }
}
