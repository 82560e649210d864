//! Criteria Algebra
//!
//! Deferred boolean expressions over field comparisons. Nothing here talks to
//! the store: a [`Field`] produces [`Comparison`] nodes, comparisons combine
//! into [`Criteria`] trees, and `evaluate()` renders the tree as an InfluxQL
//! condition.
//!
//! ```text
//! Field::new("speed").gt(10)                        -> "speed" > 10
//! Field::new("name").eq("car").or(Field::new("speed").lt(3))
//!                                                   -> ("name" = 'car' OR "speed" < 3)
//! ```

use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
}

impl Operator {
    /// Every operator, in declaration order
    pub fn all() -> &'static [Operator] {
        &[
            Operator::Lt,
            Operator::Lte,
            Operator::Gt,
            Operator::Gte,
            Operator::Eq,
            Operator::Ne,
        ]
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            _ => None,
        }
    }

    /// InfluxQL symbol for this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
        }
    }

    /// The logically negated operator. Applying it twice is the identity.
    pub fn invert(&self) -> Self {
        match self {
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Text, rendered single-quoted
    String(String),
    /// Integer, rendered bare
    Integer(i64),
    /// Float, rendered bare
    Float(f64),
    /// Boolean, rendered as `true` / `false`
    Boolean(bool),
}

impl Literal {
    /// Convert a raw JSON value (e.g. a cell from a fetched row)
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }

    /// Render as an InfluxQL literal.
    ///
    /// Strings are quoted verbatim: embedded single quotes are not escaped.
    pub fn evaluate(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s),
            Self::Integer(i) => i.to_string(),
            // whole floats keep their fraction so they stay floats
            Self::Float(f) => format!("{:?}", f),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// Exact equality against a raw cell value
    pub fn matches(&self, cell: &Value) -> bool {
        match self {
            Self::String(s) => cell.as_str() == Some(s.as_str()),
            Self::Integer(i) => match cell.as_i64() {
                Some(v) => v == *i,
                None => cell.as_f64() == Some(*i as f64),
            },
            Self::Float(f) => cell.as_f64() == Some(*f),
            Self::Boolean(b) => cell.as_bool() == Some(*b),
        }
    }

    /// Whether this literal is textual
    pub fn is_text(&self) -> bool {
        matches!(self, Self::String(_))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => f.write_str(&other.evaluate()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Literal {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A reference to a column or tag by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
}

impl Field {
    /// Reference a field by name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Double-quoted identifier
    pub fn evaluate(&self) -> String {
        format!("\"{}\"", self.name)
    }

    fn compare(&self, operator: Operator, value: impl Into<Literal>) -> Comparison {
        Comparison {
            field: self.clone(),
            operator,
            value: value.into(),
        }
    }

    /// `field < value`
    pub fn lt(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Lt, value)
    }

    /// `field <= value`
    pub fn lte(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Lte, value)
    }

    /// `field > value`
    pub fn gt(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Gt, value)
    }

    /// `field >= value`
    pub fn gte(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Gte, value)
    }

    /// `field = value`
    pub fn eq(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Eq, value)
    }

    /// `field != value`
    pub fn ne(&self, value: impl Into<Literal>) -> Comparison {
        self.compare(Operator::Ne, value)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A single `field <op> literal` node
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: Field,
    pub operator: Operator,
    pub value: Literal,
}

impl Comparison {
    /// Same operands, logically negated operator
    pub fn invert(&self) -> Self {
        Self {
            field: self.field.clone(),
            operator: self.operator.invert(),
            value: self.value.clone(),
        }
    }

    /// Join with another criterion into a disjunction
    pub fn or(self, other: impl Into<Criteria>) -> Criteria {
        Criteria::from(self).or(other)
    }

    /// Render as `"field" <op> literal`
    pub fn evaluate(&self) -> String {
        format!(
            "{} {} {}",
            self.field.evaluate(),
            self.operator,
            self.value.evaluate()
        )
    }
}

/// An evaluable condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Leaf comparison
    Comparison(Comparison),
    /// `(left OR right)`; chains nest instead of flattening
    Disjunction(Box<Criteria>, Box<Criteria>),
}

impl Criteria {
    /// Join with another criterion into a disjunction
    pub fn or(self, other: impl Into<Criteria>) -> Criteria {
        Criteria::Disjunction(Box::new(self), Box::new(other.into()))
    }

    /// Render the condition
    pub fn evaluate(&self) -> String {
        match self {
            Self::Comparison(c) => c.evaluate(),
            Self::Disjunction(left, right) => {
                format!("({} OR {})", left.evaluate(), right.evaluate())
            }
        }
    }
}

impl From<Comparison> for Criteria {
    fn from(value: Comparison) -> Self {
        Criteria::Comparison(value)
    }
}

impl std::fmt::Display for Criteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.evaluate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invert_is_involution() {
        for op in Operator::all() {
            assert_eq!(op.invert().invert(), *op);
            assert_ne!(op.invert(), *op);
        }
    }

    #[test]
    fn test_invert_table() {
        assert_eq!(Operator::Lt.invert(), Operator::Gte);
        assert_eq!(Operator::Lte.invert(), Operator::Gt);
        assert_eq!(Operator::Eq.invert(), Operator::Ne);
    }

    #[test]
    fn test_evaluate_numeric() {
        assert_eq!(Field::new("x").gt(3).evaluate(), "\"x\" > 3");
        assert_eq!(Field::new("x").lte(2.5).evaluate(), "\"x\" <= 2.5");
        assert_eq!(Field::new("ok").ne(true).evaluate(), "\"ok\" != true");
    }

    #[test]
    fn test_whole_float_keeps_fraction() {
        assert_eq!(Literal::Float(3.0).evaluate(), "3.0");
        assert_eq!(Field::new("x").gte(10.0).evaluate(), "\"x\" >= 10.0");
        assert_eq!(Field::new("x").gte(10).evaluate(), "\"x\" >= 10");
    }

    #[test]
    fn test_evaluate_text() {
        assert_eq!(Field::new("x").eq("a").evaluate(), "\"x\" = 'a'");
        // quotes inside text are passed through as-is
        assert_eq!(Field::new("x").eq("it's").evaluate(), "\"x\" = 'it's'");
    }

    #[test]
    fn test_invert_keeps_operands() {
        let inverted = Field::new("speed").lt(10).invert();
        assert_eq!(inverted.field.name(), "speed");
        assert_eq!(inverted.value, Literal::Integer(10));
        assert_eq!(inverted.evaluate(), "\"speed\" >= 10");
    }

    #[test]
    fn test_disjunction() {
        let c = Field::new("a").eq(1).or(Field::new("b").eq(2));
        let rendered = c.evaluate();
        assert_eq!(rendered, "(\"a\" = 1 OR \"b\" = 2)");
        assert_eq!(rendered.matches("OR").count(), 1);
        assert!(rendered.starts_with('(') && rendered.ends_with(')'));
    }

    #[test]
    fn test_disjunction_nesting() {
        let c = Field::new("a")
            .eq(1)
            .or(Field::new("b").eq(2))
            .or(Field::new("c").eq(3));
        assert_eq!(
            c.evaluate(),
            "((\"a\" = 1 OR \"b\" = 2) OR \"c\" = 3)"
        );

        let right = Field::new("b").eq(2).or(Field::new("c").eq(3));
        let c = Field::new("a").eq(1).or(right);
        assert_eq!(
            c.evaluate(),
            "(\"a\" = 1 OR (\"b\" = 2 OR \"c\" = 3))"
        );
        assert_eq!(c.evaluate().matches("OR").count(), 2);
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!(Operator::from_str(">="), Some(Operator::Gte));
        assert_eq!(Operator::from_str("<>"), Some(Operator::Ne));
        assert_eq!(Operator::from_str("=="), Some(Operator::Eq));
        assert_eq!(Operator::from_str("=~"), None);
    }

    #[test]
    fn test_literal_matches() {
        assert!(Literal::from("car").matches(&json!("car")));
        assert!(!Literal::from("car").matches(&json!(1)));
        assert!(Literal::from(3).matches(&json!(3)));
        assert!(Literal::from(3).matches(&json!(3.0)));
        assert!(Literal::from(2.5).matches(&json!(2.5)));
        assert!(Literal::from(true).matches(&json!(true)));
        assert!(!Literal::from(true).matches(&Value::Null));
    }

    #[test]
    fn test_literal_from_json() {
        assert_eq!(Literal::from_json(&json!(7)), Some(Literal::Integer(7)));
        assert_eq!(Literal::from_json(&json!(1.5)), Some(Literal::Float(1.5)));
        assert_eq!(
            Literal::from_json(&json!("2024-01-01T00:00:00Z")),
            Some(Literal::String("2024-01-01T00:00:00Z".to_string()))
        );
        assert_eq!(Literal::from_json(&Value::Null), None);
    }
}
