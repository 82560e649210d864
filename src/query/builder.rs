//! Copy-on-write query builder
//!
//! Every builder method takes `&self` and returns a fresh [`Query`]; the
//! receiver is never touched, so a base query can be shared by several
//! independent chains:
//!
//! ```rust,ignore
//! let base = Query::with_schema(transport, schema).filter(Field::new("speed").gt(10));
//! let fast_cars = base.filter_by([("name", "car")])?;
//! let latest = base.limit(1);
//! ```
//!
//! Derived queries copy the accumulated state but never the result cache.

use crate::client::Transport;
use crate::model::Schema;
use crate::query::{AggregateFunction, Aggregation, Argument, Criteria, Field, Literal, QueryError, QueryResult, Row};
use std::fmt;
use std::sync::Arc;

/// Measurement queried when no model is attached
pub const DEFAULT_MEASUREMENT: &str = "default";

/// Order used until `order_by` is called: newest first
pub const DEFAULT_ORDER: &str = "-time";

/// Something that can be put in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A column name, double-quoted on render
    Column(String),
    /// An expression rendered ahead of time (aggregations)
    Expression(String),
}

impl Selection {
    pub fn evaluate(&self) -> String {
        match self {
            Self::Column(name) if name == "*" => name.clone(),
            Self::Column(name) => format!("\"{}\"", name),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Self::Column(value.to_string())
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Self::Column(value)
    }
}

impl From<Field> for Selection {
    fn from(value: Field) -> Self {
        Self::Expression(value.evaluate())
    }
}

impl From<Aggregation> for Selection {
    fn from(value: Aggregation) -> Self {
        Self::Expression(value.evaluate())
    }
}

/// An InfluxQL SELECT under construction
pub struct Query {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) schema: Option<Arc<Schema>>,
    measurement: String,
    pub(crate) selected_fields: Vec<String>,
    selected_criteria: Vec<Criteria>,
    search_keys: Vec<(String, Literal)>,
    order_by: String,
    limit_value: Option<u64>,
    offset_value: Option<u64>,
    slimit_value: Option<u64>,
    soffset_value: Option<u64>,
    is_distinct: bool,
    pub(crate) result_cache: Option<Vec<Row>>,
}

impl Query {
    /// Query the default measurement, with no model attached
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            schema: None,
            measurement: DEFAULT_MEASUREMENT.to_string(),
            selected_fields: Vec::new(),
            selected_criteria: Vec::new(),
            search_keys: Vec::new(),
            order_by: DEFAULT_ORDER.to_string(),
            limit_value: None,
            offset_value: None,
            slimit_value: None,
            soffset_value: None,
            is_distinct: false,
            result_cache: None,
        }
    }

    /// Query the measurement of a model
    pub fn with_schema(transport: Arc<dyn Transport>, schema: Arc<Schema>) -> Self {
        let mut query = Self::new(transport);
        query.measurement = schema.measurement().to_string();
        query.schema = Some(schema);
        query
    }

    /// Copy everything except the result cache
    pub(crate) fn derive(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            schema: self.schema.clone(),
            measurement: self.measurement.clone(),
            selected_fields: self.selected_fields.clone(),
            selected_criteria: self.selected_criteria.clone(),
            search_keys: self.search_keys.clone(),
            order_by: self.order_by.clone(),
            limit_value: self.limit_value,
            offset_value: self.offset_value,
            slimit_value: self.slimit_value,
            soffset_value: self.soffset_value,
            is_distinct: self.is_distinct,
            result_cache: None,
        }
    }

    fn check_column(&self, name: &str) -> QueryResult<()> {
        match &self.schema {
            Some(schema) if !schema.accepts_column(name) => Err(QueryError::UnknownField {
                measurement: schema.measurement().to_string(),
                field: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    // Builder methods

    /// Read from another measurement
    pub fn from_measurement(&self, measurement: impl Into<String>) -> Query {
        let mut query = self.derive();
        query.measurement = measurement.into();
        query
    }

    /// Append columns or expressions to the SELECT list
    pub fn select<S: Into<Selection>>(&self, fields: impl IntoIterator<Item = S>) -> Query {
        let mut query = self.derive();
        query
            .selected_fields
            .extend(fields.into_iter().map(|f| f.into().evaluate()));
        query
    }

    /// Add a criterion, AND-joined with the ones already present
    pub fn filter(&self, criteria: impl Into<Criteria>) -> Query {
        let mut query = self.derive();
        query.selected_criteria.push(criteria.into());
        query
    }

    /// Add `"field" = value` criteria for each pair
    pub fn filter_by<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> QueryResult<Query>
    where
        K: AsRef<str>,
        V: Into<Literal>,
    {
        let mut query = self.derive();
        for (field, value) in pairs {
            self.check_column(field.as_ref())?;
            query
                .selected_criteria
                .push(Field::new(field.as_ref()).eq(value).into());
        }
        Ok(query)
    }

    /// Replace all criteria
    pub fn where_<C: Into<Criteria>>(&self, criteria: impl IntoIterator<Item = C>) -> Query {
        let mut query = self.derive();
        query.selected_criteria = criteria.into_iter().map(Into::into).collect();
        query
    }

    /// Add free-text keys, OR-matched against each other
    pub fn search_query<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> QueryResult<Query>
    where
        K: AsRef<str>,
        V: Into<Literal>,
    {
        let mut query = self.derive();
        for (field, value) in pairs {
            self.check_column(field.as_ref())?;
            query
                .search_keys
                .push((field.as_ref().to_string(), value.into()));
        }
        Ok(query)
    }

    // COUNT() comes back null under LIMIT/OFFSET, so setting a bound drops the selection.

    pub fn limit(&self, value: u64) -> Query {
        let mut query = self.derive();
        query.selected_fields.clear();
        query.limit_value = Some(value);
        query
    }

    pub fn offset(&self, value: u64) -> Query {
        let mut query = self.derive();
        query.selected_fields.clear();
        query.offset_value = Some(value);
        query
    }

    pub fn slimit(&self, value: u64) -> Query {
        let mut query = self.derive();
        query.selected_fields.clear();
        query.slimit_value = Some(value);
        query
    }

    pub fn soffset(&self, value: u64) -> Query {
        let mut query = self.derive();
        query.selected_fields.clear();
        query.soffset_value = Some(value);
        query
    }

    /// Wrap the only selected field in `DISTINCT(...)`.
    ///
    /// No-op unless exactly one field is selected and it is not already a
    /// COUNT or DISTINCT expression.
    pub fn distinct(&self) -> Query {
        let mut query = self.derive();
        if let [only] = query.selected_fields.as_mut_slice() {
            if !AggregateFunction::Count.applied_in(only) && !AggregateFunction::Distinct.applied_in(only) {
                *only = Aggregation::wrap(AggregateFunction::Distinct, only.as_str()).evaluate();
                query.is_distinct = true;
            }
        }
        query
    }

    /// Order by a field; a leading `-` means descending
    pub fn order_by(&self, field: impl Into<String>) -> Query {
        let mut query = self.derive();
        query.order_by = field.into();
        query
    }

    pub fn all(&self) -> Query {
        self.derive()
    }

    pub fn mean(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::mean(argument)])
    }

    pub fn median(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::median(argument)])
    }

    pub fn mode(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::mode(argument)])
    }

    pub fn spread(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::spread(argument)])
    }

    pub fn std_dev(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::std_dev(argument)])
    }

    pub fn integral(&self, argument: impl Into<Argument>) -> Query {
        self.select([Aggregation::integral(argument)])
    }

    // Accessors

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn selected_fields(&self) -> &[String] {
        &self.selected_fields
    }

    pub fn selected_criteria(&self) -> &[Criteria] {
        &self.selected_criteria
    }

    pub fn search_keys(&self) -> &[(String, Literal)] {
        &self.search_keys
    }

    pub fn order_by_value(&self) -> &str {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_value
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_value
    }

    pub fn slimit_value(&self) -> Option<u64> {
        self.slimit_value
    }

    pub fn soffset_value(&self) -> Option<u64> {
        self.soffset_value
    }

    pub fn is_distinct(&self) -> bool {
        self.is_distinct
    }

    // Rendering

    fn select_clause(&self) -> String {
        if self.selected_fields.is_empty() {
            "*".to_string()
        } else {
            self.selected_fields.join(", ")
        }
    }

    fn where_clause(&self) -> Option<String> {
        if self.selected_criteria.is_empty() && self.search_keys.is_empty() {
            return None;
        }

        let mut clause = self
            .selected_criteria
            .iter()
            .map(Criteria::evaluate)
            .collect::<Vec<_>>()
            .join(" AND ");

        if !self.search_keys.is_empty() {
            let matches: Vec<String> = self
                .search_keys
                .iter()
                .map(|(field, value)| {
                    let pattern = match value {
                        Literal::String(s) => format!("~/{}/", s),
                        Literal::Boolean(b) => (if *b { "1" } else { "0" }).to_string(),
                        other => other.evaluate(),
                    };
                    format!("\"{}\"={}", field, pattern)
                })
                .collect();

            if !clause.is_empty() {
                clause.push_str(" AND ");
            }
            clause.push_str(&format!("({})", matches.join(" OR ")));
        }

        Some(clause)
    }

    fn order_clause(&self) -> String {
        match self.order_by.strip_prefix('-') {
            Some(field) => format!("{} DESC", field),
            None => self.order_by.clone(),
        }
    }

    /// Render the query string
    pub fn prepare(&self) -> String {
        let mut query = format!("SELECT {} FROM {}", self.select_clause(), self.measurement);

        if let Some(clause) = self.where_clause() {
            query.push_str(" WHERE ");
            query.push_str(&clause);
        }

        query.push_str(" ORDER BY ");
        query.push_str(&self.order_clause());

        let bounds = [
            ("LIMIT", self.limit_value),
            ("OFFSET", self.offset_value),
            ("SLIMIT", self.slimit_value),
            ("SOFFSET", self.soffset_value),
        ];
        for (keyword, value) in bounds {
            if let Some(n) = value {
                query.push_str(&format!(" {} {}", keyword, n));
            }
        }

        tracing::debug!(query = %query, "Prepared query");
        query
    }
}

impl Clone for Query {
    fn clone(&self) -> Self {
        self.derive()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prepare())
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("measurement", &self.measurement)
            .field("selected_fields", &self.selected_fields)
            .field("selected_criteria", &self.selected_criteria)
            .field("search_keys", &self.search_keys)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit_value)
            .field("offset", &self.offset_value)
            .field("slimit", &self.slimit_value)
            .field("soffset", &self.soffset_value)
            .field("is_distinct", &self.is_distinct)
            .field("cached_rows", &self.result_cache.as_ref().map(Vec::len))
            .finish()
    }
}
