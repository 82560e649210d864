//! Query Engine
//!
//! Builds InfluxQL SELECT statements and runs them through a
//! [`Transport`](crate::client::Transport):
//!
//! - **Criteria**: comparison and disjunction expressions for WHERE clauses
//! - **Aggregation**: `MEAN("speed")`-style function expressions
//! - **Builder**: the copy-on-write [`Query`] and its renderer
//! - **Execution**: fetching, caching, `COUNT` / `SUM`, writes and deletes
//! - **Parser**: textual filter expressions into criteria
//!
//! # Rendered shape
//!
//! ```text
//! SELECT <fields|*> FROM <measurement>
//! [WHERE <criteria AND ...> [AND (<search OR ...>)]]
//! ORDER BY <field> [DESC]
//! [LIMIT n] [OFFSET n] [SLIMIT n] [SOFFSET n]
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use influx_orm::query::{Field, Query};
//!
//! let mut fast = Query::with_schema(transport, schema)
//!     .filter(Field::new("speed").gt(10).or(Field::new("name").eq("car")))
//!     .order_by("name")
//!     .limit(20);
//!
//! for row in fast.fetch().await? {
//!     println!("{:?}", row.get("speed"));
//! }
//! ```

mod aggregation;
mod builder;
mod criteria;
mod error;
mod execution;
pub mod parser;
pub mod result;

pub use aggregation::{AggregateFunction, Aggregation, Argument};
pub use builder::{Query, Selection, DEFAULT_MEASUREMENT, DEFAULT_ORDER};
pub use criteria::{Comparison, Criteria, Field, Literal, Operator};
pub use error::{QueryError, QueryResult};
pub use parser::{parse_assignment, parse_criteria};
pub use result::{count_from_response, materialize, sum_from_response, Row};
