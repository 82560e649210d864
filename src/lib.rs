//! # influx-orm
//!
//! A small ORM for InfluxDB 1.x: describe a measurement once, then build
//! InfluxQL queries with a copy-on-write builder, write points as line
//! protocol, and delete by example.
//!
//! ## Modules
//!
//! - [`query`]: criteria, aggregations, the query builder and its execution
//! - [`model`]: schemas, typed records, line-protocol points
//! - [`client`]: the transport seam and the InfluxDB HTTP client
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use influx_orm::client::InfluxClient;
//! use influx_orm::config::Config;
//! use influx_orm::model::{FieldDef, Manager, Schema};
//! use influx_orm::query::Field;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = Arc::new(InfluxClient::new(config.influxdb)?);
//!
//!     let vehicles = Manager::new(
//!         client,
//!         Arc::new(
//!             Schema::new("vehicle")
//!                 .field(FieldDef::timestamp("time"))
//!                 .field(FieldDef::tag("name").required())
//!                 .field(FieldDef::float("speed")),
//!         ),
//!     );
//!
//!     // Write a point
//!     vehicles.create([("name", json!("car")), ("speed", json!(12.5))]).await?;
//!
//!     // Query it back
//!     let mut fast = vehicles.filter(Field::new("speed").gt(10)).order_by("name");
//!     println!("{} fast vehicles", fast.count().await?);
//!
//!     for row in fast.fetch().await? {
//!         println!("{:?} {:?}", row.time(), row.get("speed"));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod model;
pub mod query;

// Re-export top-level types for convenience
pub use client::{InfluxClient, MemoryTransport, TabularResponse, Transport, TransportError};

pub use config::{Config, ConfigError, InfluxConfig, LoggingConfig};

pub use model::{
    FieldDef, FieldKind, FieldValue, FieldValueError, Manager, Measurement, Point, Precision,
    Schema, ToPoint,
};

pub use query::{
    AggregateFunction, Aggregation, Comparison, Criteria, Field, Literal, Operator, Query,
    QueryError, QueryResult, Row,
};
