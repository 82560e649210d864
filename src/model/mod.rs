//! Model Layer
//!
//! Typed description of measurements and their records:
//!
//! - **Schema**: measurement name plus ordered [`FieldDef`]s
//! - **Measurement**: one record, validated against its schema
//! - **Point**: line-protocol rendering of a record
//! - **Manager**: queries and writes scoped to one schema
//!
//! # Example
//!
//! ```rust,ignore
//! use influx_orm::model::{FieldDef, Manager, Schema};
//!
//! let schema = Schema::new("vehicle")
//!     .field(FieldDef::timestamp("time"))
//!     .field(FieldDef::tag("name").required())
//!     .field(FieldDef::float("speed"));
//!
//! let vehicles = Manager::new(transport, Arc::new(schema));
//! vehicles.create([("name", json!("car")), ("speed", json!(12.5))]).await?;
//! ```

mod error;
mod field;
mod manager;
mod measurement;
mod point;
mod schema;

pub use error::FieldValueError;
pub use field::{FieldDef, FieldKind, FieldValue, Precision};
pub use manager::Manager;
pub use measurement::Measurement;
pub use point::{Point, ToPoint};
pub use schema::Schema;
