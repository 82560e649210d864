//! Model entry point
//!
//! A [`Manager`] ties a schema to a transport and hands out queries for it.

use crate::client::Transport;
use crate::model::{Measurement, Schema, ToPoint};
use crate::query::{Criteria, Literal, Query, QueryResult, Selection};
use serde_json::Value;
use std::sync::Arc;

/// Starting point for every query and write on one measurement
#[derive(Clone)]
pub struct Manager {
    transport: Arc<dyn Transport>,
    schema: Arc<Schema>,
}

impl Manager {
    pub fn new(transport: Arc<dyn Transport>, schema: Arc<Schema>) -> Self {
        Self { transport, schema }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// A fresh query on the model's measurement
    pub fn query(&self) -> Query {
        Query::with_schema(Arc::clone(&self.transport), Arc::clone(&self.schema))
    }

    pub fn all(&self) -> Query {
        self.query()
    }

    pub fn filter(&self, criteria: impl Into<Criteria>) -> Query {
        self.query().filter(criteria)
    }

    pub fn filter_by<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> QueryResult<Query>
    where
        K: AsRef<str>,
        V: Into<Literal>,
    {
        self.query().filter_by(pairs)
    }

    pub fn where_<C: Into<Criteria>>(&self, criteria: impl IntoIterator<Item = C>) -> Query {
        self.query().where_(criteria)
    }

    pub fn select<S: Into<Selection>>(&self, fields: impl IntoIterator<Item = S>) -> Query {
        self.query().select(fields)
    }

    /// Build an instance without writing it
    pub fn build<K: AsRef<str>>(
        &self,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> QueryResult<Measurement> {
        Ok(Measurement::new(Arc::clone(&self.schema), values)?)
    }

    pub async fn create<K: AsRef<str>>(
        &self,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> QueryResult<Measurement> {
        self.query().create(values).await
    }

    pub async fn bulk_create(&self, objects: &[Measurement]) -> QueryResult<()> {
        self.query().bulk_create(objects).await
    }

    pub async fn bulk_save<P: ToPoint>(&self, points: &[P]) -> QueryResult<()> {
        self.query().bulk_save(points).await
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("measurement", &self.schema.measurement())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryTransport, TabularResponse};
    use crate::model::FieldDef;
    use crate::query::Field;
    use serde_json::json;

    fn setup() -> (Arc<MemoryTransport>, Manager) {
        let transport = Arc::new(MemoryTransport::new());
        let schema = Schema::new("vehicle")
            .field(FieldDef::timestamp("time"))
            .field(FieldDef::tag("name"))
            .field(FieldDef::float("speed"));
        let manager = Manager::new(transport.clone(), Arc::new(schema));
        (transport, manager)
    }

    #[test]
    fn test_queries_target_the_model() {
        let (_transport, vehicles) = setup();
        assert_eq!(vehicles.all().measurement(), "vehicle");
        assert_eq!(
            vehicles.filter(Field::new("speed").gt(10)).prepare(),
            "SELECT * FROM vehicle WHERE \"speed\" > 10 ORDER BY time DESC"
        );
        assert_eq!(
            vehicles.select(["name"]).prepare(),
            "SELECT \"name\" FROM vehicle ORDER BY time DESC"
        );
        assert!(vehicles.filter_by([("wheels", 4)]).is_err());
    }

    #[tokio::test]
    async fn test_create_and_rehydrate() {
        let (transport, vehicles) = setup();
        vehicles
            .create([("name", json!("car")), ("speed", json!(3)), ("time", json!(5))])
            .await
            .unwrap();
        assert_eq!(transport.writes(), ["vehicle,name=car speed=3 5000000000"]);

        transport.push_response(TabularResponse::new(
            ["time", "name", "speed"],
            vec![vec![json!("1970-01-01T00:00:05Z"), json!("car"), json!(3)]],
        ));
        let rows = vehicles.all().into_rows().await.unwrap();
        let car = Measurement::from_row(Arc::clone(vehicles.schema()), &rows[0]).unwrap();
        assert_eq!(car.to_json()["time"], json!(5));
        assert_eq!(car.to_json()["speed"], json!(3.0));
    }

    #[tokio::test]
    async fn test_bulk_paths() {
        let (transport, vehicles) = setup();
        let objects = vec![
            vehicles.build([("name", json!("a")), ("speed", json!(1)), ("time", json!(1))]).unwrap(),
            vehicles.build([("name", json!("b")), ("speed", json!(2)), ("time", json!(2))]).unwrap(),
        ];

        vehicles.bulk_create(&objects).await.unwrap();
        vehicles.bulk_save(&objects[..1]).await.unwrap();

        assert_eq!(
            transport.writes(),
            [
                "vehicle,name=a speed=1 1000000000\nvehicle,name=b speed=2 2000000000",
                "vehicle,name=a speed=1 1000000000",
            ]
        );
    }
}
