//! Query execution
//!
//! Terminal operations of a [`Query`]: running it, caching the materialized
//! rows, the `COUNT` / `SUM` shortcuts, and the write and delete paths.

use crate::client::TabularResponse;
use crate::model::{FieldValueError, Measurement, ToPoint};
use crate::query::result::{count_from_response, materialize, sum_from_response};
use crate::query::{AggregateFunction, Aggregation, Literal, Query, QueryError, QueryResult, Row};
use serde_json::Value;

impl Query {
    /// Run the rendered query and return the raw table
    pub async fn execute(&self) -> QueryResult<TabularResponse> {
        let statement = self.prepare();
        Ok(self.transport.execute_query(&statement).await?)
    }

    /// Rows of the query, executing it only on first use
    pub async fn fetch(&mut self) -> QueryResult<&[Row]> {
        let rows = match self.result_cache.take() {
            Some(rows) => rows,
            None => {
                let response = self.execute().await?;
                let rows = materialize(&response);
                response.raise_if_error()?;
                tracing::debug!(rows = rows.len(), measurement = self.measurement(), "Fetched rows");
                rows
            }
        };
        Ok(self.result_cache.insert(rows).as_slice())
    }

    /// Rows fetched so far, without executing anything
    pub fn cached(&self) -> Option<&[Row]> {
        self.result_cache.as_deref()
    }

    /// Forget fetched rows; the next fetch runs the query again
    pub fn clear_cache(&mut self) {
        self.result_cache = None;
    }

    pub async fn len(&mut self) -> QueryResult<usize> {
        Ok(self.fetch().await?.len())
    }

    pub async fn is_empty(&mut self) -> QueryResult<bool> {
        Ok(self.fetch().await?.is_empty())
    }

    /// Fetch and hand over the rows
    pub async fn into_rows(mut self) -> QueryResult<Vec<Row>> {
        self.fetch().await?;
        Ok(self.result_cache.take().unwrap_or_default())
    }

    /// Number of points matching the query.
    ///
    /// With a limit or offset set, `COUNT()` is unreliable, so the rows are
    /// fetched (and cached) and counted instead.
    pub async fn count(&mut self) -> QueryResult<u64> {
        if let Some(rows) = &self.result_cache {
            return Ok(rows.len() as u64);
        }

        if self.limit_value().is_some() || self.offset_value().is_some() {
            return Ok(self.fetch().await?.len() as u64);
        }

        let query = self.wrap_selection(AggregateFunction::Count);
        let response = query.execute().await?;
        response.raise_if_error()?;
        Ok(count_from_response(&response))
    }

    /// Alias for [`count`](Self::count)
    pub async fn total(&mut self) -> QueryResult<u64> {
        self.count().await
    }

    /// Sum of the selected field, or `0` when nothing matches
    pub async fn sum(&self) -> QueryResult<Value> {
        let query = self.wrap_selection(AggregateFunction::Sum);
        let response = query.execute().await?;
        response.raise_if_error()?;
        Ok(sum_from_response(&response))
    }

    /// Derive a query whose selection applies `function`.
    ///
    /// A single field is wrapped unless it already applies the function;
    /// otherwise `FUNC(*)` is put in front of the selection.
    fn wrap_selection(&self, function: AggregateFunction) -> Query {
        let mut query = self.derive();
        match query.selected_fields.as_mut_slice() {
            [only] => {
                if !function.applied_in(only) {
                    *only = Aggregation::wrap(function, only.as_str()).evaluate();
                }
            }
            _ => query
                .selected_fields
                .insert(0, Aggregation::new(function, "*").evaluate()),
        }
        query
    }

    /// Build a model instance from `values` and write it
    pub async fn create<K: AsRef<str>>(
        &self,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> QueryResult<Measurement> {
        let schema = self.schema.clone().ok_or(QueryError::NoModel("create"))?;
        let instance = Measurement::new(schema, values)?;
        let line = instance.to_point()?.to_line()?;
        self.transport.write_points(&line).await?;
        Ok(instance)
    }

    /// Write model instances in one request.
    ///
    /// A rendering failure names the position of the offending instance.
    pub async fn bulk_create(&self, objects: &[Measurement]) -> QueryResult<()> {
        let lines = objects
            .iter()
            .enumerate()
            .map(|(index, obj)| {
                obj.to_point()
                    .and_then(|p| p.to_line())
                    .map_err(|e| FieldValueError::InBatch {
                        index,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.write_lines(lines).await
    }

    /// Write anything that renders as a point, in one request
    pub async fn bulk_save<P: ToPoint>(&self, points: &[P]) -> QueryResult<()> {
        let lines = points
            .iter()
            .map(|p| p.to_point().and_then(|p| p.to_line()))
            .collect::<Result<Vec<_>, _>>()?;

        self.write_lines(lines).await
    }

    async fn write_lines(&self, lines: Vec<String>) -> QueryResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        tracing::debug!(points = lines.len(), "Writing points");
        self.transport.write_points(&lines.join("\n")).await?;
        Ok(())
    }

    /// Delete the points this query matches, by timestamp.
    ///
    /// Rows are fetched (or taken from the cache), narrowed to those whose
    /// columns equal every `(column, value)` pair, and one `DELETE` is issued
    /// per distinct time. Returns `false` only when the query matched nothing;
    /// it returns `true` even if `matches` filtered every row out.
    pub async fn delete<K: AsRef<str>>(&mut self, matches: &[(K, Literal)]) -> QueryResult<bool> {
        let measurement = self.measurement().to_string();
        let rows = self.fetch().await?;
        if rows.is_empty() {
            return Ok(false);
        }

        let mut times: Vec<&Value> = Vec::new();
        for row in rows {
            let selected = matches.iter().all(|(column, value)| {
                row.get(column.as_ref())
                    .map(|cell| value.matches(cell))
                    .unwrap_or(false)
            });
            if !selected {
                continue;
            }
            if let Some(time) = row.time().filter(|t| !t.is_null()) {
                if !times.contains(&time) {
                    times.push(time);
                }
            }
        }

        let statements: Vec<String> = times
            .into_iter()
            .filter_map(Literal::from_json)
            .map(|time| format!("DELETE FROM {} WHERE time={}", measurement, time.evaluate()))
            .collect();

        for statement in &statements {
            tracing::debug!(statement = %statement, "Deleting points");
            self.transport.delete_points(statement).await?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryTransport, TransportError};
    use crate::model::{FieldDef, Point, Schema};
    use crate::query::Field;
    use serde_json::json;
    use std::sync::Arc;

    fn vehicle_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("vehicle")
                .field(FieldDef::timestamp("time"))
                .field(FieldDef::tag("name").required())
                .field(FieldDef::float("speed")),
        )
    }

    fn setup() -> (Arc<MemoryTransport>, Query) {
        let transport = Arc::new(MemoryTransport::new());
        let query = Query::with_schema(transport.clone(), vehicle_schema());
        (transport, query)
    }

    fn vehicles() -> TabularResponse {
        TabularResponse::new(
            ["time", "name", "speed"],
            vec![
                vec![json!("2024-01-01T00:00:00Z"), json!("car"), json!(10)],
                vec![json!("2024-01-01T00:01:00Z"), json!("bike"), json!(4)],
                vec![json!("2024-01-01T00:01:00Z"), json!("car"), json!(12)],
            ],
        )
    }

    #[tokio::test]
    async fn test_fetch_executes_once() {
        let (transport, mut query) = setup();
        transport.push_response(vehicles());

        assert_eq!(query.fetch().await.unwrap().len(), 3);
        assert_eq!(query.len().await.unwrap(), 3);
        assert!(!query.is_empty().await.unwrap());
        assert_eq!(transport.queries().len(), 1);
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT * FROM vehicle ORDER BY time DESC"
        );
    }

    #[tokio::test]
    async fn test_clear_cache_and_derived_queries_refetch() {
        let (transport, mut query) = setup();
        transport.push_response(vehicles());
        query.fetch().await.unwrap();

        let mut derived = query.clone();
        assert!(derived.cached().is_none());
        assert!(derived.is_empty().await.unwrap());

        query.clear_cache();
        assert!(query.cached().is_none());
        query.fetch().await.unwrap();
        assert_eq!(transport.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_surfaces_store_errors() {
        let (transport, mut query) = setup();
        transport.push_response(TabularResponse::failed("error parsing query"));

        let err = query.fetch().await.unwrap_err();
        assert!(matches!(err, QueryError::Execution(ref m) if m == "error parsing query"));
        assert!(query.cached().is_none());
    }

    #[tokio::test]
    async fn test_count_wraps_single_field() {
        let (transport, query) = setup();
        transport.push_response(TabularResponse::new(["time", "count"], vec![vec![json!(0), json!(3)]]));

        let mut q = query.select(["speed"]).filter(Field::new("speed").gt(1));
        assert_eq!(q.count().await.unwrap(), 3);
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT COUNT(\"speed\") FROM vehicle WHERE \"speed\" > 1 ORDER BY time DESC"
        );
        // the receiver keeps its own selection
        assert_eq!(q.selected_fields(), ["\"speed\""]);
    }

    #[tokio::test]
    async fn test_count_prepends_count_star() {
        let (transport, query) = setup();
        transport.push_response(TabularResponse::new(
            ["time", "count_name", "count_speed"],
            vec![vec![json!(0), Value::Null, json!(7)]],
        ));

        let mut q = query.select(["name", "speed"]);
        assert_eq!(q.total().await.unwrap(), 7);
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT COUNT(*), \"name\", \"speed\" FROM vehicle ORDER BY time DESC"
        );

        let mut bare = query.all();
        bare.count().await.unwrap();
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT COUNT(*) FROM vehicle ORDER BY time DESC"
        );
    }

    #[tokio::test]
    async fn test_count_with_limit_counts_fetched_rows() {
        let (transport, query) = setup();
        transport.push_response(vehicles());

        let mut q = query.limit(3);
        assert_eq!(q.count().await.unwrap(), 3);
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT * FROM vehicle ORDER BY time DESC LIMIT 3"
        );
        assert_eq!(q.cached().map(<[Row]>::len), Some(3));

        // answered from the cache
        assert_eq!(q.count().await.unwrap(), 3);
        assert_eq!(transport.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_count_with_offset_counts_fetched_rows() {
        let (transport, query) = setup();
        transport.push_response(TabularResponse::new(
            ["time", "name", "speed"],
            vec![
                vec![json!("2024-01-01T00:01:00Z"), json!("bike"), json!(4)],
                vec![json!("2024-01-01T00:01:00Z"), json!("car"), json!(12)],
            ],
        ));

        let mut q = query.offset(1);
        assert_eq!(q.count().await.unwrap(), 2);

        let sent = transport.last_query().unwrap();
        assert_eq!(sent, "SELECT * FROM vehicle ORDER BY time DESC OFFSET 1");
        assert!(!sent.contains("COUNT("));
        assert_eq!(q.cached().map(<[Row]>::len), Some(2));
    }

    #[tokio::test]
    async fn test_count_and_sum_wrap_lookalike_columns() {
        let transport = Arc::new(MemoryTransport::new());
        let query = Query::new(transport.clone()).from_measurement("ledger");

        let mut accounts = query.select(["ACCOUNT"]);
        assert_eq!(accounts.count().await.unwrap(), 0);
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT COUNT(\"ACCOUNT\") FROM ledger ORDER BY time DESC"
        );

        query.select(["SUMMARY"]).sum().await.unwrap();
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT SUM(\"SUMMARY\") FROM ledger ORDER BY time DESC"
        );
    }

    #[tokio::test]
    async fn test_count_empty_result_is_zero() {
        let (_transport, query) = setup();
        let mut q = query.all();
        assert_eq!(q.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sum() {
        let (transport, query) = setup();
        transport.push_response(TabularResponse::new(["time", "sum"], vec![vec![json!(0), json!(26)]]));

        assert_eq!(query.select(["speed"]).sum().await.unwrap(), json!(26));
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT SUM(\"speed\") FROM vehicle ORDER BY time DESC"
        );

        // sum keeps bounds, unlike count
        assert_eq!(query.limit(1).sum().await.unwrap(), json!(0));
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT SUM(*) FROM vehicle ORDER BY time DESC LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_sum_already_summed_is_untouched() {
        let (transport, query) = setup();
        query.select([Aggregation::sum("speed")]).sum().await.unwrap();
        assert_eq!(
            transport.last_query().unwrap(),
            "SELECT SUM(\"speed\") FROM vehicle ORDER BY time DESC"
        );
    }

    #[tokio::test]
    async fn test_create_writes_one_line() {
        let (transport, query) = setup();
        let car = query
            .create([("name", json!("car")), ("speed", json!(12.5)), ("time", json!(1))])
            .await
            .unwrap();

        assert_eq!(car.measurement(), "vehicle");
        assert_eq!(transport.writes(), ["vehicle,name=car speed=12.5 1000000000"]);
    }

    #[tokio::test]
    async fn test_create_without_model() {
        let query = Query::new(Arc::new(MemoryTransport::new()));
        let err = query.create([("speed", json!(1))]).await.unwrap_err();
        assert!(matches!(err, QueryError::NoModel(_)));
    }

    #[tokio::test]
    async fn test_bulk_create() {
        let (transport, query) = setup();
        let schema = vehicle_schema();
        let objects = vec![
            Measurement::new(schema.clone(), [("name", json!("car")), ("speed", json!(1)), ("time", json!(1))]).unwrap(),
            Measurement::new(schema.clone(), [("name", json!("bike")), ("speed", json!(2)), ("time", json!(2))]).unwrap(),
        ];

        query.bulk_create(&objects).await.unwrap();
        assert_eq!(
            transport.writes(),
            ["vehicle,name=car speed=1 1000000000\nvehicle,name=bike speed=2 2000000000"]
        );

        query.bulk_create(&[]).await.unwrap();
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_create_reports_position() {
        let (transport, query) = setup();
        let schema = vehicle_schema();
        let objects = vec![
            Measurement::new(schema.clone(), [("name", json!("car")), ("speed", json!(1))]).unwrap(),
            Measurement::new(schema.clone(), [("name", json!("bike"))]).unwrap(),
        ];

        let err = query.bulk_create(&objects).await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::FieldValue(FieldValueError::InBatch { index: 1, .. })
        ));
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_save_points() {
        let transport = Arc::new(MemoryTransport::new());
        let query = Query::new(transport.clone());
        let points = vec![
            Point::new("cpu").tag("host", "a").field("load", 0.5),
            Point::new("cpu").tag("host", "b").field("load", 1.5).timestamp(10),
        ];

        query.bulk_save(&points).await.unwrap();
        assert_eq!(transport.writes(), ["cpu,host=a load=0.5\ncpu,host=b load=1.5 10"]);

        let err = query.bulk_save(&[Point::new("cpu")]).await.unwrap_err();
        assert!(matches!(err, QueryError::FieldValue(FieldValueError::NoFields(_))));
    }

    #[tokio::test]
    async fn test_delete_with_no_rows() {
        let (transport, mut query) = setup();
        assert!(!query.delete::<&str>(&[]).await.unwrap());
        assert!(transport.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_match_dedupes_times() {
        let (transport, mut query) = setup();
        transport.push_response(vehicles());

        assert!(query.delete(&[("name", Literal::from("car"))]).await.unwrap());
        assert_eq!(
            transport.deletes(),
            [
                "DELETE FROM vehicle WHERE time='2024-01-01T00:00:00Z'",
                "DELETE FROM vehicle WHERE time='2024-01-01T00:01:00Z'",
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_without_matches_removes_every_row() {
        let (transport, mut query) = setup();
        transport.push_response(TabularResponse::new(
            ["time", "speed"],
            vec![vec![json!(100), json!(1)], vec![json!(100), json!(2)], vec![json!(200), json!(3)]],
        ));

        assert!(query.delete::<&str>(&[]).await.unwrap());
        assert_eq!(
            transport.deletes(),
            ["DELETE FROM vehicle WHERE time=100", "DELETE FROM vehicle WHERE time=200"]
        );
    }

    #[tokio::test]
    async fn test_delete_returns_true_when_matches_filter_everything() {
        let (transport, mut query) = setup();
        transport.push_response(vehicles());

        let deleted = query.delete(&[("name", Literal::from("plane"))]).await.unwrap();
        assert!(deleted);
        assert!(transport.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_delete_uses_cached_rows() {
        let (transport, mut query) = setup();
        transport.push_response(vehicles());
        query.fetch().await.unwrap();

        query.delete(&[("speed", Literal::from(4))]).await.unwrap();
        assert_eq!(transport.queries().len(), 1);
        assert_eq!(
            transport.deletes(),
            ["DELETE FROM vehicle WHERE time='2024-01-01T00:01:00Z'"]
        );
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl crate::client::Transport for FailingTransport {
        async fn execute_query(&self, _query: &str) -> Result<TabularResponse, TransportError> {
            Err(TransportError::Unavailable)
        }

        async fn write_points(&self, _lines: &str) -> Result<(), TransportError> {
            Err(TransportError::Timeout)
        }

        async fn delete_points(&self, _statement: &str) -> Result<(), TransportError> {
            Err(TransportError::Unavailable)
        }
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let mut query = Query::with_schema(Arc::new(FailingTransport), vehicle_schema());

        assert!(matches!(
            query.fetch().await,
            Err(QueryError::Transport(TransportError::Unavailable))
        ));
        assert!(matches!(
            query.create([("name", json!("car")), ("speed", json!(1))]).await,
            Err(QueryError::Transport(TransportError::Timeout))
        ));
    }
}
