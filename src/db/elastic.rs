//! Elasticsearch driver over the REST API.
//!
//! Search envelopes are posted to `/{index}/_search`. Writes of up to two
//! documents go one request per document; larger batches are sent as a
//! single `_bulk` NDJSON body. Document ids are the table's
//! delimiter-joined primary-key values. Deletes search first and bulk-delete
//! the hits, paging until the search is empty when no size was given.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use super::backend::{assign_ids, ConnectionStatus, TastyDb, TransactionHandle};
use crate::error::{Result, TastyError};
use crate::generators::elastic::{ElasticParam, ElasticQuery, SearchRequest};
use crate::generators::{BackendKind, GeneratedQuery};
use crate::model::{QueryCommand, Row, Schema, Table};

/// Largest batch written with one request per document.
pub const MAX_SINGLE_WRITES: usize = 2;

/// Bulk action applied to each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// Create or replace the whole document.
    Index,
    /// Merge fields into the document, creating it when missing.
    Update,
    Delete,
}

impl WriteAction {
    fn as_str(self) -> &'static str {
        match self {
            WriteAction::Index => "index",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        }
    }
}

pub struct ElasticDb {
    client: Client,
    base_url: Url,
}

impl ElasticDb {
    /// Build a client for the cluster at `url`. No request is made.
    pub fn new(url: &str) -> Result<Self> {
        let base_url = Url::parse(url)
            .map_err(|e| TastyError::config(format!("Invalid Elasticsearch URL '{}': {}", url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TastyError::config(format!("Invalid Elasticsearch URL '{}'", url)));
        }
        let client = Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    /// URL for a path under the cluster root, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TastyError::config(format!("Invalid Elasticsearch URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<JsonValue> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TastyError::Elastic {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<JsonValue> {
        let mut params = Vec::new();
        if let Some(from) = request.from {
            params.push(("from", from));
        }
        if let Some(size) = request.size {
            params.push(("size", size));
        }
        debug!(index = %request.index, body = ?request.body, "searching");
        let url = self.endpoint(&[request.index.as_str(), "_search"])?;
        self.send(self.client.post(url).query(&params).json(&request.body))
            .await
    }

    /// Send an NDJSON bulk body. With `refresh` the affected shards are
    /// refreshed before the cluster answers.
    async fn bulk(&self, body: String, refresh: bool) -> Result<JsonValue> {
        debug!(bytes = body.len(), refresh, "sending bulk request");
        let url = self.endpoint(&["_bulk"])?;
        let params: &[(&str, &str)] = if refresh { &[("refresh", "true")] } else { &[] };
        let response = self
            .send(
                self.client
                    .post(url)
                    .query(params)
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
            )
            .await?;
        match bulk_failure(&response) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    /// Write documents, returning the `_id` the cluster reported for each.
    async fn write_documents(&self, table: &Table, rows: &[Row], action: WriteAction) -> Result<Vec<JsonValue>> {
        if rows.len() > MAX_SINGLE_WRITES {
            let response = self.bulk(bulk_body(table, rows, action)?, false).await?;
            return Ok(bulk_ids(&response, action));
        }

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = table.make_id(row);
            let request = match (action, id) {
                (WriteAction::Index, Some(id)) => self
                    .client
                    .put(self.endpoint(&[table.database(), "_doc", id.as_str()])?)
                    .json(row),
                (WriteAction::Index, None) => self
                    .client
                    .post(self.endpoint(&[table.database(), "_doc"])?)
                    .json(row),
                (WriteAction::Update, Some(id)) => self
                    .client
                    .post(self.endpoint(&[table.database(), "_update", id.as_str()])?)
                    .json(&json!({"doc": row, "doc_as_upsert": true})),
                (WriteAction::Delete, Some(id)) => {
                    self.client.delete(self.endpoint(&[table.database(), "_doc", id.as_str()])?)
                }
                (_, None) => return Err(missing_id(table, action)),
            };
            let response = self.send(request).await?;
            ids.push(response.get("_id").cloned().unwrap_or(JsonValue::Null));
        }
        Ok(ids)
    }

    pub async fn create_index(&self, index: &str) -> Result<JsonValue> {
        info!(index, "creating index");
        self.send(self.client.put(self.endpoint(&[index])?)).await
    }

    pub async fn delete_index(&self, index: &str) -> Result<JsonValue> {
        info!(index, "deleting index");
        self.send(self.client.delete(self.endpoint(&[index])?)).await
    }

    /// Make recent writes visible to search.
    pub async fn refresh(&self, index: &str) -> Result<JsonValue> {
        self.send(self.client.post(self.endpoint(&[index, "_refresh"])?))
            .await
    }

    pub async fn health(&self) -> Result<JsonValue> {
        self.send(self.client.get(self.endpoint(&["_cluster", "health"])?))
            .await
    }

    /// Delete documents by the primary-key values in `rows`.
    pub async fn delete_documents(&self, table: &Table, rows: &[Row]) -> Result<Vec<JsonValue>> {
        self.write_documents(table, rows, WriteAction::Delete).await
    }

    /// Search, then delete the hits through a bulk request.
    ///
    /// A request with a size deletes that one page. Without one the search
    /// repeats, refreshing after each delete, until no unseen hit comes back.
    async fn delete_hits(&self, request: &SearchRequest) -> Result<Vec<Row>> {
        let paged = request.size.is_none();
        let mut seen = HashSet::new();
        let mut deleted = Vec::new();
        loop {
            let hits: Vec<Row> = hits_of(&self.search(request).await?)
                .into_iter()
                .filter(|hit| seen.insert(hit_key(hit)))
                .collect();
            if hits.is_empty() {
                break;
            }

            let mut body = String::new();
            for hit in &hits {
                let meta = json!({"delete": {"_index": hit.get("_index"), "_id": hit.get("_id")}});
                body.push_str(&meta.to_string());
                body.push('\n');
            }
            self.bulk(body, paged).await?;
            deleted.extend(hits);
            if !paged {
                break;
            }
        }
        debug!(index = %request.index, count = deleted.len(), "deleted hits");
        Ok(deleted)
    }

    async fn execute_query(&self, query: &ElasticQuery) -> Result<Vec<Row>> {
        match query.op {
            QueryCommand::Select => {
                let mut rows = Vec::new();
                for request in search_requests(query)? {
                    rows.extend(hits_of(&self.search(request).await?));
                }
                Ok(rows)
            }
            QueryCommand::Delete => {
                let mut rows = Vec::new();
                for request in search_requests(query)? {
                    rows.extend(self.delete_hits(request).await?);
                }
                Ok(rows)
            }
            QueryCommand::Upsert => {
                let table = Table::new(&query.table, query.primary_keys.clone(), query.fields.clone())
                    .with_database(&query.index);
                let rows = query
                    .params
                    .iter()
                    .map(|param| match param {
                        ElasticParam::Row(row) => Ok(row.clone()),
                        ElasticParam::Search(_) => {
                            Err(TastyError::generation("upsert envelope carries a search request"))
                        }
                    })
                    .collect::<Result<Vec<Row>>>()?;
                self.upsert(&table, rows, None).await
            }
        }
    }
}

fn missing_id(table: &Table, action: WriteAction) -> TastyError {
    TastyError::generation(format!(
        "{} requires primary key values for table {}",
        action.as_str(),
        table.name()
    ))
}

fn search_requests(query: &ElasticQuery) -> Result<Vec<&SearchRequest>> {
    query
        .params
        .iter()
        .map(|param| match param {
            ElasticParam::Search(request) => Ok(request),
            ElasticParam::Row(_) => Err(TastyError::generation(format!(
                "{} envelope carries a document",
                query.op.as_str()
            ))),
        })
        .collect()
}

/// NDJSON body for a bulk write: one action line, plus a source line for
/// index and update actions.
pub fn bulk_body(table: &Table, rows: &[Row], action: WriteAction) -> Result<String> {
    let mut body = String::new();
    for row in rows {
        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), JsonValue::from(table.database()));
        match table.make_id(row) {
            Some(id) => {
                meta.insert("_id".to_string(), JsonValue::from(id));
            }
            None if action != WriteAction::Index => return Err(missing_id(table, action)),
            None => {}
        }

        let mut line = serde_json::Map::new();
        line.insert(action.as_str().to_string(), JsonValue::Object(meta));
        body.push_str(&JsonValue::Object(line).to_string());
        body.push('\n');
        match action {
            WriteAction::Index => body.push_str(&JsonValue::Object(row.clone()).to_string()),
            WriteAction::Update => body.push_str(&json!({"doc": row, "doc_as_upsert": true}).to_string()),
            WriteAction::Delete => continue,
        }
        body.push('\n');
    }
    Ok(body)
}

/// `_id` of each bulk item, in request order.
fn bulk_ids(response: &JsonValue, action: WriteAction) -> Vec<JsonValue> {
    response
        .get("items")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| item[action.as_str()]["_id"].clone())
                .collect()
        })
        .unwrap_or_default()
}

/// First failed item of a bulk response that reported errors.
fn bulk_failure(response: &JsonValue) -> Option<TastyError> {
    if response.get("errors") != Some(&JsonValue::Bool(true)) {
        return None;
    }
    let failed = response
        .get("items")?
        .as_array()?
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .find(|result| result.get("error").is_some())?;
    Some(TastyError::Elastic {
        status: failed
            .get("status")
            .and_then(JsonValue::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(500),
        body: failed["error"].to_string(),
    })
}

/// The `hits.hits` array of a search response.
fn hits_of(response: &JsonValue) -> Vec<Row> {
    response["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// `index/id` of a search hit.
fn hit_key(hit: &Row) -> String {
    let part = |name: &str| hit.get(name).map(JsonValue::to_string).unwrap_or_default();
    format!("{}/{}", part("_index"), part("_id"))
}

/// Keep only the ids of rows that omitted the single primary key.
fn ids_for_missing_keys(table: &Table, rows: &[Row], ids: Vec<JsonValue>) -> Vec<JsonValue> {
    let Some(key) = table.primary_keys().first() else {
        return Vec::new();
    };
    rows.iter()
        .zip(ids)
        .filter(|(row, _)| !row.contains_key(key))
        .map(|(_, id)| id)
        .collect()
}

#[async_trait]
impl TastyDb for ElasticDb {
    fn backend_name(&self) -> &'static str {
        "Elasticsearch"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Elastic
    }

    async fn execute(
        &self,
        generated: &GeneratedQuery,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.reject_handle(handle)?;
        let queries = generated
            .as_elastic()
            .ok_or_else(|| self.unsupported("SQL statements"))?;

        let mut rows = Vec::new();
        for query in queries {
            rows.extend(self.execute_query(query).await?);
        }
        Ok(rows)
    }

    async fn upsert(
        &self,
        table: &Table,
        rows: Vec<Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.reject_handle(handle)?;
        let ids = self.write_documents(table, &rows, WriteAction::Index).await?;
        let ids = ids_for_missing_keys(table, &rows, ids);
        Ok(assign_ids(table, rows, ids))
    }

    async fn update(
        &self,
        table: &Table,
        rows: Vec<Row>,
        handle: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.reject_handle(handle)?;
        self.write_documents(table, &rows, WriteAction::Update).await?;
        Ok(rows)
    }

    /// Create the index when missing, then put the table's mapping.
    async fn put_mapping(&self, table: &Table) -> Result<JsonValue> {
        let schema = self.schema().await?;
        if !schema.database_names().contains(&table.database()) {
            self.create_index(table.database()).await?;
        }
        let body = table
            .mapping()
            .cloned()
            .unwrap_or_else(|| json!({"properties": {}}));
        info!(index = table.database(), "putting mapping");
        self.send(
            self.client
                .put(self.endpoint(&[table.database(), "_mapping"])?)
                .json(&body),
        )
        .await
    }

    async fn schema(&self) -> Result<Schema> {
        let mapping = self
            .send(self.client.get(self.endpoint(&["_mapping"])?))
            .await?;
        Ok(Schema::from_elastic_tree(&mapping))
    }

    async fn is_connected(&self) -> ConnectionStatus {
        let status = match self.client.get(self.base_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return ConnectionStatus::Connected,
            Ok(response) => match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectionStatus::AuthFailed,
                other => ConnectionStatus::Failed(format!("HTTP {}", other)),
            },
            Err(e) if e.is_timeout() => ConnectionStatus::TimedOut,
            Err(e) => ConnectionStatus::Failed(e.to_string()),
        };
        warn!(%status, "Elasticsearch connection check failed");
        status
    }

    async fn destroy(&self) -> Result<()> {
        info!(url = %self.base_url, "released Elasticsearch client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Query;
    use crate::test_utils::{elastic_movies_table, row, MockCluster, Received};
    use rstest::{fixture, rstest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[fixture]
    fn db() -> ElasticDb {
        ElasticDb::new("http://127.0.0.1:9").unwrap()
    }

    fn lines(body: &str) -> Vec<JsonValue> {
        body.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    // ===== endpoints =====

    #[rstest]
    fn test_endpoint_encodes_segments(db: ElasticDb) {
        let url = db.endpoint(&["movies", "_doc", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/movies/_doc/a%2Fb");
    }

    #[rstest]
    fn test_endpoint_keeps_base_path() {
        let db = ElasticDb::new("http://localhost:9200/es/").unwrap();
        let url = db.endpoint(&["_mapping"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/es/_mapping");
    }

    #[rstest]
    fn test_invalid_url_rejected() {
        assert!(matches!(ElasticDb::new("not a url"), Err(TastyError::Config { .. })));
    }

    // ===== bulk bodies =====

    #[rstest]
    fn test_bulk_index_body() {
        let table = elastic_movies_table();
        let rows = vec![
            row(json!({"movieid": 1, "title": "Alien"})),
            row(json!({"title": "Heat"})),
        ];

        let body = bulk_body(&table, &rows, WriteAction::Index).unwrap();

        assert!(body.ends_with('\n'));
        assert_eq!(
            lines(&body),
            vec![
                json!({"index": {"_index": "movies", "_id": "1"}}),
                json!({"movieid": 1, "title": "Alien"}),
                json!({"index": {"_index": "movies"}}),
                json!({"title": "Heat"}),
            ]
        );
    }

    #[rstest]
    fn test_bulk_update_body() {
        let table = elastic_movies_table();
        let rows = vec![row(json!({"movieid": 7, "title": "Tron"}))];

        let body = bulk_body(&table, &rows, WriteAction::Update).unwrap();

        assert_eq!(
            lines(&body),
            vec![
                json!({"update": {"_index": "movies", "_id": "7"}}),
                json!({"doc": {"movieid": 7, "title": "Tron"}, "doc_as_upsert": true}),
            ]
        );
    }

    #[rstest]
    fn test_bulk_delete_has_no_source_lines() {
        let table = elastic_movies_table();
        let rows = vec![row(json!({"movieid": 1})), row(json!({"movieid": 2}))];

        let body = bulk_body(&table, &rows, WriteAction::Delete).unwrap();

        assert_eq!(lines(&body).len(), 2);
    }

    #[rstest]
    #[case(WriteAction::Update)]
    #[case(WriteAction::Delete)]
    fn test_bulk_requires_ids_except_index(#[case] action: WriteAction) {
        let table = elastic_movies_table();
        let rows = vec![row(json!({"title": "Heat"}))];
        let err = bulk_body(&table, &rows, action).unwrap_err();
        assert!(err.to_string().contains("requires primary key values"));
    }

    #[rstest]
    fn test_composite_id_uses_delimiter() {
        let table = Table::new("data", ["a", "b"], ["c"])
            .with_database("pairs")
            .with_delimiter("|");
        let rows = vec![row(json!({"a": "x", "b": 2, "c": true}))];

        let body = bulk_body(&table, &rows, WriteAction::Index).unwrap();

        assert_eq!(lines(&body)[0], json!({"index": {"_index": "pairs", "_id": "x|2"}}));
    }

    // ===== responses =====

    #[rstest]
    fn test_hits_of() {
        let response = json!({"hits": {"total": 2, "hits": [
            {"_id": "1", "_source": {"title": "Alien"}},
            {"_id": "2", "_source": {"title": "Heat"}}
        ]}});
        let hits = hits_of(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1]["_id"], json!("2"));
        assert!(hits_of(&json!({})).is_empty());
    }

    #[rstest]
    fn test_bulk_ids_in_item_order() {
        let response = json!({"errors": false, "items": [
            {"index": {"_id": "a", "status": 201}},
            {"index": {"_id": "b", "status": 201}}
        ]});
        assert_eq!(bulk_ids(&response, WriteAction::Index), vec![json!("a"), json!("b")]);
    }

    #[rstest]
    fn test_bulk_failure_reports_first_error() {
        let response = json!({"errors": true, "items": [
            {"index": {"_id": "a", "status": 201}},
            {"index": {"_id": "b", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
        ]});
        match bulk_failure(&response) {
            Some(TastyError::Elastic { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("mapper_parsing_exception"));
            }
            other => panic!("Expected Elastic error, got {:?}", other),
        }
        assert!(bulk_failure(&json!({"errors": false, "items": []})).is_none());
    }

    #[rstest]
    fn test_ids_for_missing_keys() {
        let table = elastic_movies_table();
        let rows = vec![
            row(json!({"movieid": 1})),
            row(json!({"title": "Heat"})),
            row(json!({"title": "Tron"})),
        ];
        let ids = ids_for_missing_keys(&table, &rows, vec![json!("1"), json!("x"), json!("y")]);
        assert_eq!(ids, vec![json!("x"), json!("y")]);

        let assigned = assign_ids(&table, rows, ids);
        assert_eq!(assigned[1]["movieid"], json!("x"));
        assert_eq!(assigned[0]["movieid"], json!(1));
    }

    // ===== driver errors raised before any request =====

    #[rstest]
    #[tokio::test]
    async fn test_execute_rejects_sql(db: ElasticDb) {
        let generated = GeneratedQuery::Sql(Default::default());
        let err = db.execute(&generated, None).await.unwrap_err();
        assert!(matches!(err, TastyError::Unsupported { backend: "Elasticsearch", .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_requires_ids(db: ElasticDb) {
        let err = db
            .update(&elastic_movies_table(), vec![row(json!({"title": "Heat"}))], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("update requires primary key values"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_transactions_unsupported(db: ElasticDb) {
        let table = elastic_movies_table();
        let generated = db.generate(&Query::builder(&table).take(10).build()).unwrap();
        let err = db.execute(&generated, Some(TransactionHandle(1))).await.unwrap_err();
        assert!(matches!(err, TastyError::Unsupported { .. }));
    }

    // ===== requests against a mock cluster =====

    fn calls(received: &[Received]) -> Vec<(&str, &str)> {
        received
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str()))
            .collect()
    }

    fn hit(id: &str) -> JsonValue {
        json!({"_index": "movies", "_type": "data", "_id": id, "_source": {"movieid": id}})
    }

    #[rstest]
    #[tokio::test]
    async fn test_small_batches_write_one_document_per_request() {
        let cluster = MockCluster::start(|request| match request.method.as_str() {
            "POST" => json!({"_id": "auto-1", "result": "created"}),
            _ => json!({"_id": request.path.rsplit('/').next(), "result": "created"}),
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let rows = vec![
            row(json!({"title": "Heat"})),
            row(json!({"movieid": 2, "title": "Ran"})),
        ];

        let written = db.upsert(&elastic_movies_table(), rows, None).await.unwrap();

        let received = cluster.received();
        assert_eq!(calls(&received), [("POST", "/movies/_doc"), ("PUT", "/movies/_doc/2")]);
        assert_eq!(
            serde_json::from_str::<JsonValue>(&received[1].body).unwrap(),
            json!({"movieid": 2, "title": "Ran"})
        );
        assert_eq!(written[0]["movieid"], json!("auto-1"));
        assert_eq!(written[1]["movieid"], json!(2));
    }

    #[rstest]
    #[tokio::test]
    async fn test_larger_batches_use_one_bulk_request() {
        let cluster = MockCluster::start(|_| {
            json!({"errors": false, "items": [
                {"index": {"_id": "1", "status": 200}},
                {"index": {"_id": "auto-2", "status": 201}},
                {"index": {"_id": "3", "status": 201}}
            ]})
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let rows = vec![
            row(json!({"movieid": 1, "title": "Alien"})),
            row(json!({"title": "Heat"})),
            row(json!({"movieid": 3, "title": "Tron"})),
        ];

        let written = db.upsert(&elastic_movies_table(), rows, None).await.unwrap();

        let received = cluster.received();
        assert_eq!(calls(&received), [("POST", "/_bulk")]);
        let lines = received[0].ndjson();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], json!({"index": {"_index": "movies"}}));
        assert_eq!(written[1]["movieid"], json!("auto-2"));
        assert_eq!(written[2]["movieid"], json!(3));
    }

    #[rstest]
    #[tokio::test]
    async fn test_bulk_item_error_fails_the_write() {
        let cluster = MockCluster::start(|_| {
            json!({"errors": true, "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}},
                {"index": {"_id": "3", "status": 201}}
            ]})
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let rows = (1..=3).map(|id| row(json!({"movieid": id}))).collect();

        let err = db.upsert(&elastic_movies_table(), rows, None).await.unwrap_err();

        assert!(matches!(err, TastyError::Elastic { status: 400, .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_posts_partial_document() {
        let cluster = MockCluster::start(|_| json!({"_id": "7", "result": "updated"})).await;
        let db = ElasticDb::new(&cluster.url).unwrap();

        db.update(&elastic_movies_table(), vec![row(json!({"movieid": 7, "title": "Tron"}))], None)
            .await
            .unwrap();

        let received = cluster.received();
        assert_eq!(calls(&received), [("POST", "/movies/_update/7")]);
        assert_eq!(
            serde_json::from_str::<JsonValue>(&received[0].body).unwrap(),
            json!({"doc": {"movieid": 7, "title": "Tron"}, "doc_as_upsert": true})
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_select_posts_search_envelope() {
        let cluster = MockCluster::start(|_| json!({"hits": {"total": 1, "hits": [hit("1")]}})).await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let table = elastic_movies_table();
        let generated = db.generate(&Query::builder(&table).take(5).skip(10).build()).unwrap();

        let rows = db.execute(&generated, None).await.unwrap();

        assert_eq!(calls(&cluster.received()), [("POST", "/movies/_search?from=10&size=5")]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["_id"], json!("1"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_without_size_repeats_until_empty() {
        let searches = AtomicUsize::new(0);
        let cluster = MockCluster::start(move |request| {
            if !request.path.contains("_search") {
                return json!({"errors": false, "items": []});
            }
            let hits = match searches.fetch_add(1, Ordering::SeqCst) {
                0 => vec![hit("1"), hit("2")],
                1 => vec![hit("3")],
                _ => Vec::new(),
            };
            json!({"hits": {"hits": hits}})
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let table = elastic_movies_table();
        let generated = db.generate(&Query::builder(&table).delete().build()).unwrap();

        let deleted = db.execute(&generated, None).await.unwrap();

        let received = cluster.received();
        assert_eq!(
            calls(&received),
            [
                ("POST", "/movies/_search"),
                ("POST", "/_bulk?refresh=true"),
                ("POST", "/movies/_search"),
                ("POST", "/_bulk?refresh=true"),
                ("POST", "/movies/_search"),
            ]
        );
        assert_eq!(
            received[1].ndjson(),
            vec![
                json!({"delete": {"_index": "movies", "_id": "1"}}),
                json!({"delete": {"_index": "movies", "_id": "2"}}),
            ]
        );
        let ids: Vec<_> = deleted.iter().map(|hit| hit["_id"].clone()).collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_stops_when_hits_repeat() {
        let cluster = MockCluster::start(|request| {
            if request.path.contains("_search") {
                json!({"hits": {"hits": [hit("1")]}})
            } else {
                json!({"errors": false, "items": []})
            }
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let table = elastic_movies_table();
        let generated = db.generate(&Query::builder(&table).delete().build()).unwrap();

        let deleted = db.execute(&generated, None).await.unwrap();

        assert_eq!(cluster.received().len(), 3);
        assert_eq!(deleted.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_with_size_deletes_one_page() {
        let cluster = MockCluster::start(|request| {
            if request.path.contains("_search") {
                json!({"hits": {"hits": [hit("1"), hit("2")]}})
            } else {
                json!({"errors": false, "items": []})
            }
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();
        let table = elastic_movies_table();
        let generated = db.generate(&Query::builder(&table).delete().take(2).build()).unwrap();

        let deleted = db.execute(&generated, None).await.unwrap();

        assert_eq!(
            calls(&cluster.received()),
            [("POST", "/movies/_search?size=2"), ("POST", "/_bulk")]
        );
        assert_eq!(deleted.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_put_mapping_skips_existing_empty_index() {
        let cluster = MockCluster::start(|request| match request.path.as_str() {
            "/_mapping" => json!({"movies": {"mappings": {}}}),
            _ => json!({"acknowledged": true}),
        })
        .await;
        let db = ElasticDb::new(&cluster.url).unwrap();

        db.put_mapping(&elastic_movies_table()).await.unwrap();

        assert_eq!(
            calls(&cluster.received()),
            [("GET", "/_mapping"), ("PUT", "/movies/_mapping")]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_unreachable_cluster_is_not_connected(db: ElasticDb) {
        assert!(!db.is_connected().await.is_connected());
    }
}
