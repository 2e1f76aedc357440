//! Shared test utilities for generator, driver and command tests.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::db::{DatabaseConfig, SqliteDb, TastyDb};
use crate::model::{Row, Table};

/// Create a temporary file containing the given content.
///
/// Used for query documents and config files.
pub fn create_temp_json_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// `movies` table keyed by `movieID`.
pub fn movies_table() -> Table {
    Table::new("movies", ["movieID"], ["title", "releaseDate"])
}

/// Elasticsearch fixture: type `data` in index `movies`.
pub fn elastic_movies_table() -> Table {
    Table::new("data", ["movieid"], ["title", "releasedate"]).with_database("movies")
}

/// Convert a JSON object literal into a row.
pub fn row(value: JsonValue) -> Row {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("Expected a JSON object, got {}", other),
    }
}

pub const MOVIES_DDL: &str = "CREATE TABLE movies (\
    movieID INTEGER PRIMARY KEY AUTOINCREMENT, \
    title TEXT, \
    releaseDate TEXT)";

/// In-memory SQLite driver with an empty `movies` table.
pub async fn setup_sqlite_db() -> SqliteDb {
    let db = SqliteDb::memory().await.expect("Failed to open in-memory SQLite");
    db.execute_raw(MOVIES_DDL)
        .await
        .expect("Failed to create movies table");
    db
}

/// SQLite file under `dir` holding `movies` with two rows (ids 1 and 2).
pub async fn seeded_sqlite_config(dir: &Path) -> DatabaseConfig {
    let path = dir.join("movies.sqlite");
    let db = SqliteDb::open(&path).await.expect("Failed to open SQLite file");
    db.execute_raw(MOVIES_DDL)
        .await
        .expect("Failed to create movies table");
    db.execute_raw(
        "INSERT INTO movies (title, releaseDate) VALUES ('Alien', '1979-05-25'), ('Heat', '1995-12-15')",
    )
    .await
    .expect("Failed to seed movies");
    db.destroy().await.expect("Failed to close SQLite file");
    DatabaseConfig::Sqlite { path }
}

// =============================================================================
// Mock Elasticsearch cluster
// =============================================================================

/// One HTTP request received by a [`MockCluster`].
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    /// Path including any query string.
    pub path: String,
    pub body: String,
}

impl Received {
    /// Body parsed as NDJSON, one value per line.
    pub fn ndjson(&self) -> Vec<JsonValue> {
        self.body
            .lines()
            .map(|line| serde_json::from_str(line).expect("Invalid NDJSON line"))
            .collect()
    }
}

type Responder = dyn Fn(&Received) -> JsonValue + Send + Sync;

/// HTTP/1.1 stub on a local port that records every request and answers
/// `200 OK` with whatever JSON the responder returns.
pub struct MockCluster {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockCluster {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Received) -> JsonValue + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock cluster");
        let url = format!("http://{}", listener.local_addr().expect("No local address"));
        let received = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, respond.clone(), log.clone()));
            }
        });
        Self { url, received }
    }

    /// Requests received so far, in arrival order.
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().expect("Mock cluster log poisoned").clone()
    }
}

async fn serve_connection(stream: TcpStream, respond: Arc<Responder>, log: Arc<Mutex<Vec<Received>>>) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut length = 0;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await.is_err() {
                return;
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0; length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let request = Received {
            method,
            path,
            body: String::from_utf8_lossy(&body).into_owned(),
        };
        let reply = respond(&request).to_string();
        log.lock().expect("Mock cluster log poisoned").push(request);

        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            reply.len()
        );
        if write.write_all(head.as_bytes()).await.is_err() || write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}
