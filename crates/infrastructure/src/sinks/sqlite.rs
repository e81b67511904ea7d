use std::time::Duration;

use async_trait::async_trait;
use passivedns_application::ports::{MessageSink, WorkerId};
use passivedns_domain::config::DatabaseConfig;
use passivedns_domain::{Answer, CaptureError};
use passivedns_proto::Message;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::extract::{address_record_types, extract_answers};

/// Batched writes of extracted answers to the answers table.
///
/// Each worker owns one instance with its own buffer; the pool handle is
/// shared but every flush is one transaction, and the UNIQUE index makes
/// concurrent flushes of the same observation commute. Address and alias
/// records only.
///
/// A flush that keeps failing is fatal by policy: buffered answers are
/// never dropped on a retryable error, the process stops instead.
pub struct SqliteSink {
    pool: SqlitePool,
    worker: WorkerId,
    record_types: Vec<u16>,
    buffer: Vec<Answer>,
    batch_size: usize,
    flush_max_attempts: u32,
    flush_retry_delay: Duration,
    close_max_attempts: u32,
}

impl SqliteSink {
    /// The schema must already exist; see [`crate::database::ensure_schema`].
    pub fn new(pool: SqlitePool, config: &DatabaseConfig, worker: WorkerId) -> Self {
        Self {
            pool,
            worker,
            record_types: address_record_types(),
            buffer: Vec::with_capacity(config.flush_batch_size),
            batch_size: config.flush_batch_size,
            flush_max_attempts: config.flush_max_attempts,
            flush_retry_delay: Duration::from_millis(config.flush_retry_delay_ms),
            close_max_attempts: config.close_max_attempts,
        }
    }

    /// Inserts the whole buffer in one transaction. A row already present
    /// (unique violation) is skipped; any other row error rolls the
    /// transaction back.
    async fn insert_buffer(&self) -> Result<(), CaptureError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CaptureError::Database(e.to_string()))?;

        for answer in &self.buffer {
            let result = sqlx::query(
                "INSERT INTO answers (time, id, name, ttl, class, type, data) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(answer.sql_time())
            .bind(answer.id as i64)
            .bind(&answer.name)
            .bind(answer.ttl as i64)
            .bind(&answer.class_name)
            .bind(&answer.type_name)
            .bind(&answer.data)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    // Already recorded; re-delivery and replay are expected.
                }
                Err(e) => return Err(CaptureError::Database(e.to_string())),
            }
        }

        tx.commit()
            .await
            .map_err(|e| CaptureError::Database(e.to_string()))
    }

    /// Retries the buffer until it commits or the attempt budget runs out.
    async fn flush(&mut self, max_attempts: u32, delay: Option<Duration>) -> Result<(), CaptureError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        for attempt in 1..=max_attempts {
            match self.insert_buffer().await {
                Ok(()) => {
                    debug!(
                        worker = self.worker,
                        count = self.buffer.len(),
                        attempt,
                        "Answers flushed"
                    );
                    self.buffer.clear();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        worker = self.worker,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Answer flush failed"
                    );
                    if attempt < max_attempts {
                        if let Some(delay) = delay {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        Err(CaptureError::StorageExhausted {
            attempts: max_attempts,
        })
    }
}

#[async_trait]
impl MessageSink for SqliteSink {
    async fn handle(&mut self, message: &Message) -> Result<(), CaptureError> {
        let answers = extract_answers(message, &self.record_types);
        self.buffer.extend(answers);

        if self.buffer.len() >= self.batch_size {
            self.flush(self.flush_max_attempts, Some(self.flush_retry_delay))
                .await?;
        }
        Ok(())
    }

    /// Final flush with the short retry budget: shutdown must not hang a
    /// minute on a wedged database, but buffered answers still get their
    /// chance to land before the process gives up.
    async fn close(&mut self) -> Result<(), CaptureError> {
        self.flush(self.close_max_attempts, None).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_pool, ensure_schema};
    use chrono::{TimeZone, Utc};
    use hickory_proto::op::{Message as DnsMessage, MessageType, OpCode, ResponseCode};
    use hickory_proto::rr::{rdata, Name, RData, Record};
    use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
    use passivedns_proto::message;
    use sqlx::Row;
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn wire_bytes(msg: &DnsMessage) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        msg.emit(&mut encoder).unwrap();
        buf
    }

    fn resolver_response(payload: Vec<u8>) -> Message {
        Message {
            r#type: message::Type::ResolverResponse as i32,
            socket_family: None,
            socket_protocol: None,
            query_address: None,
            response_address: None,
            query_port: None,
            response_port: None,
            query_time_sec: None,
            query_time_nsec: None,
            query_message: None,
            query_zone: None,
            response_time_sec: Some(1_700_000_000),
            response_time_nsec: Some(0),
            response_message: Some(payload),
        }
    }

    async fn test_pool(dir: &TempDir) -> SqlitePool {
        let url = format!("sqlite:{}", dir.path().join("answers.db").display());
        let pool = create_pool(&url).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        pool
    }

    fn answer(name: &str, data: &str) -> Answer {
        Answer {
            id: 0x0042,
            time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            name: name.to_string(),
            ttl: 300,
            class: 1,
            class_name: "IN".to_string(),
            rtype: 1,
            type_name: "A".to_string(),
            data: data.to_string(),
        }
    }

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            flush_batch_size: 4,
            flush_retry_delay_ms: 20,
            ..DatabaseConfig::default()
        }
    }

    async fn row_count(pool: &SqlitePool) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM answers")
            .fetch_one(pool)
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn close_flushes_a_partial_buffer() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let mut sink = SqliteSink::new(pool.clone(), &config(), 0);

        sink.buffer.push(answer("example.com", "192.0.2.1"));
        sink.buffer.push(answer("example.org", "192.0.2.2"));
        sink.close().await.unwrap();

        assert_eq!(row_count(&pool).await, 2);
        assert!(sink.buffer.is_empty());
    }

    #[tokio::test]
    async fn duplicate_rows_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let mut sink = SqliteSink::new(pool.clone(), &config(), 0);

        sink.buffer.push(answer("example.com", "192.0.2.1"));
        sink.close().await.unwrap();

        // Same row again plus a new one: the duplicate is skipped, the
        // new row commits, and exactly one copy of the duplicate remains.
        sink.buffer.push(answer("example.com", "192.0.2.1"));
        sink.buffer.push(answer("example.net", "192.0.2.3"));
        sink.close().await.unwrap();

        assert_eq!(row_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn replaying_the_same_answers_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        for _ in 0..2 {
            let mut sink = SqliteSink::new(pool.clone(), &config(), 0);
            sink.buffer.push(answer("example.com", "192.0.2.1"));
            sink.buffer.push(answer("example.org", "192.0.2.2"));
            sink.close().await.unwrap();
        }

        assert_eq!(row_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_until_success() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("answers.db").display());
        let pool = create_pool(&url).await.unwrap();
        // No schema yet: the first attempts fail, then the schema shows
        // up and a later attempt lands. Mirrors a locked/unavailable
        // store healing while the sink retries.
        let schema_pool = pool.clone();
        let fixer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ensure_schema(&schema_pool).await.unwrap();
        });

        let mut sink = SqliteSink::new(pool.clone(), &config(), 0);
        sink.buffer.push(answer("example.com", "192.0.2.1"));
        sink.flush(30, Some(Duration::from_millis(20))).await.unwrap();

        fixer.await.unwrap();
        assert_eq!(row_count(&pool).await, 1);
        assert!(sink.buffer.is_empty());
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("answers.db").display());
        // Schema never created, every attempt fails.
        let pool = create_pool(&url).await.unwrap();

        let mut sink = SqliteSink::new(pool, &config(), 0);
        sink.buffer.push(answer("example.com", "192.0.2.1"));

        let err = sink.close().await.unwrap_err();
        assert!(matches!(err, CaptureError::StorageExhausted { attempts: 8 }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn handle_flushes_at_the_batch_threshold() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let mut sink = SqliteSink::new(pool.clone(), &config(), 0);

        // Four A records in one response reach the batch size of 4.
        let mut msg = DnsMessage::new(0x0042, MessageType::Response, OpCode::Query);
        msg.set_response_code(ResponseCode::NoError);
        for i in 1..=4u8 {
            msg.add_answer(Record::from_rdata(
                Name::from_str("example.com.").unwrap(),
                300,
                RData::A(rdata::A(Ipv4Addr::new(192, 0, 2, i))),
            ));
        }
        let message = resolver_response(wire_bytes(&msg));

        sink.handle(&message).await.unwrap();

        assert!(sink.buffer.is_empty());
        assert_eq!(row_count(&pool).await, 4);
    }

    #[tokio::test]
    async fn non_address_records_are_not_buffered() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let mut sink = SqliteSink::new(pool, &config(), 0);

        let mut msg = DnsMessage::new(1, MessageType::Response, OpCode::Query);
        msg.set_response_code(ResponseCode::NoError);
        msg.add_answer(Record::from_rdata(
            Name::from_str("example.com.").unwrap(),
            300,
            RData::TXT(rdata::TXT::new(vec!["x".to_string()])),
        ));
        let message = resolver_response(wire_bytes(&msg));

        sink.handle(&message).await.unwrap();

        assert!(sink.buffer.is_empty());
    }
}
