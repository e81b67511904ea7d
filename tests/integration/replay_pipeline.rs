//! End-to-end pipeline tests: dnstap frames through the capture server
//! into SQLite, over file replay and over a Unix socket.

use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message as DnsMessage, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::{rdata, Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use passivedns_application::ports::{MessageSink, SinkFactory};
use passivedns_domain::config::DatabaseConfig;
use passivedns_infrastructure::database::{create_pool, ensure_schema};
use passivedns_infrastructure::framing::FrameStreamWriter;
use passivedns_infrastructure::sinks::SqliteSink;
use passivedns_infrastructure::CaptureServer;
use passivedns_proto::{message, Dnstap, DnstapType, Message};
use prost::Message as _;
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;
use tokio::net::{UnixListener, UnixStream};

const MAX_FRAME_SIZE: usize = 96 * 1024;

/// One RESOLVER_RESPONSE envelope answering `name` with `addr`.
fn envelope(id: u16, name: &str, addr: Ipv4Addr, time_sec: u64) -> Vec<u8> {
    let mut msg = DnsMessage::new(id, MessageType::Response, OpCode::Query);
    msg.set_response_code(ResponseCode::NoError);
    msg.add_answer(Record::from_rdata(
        Name::from_str(name).unwrap(),
        300,
        RData::A(rdata::A(addr)),
    ));
    let mut payload = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut payload);
    msg.emit(&mut encoder).unwrap();

    Dnstap {
        identity: Some(b"test-resolver".to_vec()),
        version: None,
        extra: None,
        message: Some(Message {
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
            response_time_sec: Some(time_sec),
            response_time_nsec: Some(0),
            response_message: Some(payload),
        }),
        r#type: DnstapType::Message as i32,
    }
    .encode_to_vec()
}

async fn write_replay_file(path: &Path, frames: &[Vec<u8>]) {
    let file = tokio::fs::File::create(path).await.unwrap();
    let mut writer = FrameStreamWriter::new(file, false);
    for frame in frames {
        writer.write_frame(frame).await.unwrap();
    }
    writer.finish().await.unwrap();
}

async fn answers_pool(dir: &TempDir) -> SqlitePool {
    let url = format!("sqlite:{}", dir.path().join("answers.db").display());
    let pool = create_pool(&url).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

fn sqlite_factory(pool: SqlitePool, config: DatabaseConfig) -> Arc<SinkFactory> {
    Arc::new(move |worker| {
        vec![Box::new(SqliteSink::new(pool.clone(), &config, worker)) as Box<dyn MessageSink>]
    })
}

async fn replay(pool: SqlitePool, config: DatabaseConfig, file: &Path, workers: usize) {
    let server = CaptureServer::new(workers, 8, MAX_FRAME_SIZE, sqlite_factory(pool, config));
    let input = tokio::fs::File::open(file).await.unwrap();
    server.attach(input, false, None).await.unwrap();
    server.wait_sources().await;
    server.shutdown().await;
    server.wait().await;
}

async fn row_count(pool: &SqlitePool) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM answers")
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

#[tokio::test]
async fn replays_a_file_into_sqlite_flushing_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let pool = answers_pool(&dir).await;

    let frames: Vec<Vec<u8>> = (0..5u16)
        .map(|i| {
            envelope(
                0x1000 + i,
                "example.com.",
                Ipv4Addr::new(192, 0, 2, i as u8 + 1),
                1_700_000_000 + u64::from(i),
            )
        })
        .collect();
    let file = dir.path().join("capture.fstrm");
    write_replay_file(&file, &frames).await;

    // Default batch size (32) is never reached: every row lands via the
    // flush on close.
    replay(pool.clone(), DatabaseConfig::default(), &file, 1).await;

    assert_eq!(row_count(&pool).await, 5);

    let row = sqlx::query("SELECT name, ttl, class, type, data FROM answers ORDER BY data LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("name"), "example.com");
    assert_eq!(row.get::<i64, _>("ttl"), 300);
    assert_eq!(row.get::<String, _>("class"), "IN");
    assert_eq!(row.get::<String, _>("type"), "A");
    assert_eq!(row.get::<String, _>("data"), "192.0.2.1");
}

#[tokio::test]
async fn replaying_the_same_file_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let pool = answers_pool(&dir).await;

    let frames: Vec<Vec<u8>> = (0..4u16)
        .map(|i| {
            envelope(
                0x2000 + i,
                "example.org.",
                Ipv4Addr::new(198, 51, 100, i as u8 + 1),
                1_700_000_100 + u64::from(i),
            )
        })
        .collect();
    let file = dir.path().join("capture.fstrm");
    write_replay_file(&file, &frames).await;

    replay(pool.clone(), DatabaseConfig::default(), &file, 2).await;
    let after_first = row_count(&pool).await;
    replay(pool.clone(), DatabaseConfig::default(), &file, 2).await;

    assert_eq!(after_first, 4);
    assert_eq!(row_count(&pool).await, 4);
}

#[tokio::test]
async fn threshold_flush_commits_without_shutdown() {
    let dir = TempDir::new().unwrap();
    let pool = answers_pool(&dir).await;

    let config = DatabaseConfig {
        flush_batch_size: 1,
        ..DatabaseConfig::default()
    };
    let frames: Vec<Vec<u8>> = (0..3u16)
        .map(|i| {
            envelope(
                0x3000 + i,
                "example.net.",
                Ipv4Addr::new(203, 0, 113, i as u8 + 1),
                1_700_000_200 + u64::from(i),
            )
        })
        .collect();
    let file = dir.path().join("capture.fstrm");
    write_replay_file(&file, &frames).await;

    let server = CaptureServer::new(1, 8, MAX_FRAME_SIZE, sqlite_factory(pool.clone(), config));
    let input = tokio::fs::File::open(&file).await.unwrap();
    server.attach(input, false, None).await.unwrap();
    server.wait_sources().await;

    // Workers are still running; each message crossed the batch
    // threshold on its own, so the rows are already durable.
    let mut committed = 0;
    for _ in 0..50 {
        committed = row_count(&pool).await;
        if committed == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(committed, 3);

    server.shutdown().await;
    server.wait().await;
}

#[tokio::test]
async fn captures_over_a_unix_socket() {
    let dir = TempDir::new().unwrap();
    let pool = answers_pool(&dir).await;

    let socket_path = dir.path().join("dnstap.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let client_path = socket_path.clone();
    let client = tokio::spawn(async move {
        let stream = UnixStream::connect(&client_path).await.unwrap();
        let mut writer = FrameStreamWriter::new(stream, true);
        for i in 0..3u16 {
            let frame = envelope(
                0x4000 + i,
                "socket.example.com.",
                Ipv4Addr::new(192, 0, 2, 50 + i as u8),
                1_700_000_300 + u64::from(i),
            );
            writer.write_frame(&frame).await.unwrap();
        }
        writer.finish().await.unwrap();
    });

    let server = CaptureServer::new(
        2,
        8,
        MAX_FRAME_SIZE,
        sqlite_factory(pool.clone(), DatabaseConfig::default()),
    );
    let (accepted, _addr) = listener.accept().await.unwrap();
    server
        .attach(accepted, true, Some(Duration::from_secs(5)))
        .await
        .unwrap();

    client.await.unwrap();
    server.wait_sources().await;
    server.shutdown().await;
    server.wait().await;

    assert_eq!(row_count(&pool).await, 3);
}
