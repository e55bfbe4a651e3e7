use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use confgend::application::builder::GeneratorBuilder;
use confgend::application::events::{EventKind, RecordingSink};
use confgend::cache::FileCache;
use confgend::domain::entities::InfosRecord;
use confgend::infra::db::{Fixtures, MemoryDataSource};
use confgend::infra::error::InfraError;
use confgend::infra::line::{LineClient, LineServer};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Daemon {
    addr: SocketAddr,
    cache_dir: TempDir,
    data: MemoryDataSource,
    sink: Arc<RecordingSink>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), InfraError>>,
}

impl Daemon {
    async fn start(max_request_bytes: usize) -> Self {
        let cache_dir = tempfile::tempdir().expect("cache dir");
        let data = MemoryDataSource::new(Fixtures {
            infos: Some(InfosRecord {
                uuid: "abc".to_string(),
            }),
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::new());
        let generator = GeneratorBuilder::new(
            Arc::new(FileCache::new(cache_dir.path())),
            Arc::new(data.clone()),
            sink.clone(),
        )
        .build();

        let listener = LineServer::bind("127.0.0.1:0".parse().expect("addr"))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (stop, stopped) = oneshot::channel::<()>();
        let server = LineServer::new(Arc::new(generator), sink.clone())
            .with_max_request_bytes(max_request_bytes)
            .with_grace(Duration::from_secs(2));
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            cache_dir,
            data,
            sink,
            stop: Some(stop),
            handle,
        }
    }

    fn client(&self) -> LineClient {
        LineClient::new(self.addr.to_string()).with_timeout(Duration::from_secs(5))
    }

    async fn send(&self, line: &str) -> Vec<u8> {
        self.client().send_line(line).await.expect("exchange")
    }

    async fn send_raw(&self, bytes: &[u8], close_write: bool) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.expect("connect");
        stream.write_all(bytes).await.expect("write");
        if close_write {
            stream.shutdown().await.expect("shutdown write");
        }
        let mut response = Vec::new();
        // A reset after unread input still counts as a closed connection.
        let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .expect("server closes the connection");
        response
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stops")
            .expect("server task")
            .expect("server result");
    }
}

#[tokio::test]
async fn uuid_request_is_served_then_answered_from_cache() {
    let daemon = Daemon::start(64 * 1024).await;

    assert_eq!(daemon.send("asterisk/uuid.yml\n").await, b"uuid: abc\n");

    daemon.data.fail_open(true);
    assert_eq!(daemon.send("asterisk/uuid.yml\n").await, b"uuid: abc\n");
    assert_eq!(
        daemon.sink.kinds(),
        vec![
            EventKind::Generated,
            EventKind::ScopeFailed,
            EventKind::CacheFallback
        ]
    );

    let cached = std::fs::read_to_string(daemon.cache_dir.path().join("asterisk/uuid.yml"))
        .expect("cache file");
    assert_eq!(cached, "uuid: abc\n");

    daemon.stop().await;
}

#[tokio::test]
async fn invalidate_removes_cache_file_and_sends_nothing() {
    let daemon = Daemon::start(64 * 1024).await;
    let entry = daemon.cache_dir.path().join("test/myfile.yml");
    std::fs::create_dir_all(entry.parent().expect("parent")).expect("mkdir");
    std::fs::write(&entry, "stale: true\n").expect("seed cache");

    assert!(daemon.send("test/myfile.yml invalidate\n").await.is_empty());
    assert!(!entry.exists());
    assert_eq!(daemon.sink.kinds(), vec![EventKind::Invalidated]);

    daemon.stop().await;
}

#[tokio::test]
async fn malformed_command_closes_without_response() {
    let daemon = Daemon::start(64 * 1024).await;

    assert!(daemon.send("noslash\n").await.is_empty());
    assert!(daemon.send("a/b/c\n").await.is_empty());
    assert_eq!(
        daemon.sink.kinds(),
        vec![EventKind::MalformedRequest, EventKind::MalformedRequest]
    );

    // The server keeps serving after malformed input.
    assert_eq!(daemon.send("asterisk/uuid.yml\n").await, b"uuid: abc\n");
    daemon.stop().await;
}

#[tokio::test]
async fn unknown_pair_gets_empty_response() {
    let daemon = Daemon::start(64 * 1024).await;

    assert!(daemon.send("asterisk/sip.conf\n").await.is_empty());
    assert!(daemon.sink.kinds().contains(&EventKind::NoHandler));

    daemon.stop().await;
}

#[tokio::test]
async fn crlf_and_repeated_spaces_are_tolerated() {
    let daemon = Daemon::start(64 * 1024).await;

    assert_eq!(
        daemon.send("asterisk/uuid.yml   cached  \r\n").await,
        b"uuid: abc\n"
    );

    daemon.stop().await;
}

#[tokio::test]
async fn invalid_utf8_is_dropped() {
    let daemon = Daemon::start(64 * 1024).await;

    let response = daemon.send_raw(b"asterisk/\xff\xfe.yml\n", false).await;
    assert!(response.is_empty());
    assert_eq!(daemon.sink.kinds(), vec![EventKind::DecodeFailed]);

    daemon.stop().await;
}

#[tokio::test]
async fn eof_before_newline_gets_no_response() {
    let daemon = Daemon::start(64 * 1024).await;

    let response = daemon.send_raw(b"asterisk/uuid.yml", true).await;
    assert!(response.is_empty());
    assert!(daemon.sink.kinds().is_empty());
    assert_eq!(daemon.data.opened(), 0);

    daemon.stop().await;
}

#[tokio::test]
async fn overlong_request_is_rejected() {
    let daemon = Daemon::start(32).await;

    let line = format!("asterisk/{}.yml\n", "x".repeat(64));
    let response = daemon.send_raw(line.as_bytes(), false).await;
    assert!(response.is_empty());
    assert_eq!(daemon.sink.kinds(), vec![EventKind::MalformedRequest]);

    daemon.stop().await;
}

#[tokio::test]
async fn concurrent_connections_are_served_independently() {
    let daemon = Daemon::start(64 * 1024).await;
    let client = daemon.client();

    let requests: Vec<_> = (0..16)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.send_line("asterisk/uuid.yml\n").await })
        })
        .collect();
    for request in requests {
        let response = request.await.expect("task").expect("exchange");
        assert_eq!(response, b"uuid: abc\n");
    }
    assert_eq!(daemon.data.opened(), daemon.data.released());

    daemon.stop().await;
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let daemon = Daemon::start(64 * 1024).await;
    let addr = daemon.addr;
    daemon.stop().await;

    assert!(TcpStream::connect(addr).await.is_err());
}
