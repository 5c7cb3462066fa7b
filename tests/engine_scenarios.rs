//! End-to-end scenarios against a loopback UDP stub, mirroring the six
//! scenarios worked through by hand in the design notes.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use queryperf::cli::Args;
use queryperf::config::RunConfig;
use queryperf::engine::Engine;

fn data_file(contents: &str) -> (NamedTempFile, PathBuf) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let path = file.path().to_path_buf();
    (file, path)
}

/// An echo stub: replies to every datagram with the exact bytes it received,
/// which is enough to satisfy the transaction-id correlation the engine
/// checks — it never inspects response content beyond the id.
async fn spawn_echo_server() -> (SocketAddr, JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    let _ = socket.send_to(&buf[..n], from).await;
                }
                Err(_) => break,
            }
        }
    });
    (addr, handle)
}

fn base_config(path: PathBuf, server_host: String, port: u16) -> RunConfig {
    RunConfig {
        data_file: Some(path),
        server_host,
        port,
        max_queries: 20,
        timeout: Duration::from_secs(5),
        ignore_directives: false,
        time_limit: None,
        run_once: true,
        socket_buffer_kb: 32,
        verbose: false,
        server_from_cli: false,
        port_from_cli: false,
        max_queries_from_cli: false,
        timeout_from_cli: false,
    }
}

#[tokio::test]
async fn single_a_query_completes() {
    let (_guard, path) = data_file("example.com A\n");
    let (addr, server) = spawn_echo_server().await;

    let config = base_config(path, addr.ip().to_string(), addr.port());
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 1);
    assert_eq!(summary.stats.completed_count, 1);
    assert_eq!(summary.stats.timed_out_count, 0);

    server.abort();
}

#[tokio::test]
async fn unreachable_server_times_out() {
    let (_guard, path) = data_file("example.com A\n");

    let mut config = base_config(path, "192.0.2.1".to_string(), 53);
    config.timeout = Duration::from_secs(1);
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 1);
    assert_eq!(summary.stats.completed_count, 0);
    assert_eq!(summary.stats.timed_out_count, 1);
}

#[tokio::test]
async fn comments_and_blanks_are_skipped() {
    let (_guard, path) = data_file("; a note\n\nexample.com NS\n");
    let (addr, server) = spawn_echo_server().await;

    let config = base_config(path, addr.ip().to_string(), addr.port());
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 1);
    assert_eq!(summary.stats.completed_count, 1);

    server.abort();
}

#[tokio::test]
async fn inline_maxqueries_directive_still_delivers_every_query() {
    let (_guard, path) = data_file(
        "# maxqueries 3\nex1.example.com A\nex2.example.com A\nex3.example.com A\nex4.example.com A\n",
    );
    let (addr, server) = spawn_echo_server().await;

    let config = base_config(path, addr.ip().to_string(), addr.port());
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 4);
    assert_eq!(summary.stats.completed_count, 4);

    server.abort();
}

#[tokio::test]
async fn directive_overridden_by_cli_does_not_break_the_run() {
    let (_guard, path) = data_file("# maxqueries 99\na.example.com A\n");
    let (addr, server) = spawn_echo_server().await;

    let mut config = base_config(path, addr.ip().to_string(), addr.port());
    config.max_queries = 7;
    config.max_queries_from_cli = true;
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 1);
    assert_eq!(summary.stats.completed_count, 1);

    server.abort();
}

#[tokio::test]
async fn unknown_qtype_sends_nothing() {
    let (_guard, path) = data_file("example.com FOO\n");

    let config = base_config(path, "127.0.0.1".to_string(), 9);
    let engine = Engine::setup(&config).await.unwrap();
    let summary = engine.run().await;

    assert_eq!(summary.stats.sent_count, 0);
    assert_eq!(summary.stats.completed_count, 0);
}

#[test]
fn from_args_only_marks_flags_actually_given_on_the_command_line() {
    let args = Args::parse_from(["queryperf", "-1"]);
    let config = RunConfig::from_args(&args).unwrap();

    assert!(!config.max_queries_from_cli, "-q was never passed");
    assert!(!config.server_from_cli, "-s was never passed");
    assert!(!config.port_from_cli, "-p was never passed");
    assert!(!config.timeout_from_cli, "-t was never passed");
    assert_eq!(config.max_queries, 20, "still falls back to the documented default");

    let args = Args::parse_from(["queryperf", "-1", "-q", "7"]);
    let config = RunConfig::from_args(&args).unwrap();

    assert!(config.max_queries_from_cli, "-q was passed explicitly");
    assert_eq!(config.max_queries, 7);
}
