//! Tests for the Valkey transport against a fake server that drops the
//! connection mid-command.

#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use puda_cli::application::{CommandChannel, StateAccessor};
use puda_cli::domain::{Attribution, ChannelError, StateError};
use puda_cli::infra::valkey::ValkeyTransport;
use puda_common::{CommandRequest, PudaConfig};
use serde_json::Map;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// Longest any call may take before the test counts it as hung.
const HANG_LIMIT: Duration = Duration::from_secs(15);

// ── Fake server ───────────────────────────────────────────────────────────────

/// Parse one RESP array command from the front of `buf`.
fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let (count, mut pos) = read_header(buf, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = read_header(buf, pos, b'$')?;
        let end = start + len;
        if buf.len() < end + 2 {
            return None;
        }
        args.push(String::from_utf8_lossy(&buf[start..end]).into_owned());
        pos = end + 2;
    }
    Some((args, pos))
}

fn read_header(buf: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    if *buf.get(pos)? != marker {
        return None;
    }
    let line_len = buf[pos..].windows(2).position(|w| w == b"\r\n")?;
    let n = std::str::from_utf8(&buf[pos + 1..pos + line_len])
        .ok()?
        .parse()
        .ok()?;
    Some((n, pos + line_len + 2))
}

/// Serve one connection until `drop_on` arrives, then hang up.
async fn serve(mut socket: TcpStream, drop_on: &'static str, dropped: Arc<Notify>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        while let Some((args, used)) = parse_command(&buf) {
            buf.drain(..used);
            let name = args.first().map(|a| a.to_ascii_uppercase()).unwrap_or_default();
            if name == drop_on {
                dropped.notify_one();
                return;
            }
            let reply: &[u8] = match name.as_str() {
                "PING" => b"+PONG\r\n",
                "CLIENT" => b":1\r\n",
                _ => b"+OK\r\n",
            };
            if socket.write_all(reply).await.is_err() {
                return;
            }
        }
    }
}

/// Start a server that answers until it sees `drop_on`, then closes that
/// connection and stops accepting new ones.
async fn spawn_dropping_server(drop_on: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let dropped = Arc::new(Notify::new());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((socket, _)) = accepted else { break };
                    tokio::spawn(serve(socket, drop_on, Arc::clone(&dropped)));
                }
                () = dropped.notified() => break,
            }
        }
    });
    addr
}

fn config(addr: SocketAddr) -> PudaConfig {
    PudaConfig {
        valkey_url: format!("redis://{addr}"),
        connect_timeout_secs: 1,
        ..PudaConfig::default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_state_fails_instead_of_hanging_when_link_drops() {
    let addr = spawn_dropping_server("HGET").await;
    let transport = ValkeyTransport::connect(&config(addr))
        .await
        .expect("fake server accepts the connection");

    let outcome = tokio::time::timeout(
        HANG_LIMIT,
        StateAccessor::new(&transport, "MACHINE_STATE").get_state("first"),
    )
    .await
    .expect("get_state must not hang on a dead link");

    assert!(
        matches!(outcome, Err(StateError::Transport(_))),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn test_send_fails_instead_of_hanging_when_link_drops() {
    let addr = spawn_dropping_server("SUBSCRIBE").await;
    let transport = ValkeyTransport::connect(&config(addr))
        .await
        .expect("fake server accepts the connection");
    let request = CommandRequest::new("home", Map::new(), None).expect("valid request");
    let who = Attribution::new("first", "u-42", "ada");

    let outcome = tokio::time::timeout(
        HANG_LIMIT,
        CommandChannel::new(&transport, "puda").send(
            &request,
            &who,
            None,
            Duration::from_secs(60),
        ),
    )
    .await
    .expect("send must not hang on a dead link");

    assert!(
        matches!(outcome, Err(ChannelError::Transport(_))),
        "got {outcome:?}"
    );
}
