//! Loopback listener for the streamed progress protocol.
//!
//! Accepts exactly one connection per run, splits inbound bytes on newlines
//! and feeds each non-empty line to the protocol parser. A malformed line is
//! reported through the status history and does not close the stream.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use super::supervisor::RunShared;
use crate::model::Status;
use crate::protocol;

pub(crate) async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await
}

/// Serve one inbound connection until it drops, then stop listening.
pub(crate) async fn serve(listener: TcpListener, shared: Arc<RunShared>) {
    let (mut stream, addr) = match listener.accept().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "progress listener accept failed");
            return;
        }
    };
    // One connection per run; stop accepting as soon as we have it.
    drop(listener);
    debug!(%addr, "scoring tool connected");
    shared.append(Status::Connected, None, None, None);

    let mut buf = BytesMut::with_capacity(4096);
    loop {
        match stream.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // One transport read may carry several lines, or a fragment
                // of one; unterminated bytes stay buffered for the next read.
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line = buf.split_to(pos + 1);
                    handle_line(&shared, &line[..pos]);
                }
            }
            Err(e) => {
                warn!(error = %e, "progress stream read failed");
                break;
            }
        }
    }
    if !buf.is_empty() {
        handle_line(&shared, &buf);
    }
    debug!("scoring tool disconnected");
    shared.append(Status::Disconnected, None, None, None);
}

fn handle_line(shared: &RunShared, raw: &[u8]) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match protocol::parse_packet(line) {
        Ok(packet) => shared.handle_packet(&packet),
        Err(e) => {
            warn!("dropping malformed progress line: {line:?}");
            shared.append(Status::Error, None, None, Some(e.to_string()));
        }
    }
}
