use crate::error::NetError;
use crate::inbox::Inbox;
use qchat_wire::{decode, encode, Frame};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

/// Binds `host:port` and runs the accept loop until the process exits.
///
/// Each accepted connection gets a short-lived handler: read exactly one
/// framed message, push it to `inbox`, close the socket. A handler that
/// hits a frame error drops its connection without touching the inbox; the
/// acceptor itself keeps running.
pub async fn listen(host: &str, port: u16, inbox: Arc<Inbox>) -> Result<(), NetError> {
    let listener = TcpListener::bind((host, port)).await?;
    debug!(%host, port, "listening for incoming connections");

    loop {
        let (socket, addr) = listener.accept().await?;
        debug!(%addr, "accepted connection");
        let inbox = inbox.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &inbox).await {
                warn!(%addr, error = %e, "dropping connection after frame error");
            }
        });
    }
}

async fn handle_connection(mut socket: TcpStream, inbox: &Inbox) -> Result<(), NetError> {
    let mut buf = Vec::new();
    socket.read_to_end(&mut buf).await?;
    let frame = decode(&buf)?;
    debug!(sender = %frame.sender, header = ?frame.header, "parsed inbound frame");
    inbox.push(frame);
    Ok(())
}

/// Connects to `host:port`, sends `frame`, and closes. One message per
/// connection, matching the acceptor's one-shot-per-socket contract.
pub async fn send_message(host: &str, port: u16, frame: &Frame) -> Result<(), NetError> {
    let bytes = encode(frame)?;
    let mut socket = TcpStream::connect((host, port)).await?;
    socket.write_all(&bytes).await?;
    socket.shutdown().await?;
    Ok(())
}
