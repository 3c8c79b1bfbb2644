//! wsrpc - loopback driver
//!
//! Runs a client session against an in-process echo peer. Channels stand in
//! for the socket; every call carries binary payloads through the codec and
//! every reply is correlated through the pending table.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wsrpc_client::{Config, Responder, Session};
use wsrpc_protocol::{Binary, BinaryKind, Codec, Response, Value, WireParts};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Calls issued when WSRPC_LOOPBACK_CALLS is unset.
const DEFAULT_CALLS: usize = 1000;

/// Calls allowed in flight at once.
const WINDOW: usize = 10;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if WSRPC_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("WSRPC_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            if std::env::var("WSRPC_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::warn!("Ignoring invalid configuration: {}", e);
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    let calls = match std::env::var("WSRPC_LOOPBACK_CALLS") {
        Ok(raw) => raw.parse()?,
        Err(_) => DEFAULT_CALLS,
    };

    tracing::info!("Starting wsrpc loopback");
    tracing::info!("  Calls: {} (window {})", calls, WINDOW);
    tracing::info!("  Max depth: {}", config.codec.max_depth);
    tracing::info!("  Max binaries: {}", config.codec.max_binaries);
    tracing::info!("  First id: {}", config.pending.id_base + 1);

    let (to_peer, peer_inbound) = mpsc::channel::<WireParts>(WINDOW);
    let (peer_outbound, mut from_peer) = mpsc::channel::<WireParts>(WINDOW);
    let peer = tokio::spawn(run_peer(
        Responder::new(Codec::new(config.codec)),
        peer_inbound,
        peer_outbound,
    ));

    let mut session: Session<usize> = Session::new(&config);
    let mut sent = 0;
    let mut received = 0;
    let mut envelope_bytes = 0;
    let mut binary_bytes = 0;

    while received < calls {
        while sent < calls && session.pending_count() < WINDOW {
            let (_, parts) = session.prepare_call("echo", sample_params(sent), sent)?;
            envelope_bytes += parts.envelope.len();
            binary_bytes += parts.binary_bytes();
            to_peer.send(parts).await?;
            sent += 1;
        }

        let parts = from_peer.recv().await.ok_or("peer closed the channel")?;
        let reply = session.accept_reply(&parts.envelope, &parts.binaries)?;
        let seq = reply.pending;
        let result = reply.response.into_result()?;
        if result != sample_params(seq) {
            tracing::error!("Echo mismatch for call {} (id={})", seq, reply.id);
            return Err(format!("echo mismatch for call {}", seq).into());
        }
        received += 1;
        tracing::debug!(
            "call {} (id={}) echoed, {} pending",
            seq,
            reply.id,
            session.pending_count()
        );
    }

    drop(to_peer);
    let served = peer.await??;
    let leftover = session.close();

    tracing::info!(
        "Loopback complete: {} calls served, {} envelope bytes, {} binary bytes",
        served,
        envelope_bytes,
        binary_bytes
    );
    if !leftover.is_empty() {
        tracing::warn!("{} calls never answered", leftover.len());
    }
    Ok(())
}

/// Echoes every request back as its response. When two requests are queued
/// the later one is answered first, so replies arrive out of order.
async fn run_peer(
    responder: Responder,
    mut inbound: mpsc::Receiver<WireParts>,
    outbound: mpsc::Sender<WireParts>,
) -> Result<usize, BoxError> {
    let mut served = 0;

    while let Some(first) = inbound.recv().await {
        let mut batch = vec![first];
        if let Ok(second) = inbound.try_recv() {
            batch.push(second);
        }

        for parts in batch.into_iter().rev() {
            let request = responder.decode_request(&parts.envelope, &parts.binaries)?;
            tracing::trace!("peer handling {} id={}", request.method, request.id);
            let reply = responder.encode_response(Response::ok(request.id, request.params))?;
            outbound.send(reply).await?;
            served += 1;
        }
    }

    Ok(served)
}

fn sample_params(seq: usize) -> Value {
    let kind = BinaryKind::ALL[seq % BinaryKind::ALL.len()];
    let readings: Vec<Value> = (0..3)
        .map(|i| Binary::from(vec![(seq + i) as f64 * 0.5; 4]).into())
        .collect();

    [
        ("seq", Value::from(seq as i64)),
        ("label", Value::from(format!("call-{}", seq))),
        ("raw", Binary::from(Bytes::from(vec![seq as u8; 16])).into()),
        ("view", Binary::zeroed(kind, seq % 7).into()),
        ("readings", Value::Array(readings)),
    ]
    .into_iter()
    .collect()
}
