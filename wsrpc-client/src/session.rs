//! Call correlation for one connection.
//!
//! A [`Session`] pairs the codec with a pending table. The transport hands it
//! outbound calls to encode and inbound wire parts to correlate; sockets,
//! framing and timeouts stay with the transport.

use crate::config::Config;
use crate::error::ClientError;
use crate::pending::PendingTable;
use bytes::Bytes;
use wsrpc_protocol::{Codec, Request, RequestId, Response, Value, WireParts};

/// A resolved reply together with the value registered for its call.
#[derive(Debug)]
pub struct Reply<V> {
    pub id: RequestId,
    pub pending: V,
    pub response: Response,
}

/// Client side of a connection: encodes calls and correlates replies.
///
/// Create one per connection and drop it (or call [`Session::close`]) when
/// the connection ends.
#[derive(Debug)]
pub struct Session<V> {
    codec: Codec,
    pending: PendingTable<V>,
}

impl<V> Session<V> {
    pub fn new(config: &Config) -> Self {
        Self {
            codec: Codec::new(config.codec),
            pending: PendingTable::with_capacity(
                config.pending.id_base,
                config.pending.initial_capacity,
            ),
        }
    }

    pub fn with_parts(codec: Codec, pending: PendingTable<V>) -> Self {
        Self { codec, pending }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Encodes a call and registers `pending` under its identifier.
    ///
    /// The entry is registered only once encoding succeeded, so a failed
    /// call leaves nothing behind.
    pub fn prepare_call(
        &mut self,
        method: &str,
        params: impl Into<Value>,
        pending: V,
    ) -> Result<(RequestId, WireParts), ClientError> {
        let id = self.pending.allocate_id()?;
        let request = Request::new(id, method).with_params(params);
        let parts = self.codec.encode(&request.into_value())?;
        self.pending.add(id, pending)?;

        tracing::debug!(
            "prepared call id={} method={} ({} envelope bytes, {} binaries)",
            id,
            method,
            parts.envelope.len(),
            parts.binaries.len()
        );
        Ok((id, parts))
    }

    /// Decodes a reply and resolves the call it answers.
    ///
    /// A reply for an unknown, cancelled or already answered call fails with
    /// a stale-reply error and leaves the session untouched.
    pub fn accept_reply(
        &mut self,
        envelope: &str,
        binaries: &[Bytes],
    ) -> Result<Reply<V>, ClientError> {
        let message = self.codec.decode(envelope, binaries)?;
        let response = Response::from_value(message)?;
        let id = response.id;

        let pending = self.pending.get(id).map_err(|e| {
            tracing::debug!("dropping reply id={}: no pending call", id);
            e
        })?;

        tracing::debug!(
            "resolved call id={} ok={} ({} still pending)",
            id,
            response.is_ok(),
            self.pending.len()
        );
        Ok(Reply {
            id,
            pending,
            response,
        })
    }

    /// Forgets a call, e.g. after a timeout. Its reply will be reported stale.
    pub fn cancel(&mut self, id: RequestId) -> Option<V> {
        let cancelled = self.pending.cancel(id);
        if cancelled.is_some() {
            tracing::debug!("cancelled call id={}", id);
        }
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &PendingTable<V> {
        &self.pending
    }

    /// Ends the session, returning every call still waiting for a reply.
    pub fn close(mut self) -> Vec<(RequestId, V)> {
        let drained = self.pending.drain();
        tracing::debug!("session closed with {} pending calls", drained.len());
        drained
    }
}

/// Peer side of a connection: decodes calls and encodes replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Responder {
    codec: Codec,
}

impl Responder {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn decode_request(&self, envelope: &str, binaries: &[Bytes]) -> Result<Request, ClientError> {
        let message = self.codec.decode(envelope, binaries)?;
        Ok(Request::from_value(message)?)
    }

    pub fn encode_response(&self, response: Response) -> Result<WireParts, ClientError> {
        Ok(self.codec.encode(&response.into_value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PendingError;
    use wsrpc_protocol::{Binary, BinaryKind, DecodeError, EncodeError, ResponseError};

    fn session() -> Session<&'static str> {
        Session::new(&Config::default())
    }

    fn params() -> Value {
        [
            ("channel", Value::from(3)),
            ("window", Binary::zeroed(BinaryKind::Float32, 3).into()),
        ]
        .into_iter()
        .collect()
    }

    fn echo(request: Request) -> Response {
        Response::ok(request.id, request.params)
    }

    #[test]
    fn test_call_roundtrip() {
        let mut session = session();
        let responder = Responder::default();

        let (id, parts) = session.prepare_call("sensor.read", params(), "read-3").unwrap();
        assert_eq!(session.pending_count(), 1);
        assert_eq!(parts.binaries.len(), 1);

        let request = responder
            .decode_request(&parts.envelope, &parts.binaries)
            .unwrap();
        assert_eq!(request.id, id);
        assert_eq!(request.method, "sensor.read");

        let reply_parts = responder.encode_response(echo(request)).unwrap();
        let reply = session
            .accept_reply(&reply_parts.envelope, &reply_parts.binaries)
            .unwrap();

        assert_eq!(reply.id, id);
        assert_eq!(reply.pending, "read-3");
        assert_eq!(reply.response.into_result().unwrap(), params());
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_reply_is_stale() {
        let mut session = session();
        let responder = Responder::default();

        let (_, parts) = session.prepare_call("ping", Value::Null, "ping").unwrap();
        let request = responder
            .decode_request(&parts.envelope, &parts.binaries)
            .unwrap();
        let reply_parts = responder.encode_response(echo(request)).unwrap();

        session
            .accept_reply(&reply_parts.envelope, &reply_parts.binaries)
            .unwrap();
        let err = session
            .accept_reply(&reply_parts.envelope, &reply_parts.binaries)
            .unwrap_err();
        assert!(err.is_stale_reply());
    }

    #[test]
    fn test_out_of_order_replies() {
        let mut session = session();
        let responder = Responder::default();

        let calls: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| session.prepare_call(name, Value::Null, name).unwrap())
            .collect();

        for (id, parts) in calls.into_iter().rev() {
            let request = responder
                .decode_request(&parts.envelope, &parts.binaries)
                .unwrap();
            let reply_parts = responder.encode_response(echo(request)).unwrap();
            let reply = session
                .accept_reply(&reply_parts.envelope, &reply_parts.binaries)
                .unwrap();
            assert_eq!(reply.id, id);
        }
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_error_response() {
        let mut session = session();
        let (id, _) = session.prepare_call("missing", Value::Null, "m").unwrap();

        let parts = Responder::default()
            .encode_response(Response::error(
                id,
                ResponseError::new("NOT_FOUND", "no such method"),
            ))
            .unwrap();
        let reply = session.accept_reply(&parts.envelope, &parts.binaries).unwrap();
        assert_eq!(reply.pending, "m");
        assert_eq!(reply.response.into_result().unwrap_err().code, "NOT_FOUND");
    }

    #[test]
    fn test_failed_encode_registers_nothing() {
        let mut session = session();
        let err = session
            .prepare_call("bad", Value::Float(f64::NAN), "bad")
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Encode(EncodeError::NonFiniteFloat { .. })
        ));
        assert_eq!(session.pending_count(), 0);

        // Session stays usable.
        let (id, _) = session.prepare_call("good", Value::Null, "good").unwrap();
        assert!(session.pending().contains(id));
    }

    #[test]
    fn test_malformed_reply_keeps_pending() {
        let mut session = session();
        let (id, _) = session.prepare_call("ping", Value::Null, "ping").unwrap();

        let err = session.accept_reply("{not json", &[]).unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::Json(_))));

        let envelope = format!(
            r#"{{"type":"response","id":{},"result":{{"$binary":"int64","length":1,"index":0}}}}"#,
            id
        );
        let err = session
            .accept_reply(&envelope, &[Bytes::from_static(&[0; 8])])
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::UnknownKind(_))));

        assert!(session.pending().contains(id));
    }

    #[test]
    fn test_cancel_then_reply() {
        let mut session = session();
        let responder = Responder::default();

        let (id, parts) = session.prepare_call("slow", Value::Null, "slow").unwrap();
        assert_eq!(session.cancel(id), Some("slow"));
        assert_eq!(session.cancel(id), None);

        let request = responder
            .decode_request(&parts.envelope, &parts.binaries)
            .unwrap();
        let reply_parts = responder.encode_response(echo(request)).unwrap();
        let err = session
            .accept_reply(&reply_parts.envelope, &reply_parts.binaries)
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Pending(PendingError::NotFound(found)) if found == id
        ));
    }

    #[test]
    fn test_config_id_base() {
        let mut config = Config::default();
        config.pending.id_base = 1000;
        let mut session: Session<()> = Session::new(&config);

        let (id, _) = session.prepare_call("ping", Value::Null, ()).unwrap();
        assert_eq!(id, RequestId(1001));
    }

    #[test]
    fn test_close_drains() {
        let mut session = session();
        let (a, _) = session.prepare_call("a", Value::Null, "a").unwrap();
        let (b, _) = session.prepare_call("b", Value::Null, "b").unwrap();

        assert_eq!(session.close(), vec![(a, "a"), (b, "b")]);
    }
}
