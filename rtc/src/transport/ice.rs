use std::sync::Arc;

use shared::conn::Conn;
use shared::util::MatchFunc;

/// IceTransport is the connectivity layer a security transport runs on.
///
/// It demultiplexes one socket into endpoints. Each endpoint only receives
/// the datagrams its match function accepts.
pub trait IceTransport: Send + Sync {
    /// new_endpoint registers a new endpoint on the underlying mux.
    /// Returns `None` when the mux is gone or cannot hand out endpoints.
    fn new_endpoint(&self, match_fn: MatchFunc) -> Option<Arc<dyn Conn + Send + Sync>>;
}
