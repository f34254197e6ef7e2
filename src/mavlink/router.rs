//! # Packet Router
//!
//! Routes parsed MAVLink frames to registered handlers by message id.
//!
//! The handler table is a plain map of function values; the message set is
//! closed and known at build time, so no virtual dispatch is involved. An
//! id without a handler is normal traffic and is skipped silently.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::decoder::MavParser;
use super::protocol::MavFrame;

/// Handler invoked with the dispatch target and the decoded frame
pub type PacketHandler<T> = fn(&mut T, &MavFrame);

/// Inbound byte-stream dispatcher
///
/// Owns the streaming parser and the message-id -> handler table. `T` is the
/// state the handlers mutate; keeping it external avoids the router
/// borrowing what its handlers write to.
pub struct PacketRouter<T> {
    parser: MavParser,
    handlers: HashMap<u8, PacketHandler<T>>,
    /// Parser drop total as of the last cleanly dispatched frame
    last_drop_count: u64,
}

impl<T> std::fmt::Debug for PacketRouter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketRouter")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("last_drop_count", &self.last_drop_count)
            .finish_non_exhaustive()
    }
}

impl<T> Default for PacketRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PacketRouter<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: MavParser::new(),
            handlers: HashMap::new(),
            last_drop_count: 0,
        }
    }

    /// Registers a handler for a message id, replacing any previous one.
    pub fn register(&mut self, msg_id: u8, handler: PacketHandler<T>) {
        self.handlers.insert(msg_id, handler);
    }

    /// Parses a received chunk and dispatches every complete frame.
    ///
    /// If the parser's drop count rises mid-chunk the rest of the chunk is
    /// discarded; the stream resynchronizes on the next call. Frames with
    /// no registered handler are ignored.
    pub fn feed(&mut self, chunk: &[u8], target: &mut T) {
        for &byte in chunk {
            let parsed = self.parser.push_byte(byte);

            if self.parser.drop_count() > self.last_drop_count {
                self.last_drop_count = self.parser.drop_count();
                debug!(
                    drops = self.last_drop_count,
                    "framing fault, discarding rest of chunk"
                );
                return;
            }

            if let Some(frame) = parsed {
                match self.handlers.get(&frame.msg_id) {
                    Some(handler) => handler(target, &frame),
                    None => trace!(msg_id = frame.msg_id, "no handler registered, ignoring"),
                }
            }
        }
    }

    /// Total frames dropped by the underlying parser.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.parser.drop_count()
    }
}
