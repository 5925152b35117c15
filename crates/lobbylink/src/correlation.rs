//! Correlation of outbound sequence ids with one-shot response handlers.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::command::{InboundCommand, ResponseHandler, SessionContext};

/// Maps an outgoing message's sequence id to its pending response handler.
///
/// Entries are created *before* the bytes leave the transport, so a fast
/// response can never race its own registration. An entry lives until a
/// matching response is fully handled — there is no eviction. A server
/// that never answers therefore grows this table; that is the documented
/// contract, observable via [`len`](Self::len), not masked by a timeout.
#[derive(Default)]
pub struct CorrelationTable {
    pending: HashMap<u64, ResponseHandler>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given sequence id.
    ///
    /// Ids are assigned from a monotonic counter and never reused while
    /// pending, so a collision here means the engine broke that
    /// invariant — the old handler is replaced and the event logged.
    pub fn register(&mut self, seq: u64, handler: ResponseHandler) {
        if self.pending.insert(seq, handler).is_some() {
            warn!(seq, "replaced a still-pending response handler");
        }
    }

    /// Routes a response carrying `seq` to its pending handler, if any.
    ///
    /// Returns `true` when a handler existed and reported "fully handled"
    /// (the entry is removed). A handler that declines keeps its entry
    /// and will see the next message with the same id.
    pub fn dispatch(
        &mut self,
        seq: u64,
        command: &dyn InboundCommand,
        ctx: &mut SessionContext,
    ) -> bool {
        let Some(handler) = self.pending.get_mut(&seq) else {
            return false;
        };
        let handled = handler(command, ctx);
        trace!(seq, keyword = command.keyword(), handled, "correlated response");
        if handled {
            self.pending.remove(&seq);
        }
        handled
    }

    /// Pending handlers awaiting a response.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::commands::inbound::Pong;

    fn counting_handler(
        calls: Arc<AtomicUsize>,
        handled_after: usize,
    ) -> ResponseHandler {
        Box::new(move |_cmd, _ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            n >= handled_after
        })
    }

    #[test]
    fn test_dispatch_without_entry_is_not_handled() {
        let mut table = CorrelationTable::new();
        let mut ctx = SessionContext::new();
        assert!(!table.dispatch(7, &Pong, &mut ctx));
    }

    #[test]
    fn test_handled_response_removes_entry() {
        let mut table = CorrelationTable::new();
        let mut ctx = SessionContext::new();
        let calls = Arc::new(AtomicUsize::new(0));
        table.register(1, counting_handler(Arc::clone(&calls), 1));

        assert!(table.dispatch(1, &Pong, &mut ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());

        // The handler must never run again after removal.
        assert!(!table.dispatch(1, &Pong, &mut ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_declined_response_keeps_entry() {
        let mut table = CorrelationTable::new();
        let mut ctx = SessionContext::new();
        let calls = Arc::new(AtomicUsize::new(0));
        // Declines the first message, handles the second.
        table.register(3, counting_handler(Arc::clone(&calls), 2));

        assert!(!table.dispatch(3, &Pong, &mut ctx));
        assert_eq!(table.len(), 1);

        assert!(table.dispatch(3, &Pong, &mut ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_entries_are_independent_per_id() {
        let mut table = CorrelationTable::new();
        let mut ctx = SessionContext::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        table.register(1, counting_handler(Arc::clone(&a), 1));
        table.register(2, counting_handler(Arc::clone(&b), 1));

        assert!(table.dispatch(2, &Pong, &mut ctx));
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unmatched_entry_is_retained_forever() {
        let mut table = CorrelationTable::new();
        let mut ctx = SessionContext::new();
        table.register(9, Box::new(|_, _| true));

        // Traffic on other ids never disturbs the entry.
        for seq in 0..100 {
            if seq != 9 {
                table.dispatch(seq, &Pong, &mut ctx);
            }
        }
        assert_eq!(table.len(), 1);
    }
}
