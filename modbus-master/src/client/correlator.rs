use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{NoSuchPending, RequestError};
use crate::frame::CorrelationId;
use crate::pdu::Response;

/// Value handed to a pending call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// decoded response PDU
    Response(Response),
    /// the endpoint finished connecting, only delivered to [`CorrelationId::Handshake`]
    Connected,
}

type Slot = oneshot::Sender<Result<Delivery, RequestError>>;

struct Entry {
    key: u64,
    slot: Slot,
}

#[derive(Default)]
struct Registry {
    next_key: u64,
    pending: HashMap<CorrelationId, Entry>,
}

/// Registry of calls waiting for their response
///
/// At most one call waits under each [`CorrelationId`]. Registration and
/// delivery happen on different tasks.
#[derive(Default)]
pub struct Correlator {
    registry: Mutex<Registry>,
}

impl Correlator {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `id` for a new call
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> Result<PendingCall, RequestError> {
        let mut registry = self.lock();
        if registry.pending.contains_key(&id) {
            return Err(RequestError::DuplicatePending(id));
        }
        let key = registry.next_key;
        registry.next_key = registry.next_key.wrapping_add(1);
        let (slot, receiver) = oneshot::channel();
        registry.pending.insert(id, Entry { key, slot });
        Ok(PendingCall {
            id,
            key,
            receiver,
            correlator: Arc::clone(self),
        })
    }

    /// Resolve the call waiting under `id`
    pub fn deliver(
        &self,
        id: CorrelationId,
        value: Result<Delivery, RequestError>,
    ) -> Result<(), NoSuchPending> {
        let entry = self.lock().pending.remove(&id).ok_or(NoSuchPending(id))?;
        // the receiver may be mid-drop, its entry is already gone either way
        entry.slot.send(value).ok();
        Ok(())
    }

    /// Resolve the call waiting under `id` with `Cancelled`
    pub fn cancel(&self, id: CorrelationId) -> bool {
        match self.lock().pending.remove(&id) {
            Some(entry) => {
                entry.slot.send(Err(RequestError::Cancelled)).ok();
                true
            }
            None => false,
        }
    }

    /// Resolve every waiting call with `err`, returning how many there were
    pub fn fail_all(&self, err: RequestError) -> usize {
        let entries: Vec<Entry> = self.lock().pending.drain().map(|(_, e)| e).collect();
        let count = entries.len();
        for entry in entries {
            entry.slot.send(Err(err)).ok();
        }
        count
    }

    /// Number of calls currently waiting
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn remove_if_owned(&self, id: CorrelationId, key: u64) {
        let mut registry = self.lock();
        if registry.pending.get(&id).map(|e| e.key) == Some(key) {
            registry.pending.remove(&id);
        }
    }
}

/// A registered call, dropping it frees its id
pub struct PendingCall {
    id: CorrelationId,
    key: u64,
    receiver: oneshot::Receiver<Result<Delivery, RequestError>>,
    correlator: Arc<Correlator>,
}

impl PendingCall {
    /// Id the call is registered under
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Wait for the delivery, giving up after `timeout`
    pub async fn wait(mut self, timeout: Duration) -> Result<Delivery, RequestError> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => Err(RequestError::Shutdown),
            Err(_) => {
                self.correlator.remove_if_owned(self.id, self.key);
                Err(RequestError::Timeout)
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.correlator.remove_if_owned(self.id, self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CorrelationId::{Function, Handshake, Transaction};

    #[test]
    fn duplicate_registration_is_rejected() {
        let correlator = Correlator::new();
        let _first = correlator.register(Function(0x03)).unwrap();
        assert!(matches!(
            correlator.register(Function(0x03)),
            Err(RequestError::DuplicatePending(Function(0x03)))
        ));
        assert!(correlator.register(Function(0x04)).is_ok());
    }

    #[test]
    fn delivery_to_unknown_id_is_harmless() {
        let correlator = Correlator::new();
        assert_eq!(
            correlator.deliver(Transaction(9), Ok(Delivery::Connected)),
            Err(NoSuchPending(Transaction(9)))
        );
    }

    #[tokio::test]
    async fn delivered_value_reaches_the_waiter() {
        let correlator = Correlator::new();
        let call = correlator.register(Transaction(1)).unwrap();
        let response = Response::ReadExceptionStatus(0x55);
        correlator
            .deliver(Transaction(1), Ok(Delivery::Response(response.clone())))
            .unwrap();
        assert_eq!(
            call.wait(Duration::from_secs(1)).await,
            Ok(Delivery::Response(response))
        );
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undelivered_call_times_out_and_frees_its_id() {
        let correlator = Correlator::new();
        let call = correlator.register(Transaction(2)).unwrap();
        assert_eq!(
            call.wait(Duration::from_secs(5)).await,
            Err(RequestError::Timeout)
        );
        assert_eq!(correlator.pending(), 0);
        assert_eq!(
            correlator.deliver(Transaction(2), Ok(Delivery::Connected)),
            Err(NoSuchPending(Transaction(2)))
        );
        assert!(correlator.register(Transaction(2)).is_ok());
    }

    #[test]
    fn dropped_call_frees_its_id() {
        let correlator = Correlator::new();
        let call = correlator.register(Handshake).unwrap();
        drop(call);
        assert_eq!(correlator.pending(), 0);
        assert!(correlator.register(Handshake).is_ok());
    }

    #[test]
    fn stale_drop_keeps_newer_registration() {
        let correlator = Correlator::new();
        let first = correlator.register(Function(1)).unwrap();
        correlator.cancel(Function(1));
        let _second = correlator.register(Function(1)).unwrap();
        drop(first);
        assert_eq!(correlator.pending(), 1);
    }

    #[tokio::test]
    async fn cancelled_call_resolves_with_cancelled() {
        let correlator = Correlator::new();
        let call = correlator.register(Function(5)).unwrap();
        assert!(correlator.cancel(Function(5)));
        assert!(!correlator.cancel(Function(5)));
        assert_eq!(
            call.wait(Duration::from_secs(1)).await,
            Err(RequestError::Cancelled)
        );
    }

    #[tokio::test]
    async fn fail_all_resolves_every_waiter() {
        let correlator = Correlator::new();
        let a = correlator.register(Transaction(1)).unwrap();
        let b = correlator.register(Transaction(2)).unwrap();
        assert_eq!(correlator.fail_all(RequestError::Disconnected), 2);
        assert_eq!(
            a.wait(Duration::from_secs(1)).await,
            Err(RequestError::Disconnected)
        );
        assert_eq!(
            b.wait(Duration::from_secs(1)).await,
            Err(RequestError::Disconnected)
        );
    }
}
