use intmap::IntMap;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::signal::SimObject;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // Rising and falling waiters share one callback list per signal, so waking needs to know which
    // edge each one waits for.
    edge_kind: EdgeKind,
}

/// Pending edge callbacks, keyed by signal handle.
pub(crate) struct EdgeCallbacks {
    // IntMap specializes on u64 keys and doesn't need to calculate a hash
    map: IntMap<VecDeque<TrigShared>>,
}

impl EdgeCallbacks {
    pub(crate) fn new() -> Self {
        Self { map: IntMap::new() }
    }

    pub(crate) fn register(&mut self, sig_hdl: usize, edge_kind: EdgeKind, waker: Waker) {
        let shared = TrigShared { waker, edge_kind };
        if let Some(callbacks) = self.map.get_mut(sig_hdl as u64) {
            callbacks.push_back(shared);
        } else {
            let mut vec = VecDeque::new();
            vec.push_back(shared);
            self.map.insert(sig_hdl as u64, vec);
        }
    }

    /// Removes and returns the wakers of everything waiting for `edge` on the signal. Waiters for
    /// the opposite edge stay registered.
    pub(crate) fn react(&mut self, sig_hdl: usize, edge: EdgeKind) -> Vec<Waker> {
        let mut wake = Vec::new();
        if let Some(callbacks) = self.map.get_mut(sig_hdl as u64) {
            let mut resched = VecDeque::with_capacity(callbacks.len());
            for trig in callbacks.drain(..) {
                if edge == EdgeKind::Any || trig.edge_kind == EdgeKind::Any || trig.edge_kind == edge {
                    wake.push(trig.waker);
                } else {
                    resched.push_back(trig);
                }
            }
            *callbacks = resched;
        }
        wake
    }

    #[cfg(test)]
    pub(crate) fn pending(&self, sig_hdl: usize) -> usize {
        self.map.get(sig_hdl as u64).map_or(0, |c| c.len())
    }

    pub(crate) fn clear(&mut self) {
        self.map = IntMap::new();
    }
}

/// Future resolving on the next edge of a signal after it was first polled.
///
/// Completion is decided by the simulator's edge counter, not by the wake-up itself, so spurious
/// wake-ups of the owning task do not complete the trigger early.
pub struct Trigger {
    signal: SimObject,
    edge: EdgeKind,
    armed_at: Option<u64>,
}

impl Trigger {
    pub fn rising_edge(signal: SimObject) -> Self {
        Self::new(signal, EdgeKind::Rising)
    }
    pub fn falling_edge(signal: SimObject) -> Self {
        Self::new(signal, EdgeKind::Falling)
    }
    fn new(signal: SimObject, edge: EdgeKind) -> Self {
        Trigger {
            signal,
            edge,
            armed_at: None,
        }
    }
}

impl Future for Trigger {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let sim = self.signal.sim.clone();
        let handle = self.signal.handle;
        let seen = sim.edge_count(handle, self.edge);
        match self.armed_at {
            Some(armed) if seen > armed => Poll::Ready(()),
            _ => {
                if self.armed_at.is_none() {
                    self.armed_at = Some(seen);
                }
                sim.register_edge_callback(handle, self.edge, cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;

    #[test]
    fn react_keeps_opposite_edge_waiters() {
        let mut cbs = EdgeCallbacks::new();
        cbs.register(3, EdgeKind::Falling, noop_waker());
        cbs.register(3, EdgeKind::Rising, noop_waker());
        cbs.register(3, EdgeKind::Any, noop_waker());
        assert_eq!(cbs.react(3, EdgeKind::Rising).len(), 2);
        assert_eq!(cbs.pending(3), 1);
        assert_eq!(cbs.react(3, EdgeKind::Falling).len(), 1);
        assert_eq!(cbs.pending(3), 0);
        assert!(cbs.react(7, EdgeKind::Rising).is_empty());
    }
}
