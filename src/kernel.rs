use num_format::{Locale, ToFormattedString};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::task::Waker;

use crate::error::{TbError, TbResult};
use crate::sim_if::{Level, ObjectKind, SimIf};
use crate::signal::mask;
use crate::tb_obj::TbObj;
use crate::trigger::{EdgeCallbacks, EdgeKind};

struct SignalSlot {
    name: String,
    kind: ObjectKind,
    value: Option<u64>,
    // testbench writes, applied by commit()
    pending: Option<u64>,
    rising: u64,
    falling: u64,
}

struct KernelInner {
    root: String,
    slots: Vec<SignalSlot>,
    names: BTreeMap<String, usize>,
    edges: EdgeCallbacks,
    time_ns: u64,
}

/// In-process cycle simulator kernel.
///
/// Holds the signal values of one design, the pending edge callbacks and simulation time.
/// Testbench writes through `SimIf::set_value` are deferred until `commit()`, which the simulator
/// calls once all tasks woken by an edge have run. The design itself writes with `poke()`, which
/// takes effect immediately.
pub struct Kernel {
    inner: TbObj<KernelInner>,
    verbosity: Level,
}

impl Kernel {
    pub fn new(root: &str, verbosity: Level) -> Arc<Self> {
        let mut names = BTreeMap::new();
        names.insert(root.to_string(), 0);
        let root_slot = SignalSlot {
            name: root.to_string(),
            kind: ObjectKind::Hier,
            value: None,
            pending: None,
            rising: 0,
            falling: 0,
        };
        Arc::new(Self {
            inner: TbObj::new(KernelInner {
                root: root.to_string(),
                slots: vec![root_slot],
                names,
                edges: EdgeCallbacks::new(),
                time_ns: 0,
            }),
            verbosity,
        })
    }

    /// Declares a signal below the root scope and returns its handle.
    pub fn declare(&self, name: &str, width: u32) -> usize {
        self.inner.with_mut(|k| {
            let full_name = format!("{}.{}", k.root, name);
            if let Some(&handle) = k.names.get(&full_name) {
                return handle;
            }
            let handle = k.slots.len();
            k.slots.push(SignalSlot {
                name: full_name.clone(),
                kind: ObjectKind::Int(width),
                value: None,
                pending: None,
                rising: 0,
                falling: 0,
            });
            k.names.insert(full_name, handle);
            handle
        })
    }

    pub fn peek(&self, handle: usize) -> Option<u64> {
        self.inner.get().slots.get(handle).and_then(|s| s.value)
    }

    pub fn poke(&self, handle: usize, value: Option<u64>) {
        self.inner.with_mut(|k| {
            if let Some(slot) = k.slots.get_mut(handle) {
                let width = match slot.kind {
                    ObjectKind::Int(w) => w,
                    ObjectKind::Hier => return,
                };
                slot.value = value.map(|v| v & mask(width));
            }
        })
    }

    /// Applies all deferred testbench writes.
    pub fn commit(&self) {
        self.inner.with_mut(|k| {
            for slot in k.slots.iter_mut() {
                if let Some(v) = slot.pending.take() {
                    slot.value = Some(v);
                }
            }
        })
    }

    /// Records an edge on `handle` and returns the wakers of the triggers it completes.
    pub fn react_edge(&self, handle: usize, edge: EdgeKind) -> Vec<Waker> {
        self.inner.with_mut(|k| {
            if let Some(slot) = k.slots.get_mut(handle) {
                match edge {
                    EdgeKind::Rising => slot.rising += 1,
                    EdgeKind::Falling => slot.falling += 1,
                    EdgeKind::Any => {}
                }
            }
            k.edges.react(handle, edge)
        })
    }

    pub fn advance(&self, ns: u64) {
        self.inner.with_mut(|k| k.time_ns += ns);
    }

    pub fn cancel_all_triggers(&self) {
        self.inner.with_mut(|k| k.edges.clear());
    }
}

impl SimIf for Kernel {
    fn get_handle_by_name(&self, name: &str) -> TbResult<(usize, ObjectKind)> {
        let k = self.inner.get();
        k.names
            .get(name)
            .map(|&h| (h, k.slots[h].kind))
            .ok_or_else(|| TbError::SignalNotFound(name.to_string()))
    }
    fn get_full_name(&self, handle: usize) -> String {
        self.inner
            .get()
            .slots
            .get(handle)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }
    fn get_value(&self, handle: usize) -> Option<u64> {
        self.peek(handle)
    }
    fn set_value(&self, handle: usize, value: u64) {
        self.inner.with_mut(|k| {
            if let Some(slot) = k.slots.get_mut(handle) {
                slot.pending = Some(value);
            }
        })
    }
    fn get_root_name(&self) -> String {
        self.inner.get().root.clone()
    }
    fn get_sim_time_steps(&self) -> u64 {
        self.inner.get().time_ns
    }
    fn edge_count(&self, handle: usize, edge: EdgeKind) -> u64 {
        self.inner.get().slots.get(handle).map_or(0, |s| match edge {
            EdgeKind::Rising => s.rising,
            EdgeKind::Falling => s.falling,
            EdgeKind::Any => s.rising + s.falling,
        })
    }
    fn register_edge_callback(&self, handle: usize, edge: EdgeKind, waker: Waker) {
        self.inner.with_mut(|k| k.edges.register(handle, edge, waker))
    }
    fn log(&self, level: Level, source: &str, msg: &str) {
        if level < self.verbosity {
            return;
        }
        let t = self.get_sim_time_steps();
        eprintln!(
            "{:>12}ns {:<8} {:<24} {}",
            t.to_formatted_string(&Locale::en),
            level,
            source,
            msg
        );
    }
}
