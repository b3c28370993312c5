use std::fmt;

use crate::error::{TbError, TbResult};
use crate::sim_if::{ObjectKind, SimRef};
use crate::trigger::Trigger;

/// Handle to an object (scope or signal) of the design under test.
#[derive(Clone)]
pub struct SimObject {
    pub(crate) handle: usize,
    pub(crate) kind: ObjectKind,
    pub(crate) sim: SimRef,
}

impl fmt::Debug for SimObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimObject")
            .field("name", &self.name())
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

impl SimObject {
    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.sim.get_full_name(self.handle)
    }

    pub fn size(&self) -> u32 {
        match self.kind {
            ObjectKind::Int(size) => size,
            ObjectKind::Hier => 0,
        }
    }

    pub fn has_value(&self) -> bool {
        matches!(self.kind, ObjectKind::Int(_))
    }

    pub fn from_name(sim: &SimRef, full_name: &str) -> TbResult<Self> {
        let (handle, kind) = sim.get_handle_by_name(full_name)?;
        Ok(SimObject {
            handle,
            kind,
            sim: sim.clone(),
        })
    }

    pub fn get_child(&self, name: &str) -> TbResult<Self> {
        let mut child_name = self.name();
        child_name.push('.');
        child_name.push_str(name);
        SimObject::from_name(&self.sim, &child_name)
    }

    /// Child signal that must exist with exactly `width` bits.
    pub fn port(&self, name: &str, width: u32) -> TbResult<Self> {
        let child = self.get_child(name)?;
        if !child.has_value() {
            return Err(TbError::NotASignal(child.name()));
        }
        if child.size() != width {
            return Err(TbError::WidthMismatch {
                name: child.name(),
                expected: width,
                actual: child.size(),
            });
        }
        Ok(child)
    }

    pub fn sim(&self) -> &SimRef {
        &self.sim
    }

    // Unresolved bits read as zero.
    pub fn u32(&self) -> u32 {
        self.u64() as u32
    }

    pub fn u64(&self) -> u64 {
        self.sim.get_value(self.handle).unwrap_or(0)
    }

    /// Two's complement interpretation using the signal width.
    pub fn i32(&self) -> i32 {
        sign_extend(self.u64(), self.size()) as i32
    }

    pub fn is_resolved(&self) -> bool {
        self.sim.get_value(self.handle).is_some()
    }

    pub fn set_u32(&self, val: u32) {
        self.set_u64(val as u64)
    }

    fn set_u64(&self, val: u64) {
        self.sim.set_value(self.handle, val & mask(self.size()))
    }

    pub fn bin(&self) -> String {
        match self.sim.get_value(self.handle) {
            Some(v) => format!("{:0width$b}", v, width = self.size() as usize),
            None => "x".repeat(self.size() as usize),
        }
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(&self) -> Trigger {
        Trigger::rising_edge(self.clone())
    }
    pub fn falling_edge(&self) -> Trigger {
        Trigger::falling_edge(self.clone())
    }
}

pub(crate) fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

pub(crate) fn sign_extend(value: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension_uses_width() {
        assert_eq!(sign_extend(0x7FFF, 16), 32767);
        assert_eq!(sign_extend(0x8001, 16), -32767);
        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(sign_extend(0x1, 1), -1);
        assert_eq!(mask(12), 0xFFF);
        assert_eq!(mask(64), u64::MAX);
    }
}
