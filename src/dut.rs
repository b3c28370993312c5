use std::collections::VecDeque;

use crate::kernel::Kernel;
use crate::model::{self, Phase};

pub const PHASE_WIDTH: u32 = 12;
pub const SINCOS_WIDTH: u32 = 16;

/// A design evaluated by the in-process kernel.
pub trait Dut: Send {
    /// Name of the top-level scope.
    fn name(&self) -> &str;
    /// Declares the design's ports on the kernel.
    fn elaborate(&mut self, kernel: &Kernel);
    /// Handle of the clock input.
    fn clock(&self) -> usize;
    /// Evaluates one rising clock edge. Inputs are read as committed before the edge.
    fn rising_edge(&mut self, kernel: &Kernel);
}

#[derive(Debug, Clone, Copy, Default)]
struct Ports {
    clk: usize,
    phase: usize,
    phase_v: usize,
    sin: usize,
    cos: usize,
    sincos_v: usize,
}

/// Behavioral stand-in for the SinCosTable RTL.
///
/// Phase and valid are registered on the rising edge, the output registers load the table
/// value one edge later. A phase driven after falling edge `n` is therefore visible on the
/// outputs after falling edge `n + 2`.
pub struct SinCosTable {
    ports: Ports,
    // samples still travelling through the pipeline, oldest first
    stages: VecDeque<Option<Phase>>,
    calibration_offset: u32,
}

impl SinCosTable {
    pub fn new() -> Self {
        Self::with_depth(1)
    }

    /// `depth` is the number of register stages between input and output registers plus one.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            ports: Ports::default(),
            stages: std::iter::repeat(None).take(depth.max(1)).collect(),
            calibration_offset: 0,
        }
    }

    /// A miscalibrated table, evaluating every phase shifted by `offset`.
    pub fn with_calibration_offset(mut self, offset: u32) -> Self {
        self.calibration_offset = offset;
        self
    }
}

impl Default for SinCosTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Dut for SinCosTable {
    fn name(&self) -> &str {
        "sincos_table"
    }

    fn elaborate(&mut self, kernel: &Kernel) {
        self.ports = Ports {
            clk: kernel.declare("iCLK", 1),
            phase: kernel.declare("iPHASE", PHASE_WIDTH),
            phase_v: kernel.declare("iPHASE_V", 1),
            sin: kernel.declare("oSIN", SINCOS_WIDTH),
            cos: kernel.declare("oCOS", SINCOS_WIDTH),
            sincos_v: kernel.declare("oSINCOS_V", 1),
        };
    }

    fn clock(&self) -> usize {
        self.ports.clk
    }

    fn rising_edge(&mut self, kernel: &Kernel) {
        let p = self.ports;
        let sampled = match kernel.peek(p.phase_v) {
            Some(1) => kernel
                .peek(p.phase)
                .map(|v| Phase::wrapping(v as u32 + self.calibration_offset)),
            _ => None,
        };
        self.stages.push_back(sampled);
        match self.stages.pop_front().flatten() {
            Some(phase) => {
                kernel.poke(p.sin, Some(model::sin_value(phase) as u16 as u64));
                kernel.poke(p.cos, Some(model::cos_value(phase) as u16 as u64));
                kernel.poke(p.sincos_v, Some(1));
            }
            None => kernel.poke(p.sincos_v, Some(0)),
        }
    }
}
