use super::cell::SimulationCell;
use nalgebra::Point3;

/// The atomic positions and cell of one step, in meters.
///
/// The atom count is the length of `positions`; the wire decoder guarantees it
/// equals the count declared in the POSDATA header.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicConfiguration {
    cell: SimulationCell,
    positions: Vec<Point3<f64>>,
}

impl AtomicConfiguration {
    pub fn new(cell: SimulationCell, positions: Vec<Point3<f64>>) -> Self {
        Self { cell, positions }
    }

    pub fn cell(&self) -> &SimulationCell {
        &self.cell
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
