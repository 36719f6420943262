//! Payloads that follow the INIT, POSDATA and FORCEREADY tokens.
//!
//! Message structs hold values exactly as they travel, in wire units. The
//! `into_*` / `from_*` conversions are the only place where those numbers cross
//! into or out of SI.

use super::wire::{self, FramingError, WireBuffer};
use crate::core::models::cell::SimulationCell;
use crate::core::models::configuration::AtomicConfiguration;
use crate::core::models::forces::ForceResult;
use crate::core::units::WireUnits;
use nalgebra::{Matrix3, Point3, Vector3};
use std::io::Read;

/// Payload of `INIT`: the replica index and a server-specified string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitMessage {
    pub replica: i32,
    pub info: Vec<u8>,
}

impl InitMessage {
    pub fn decode(reader: &mut impl Read) -> Result<Self, FramingError> {
        let replica = wire::read_i32(reader, "replica index")?;
        let info = wire::read_prefixed_bytes(reader, "init string")?;
        Ok(Self { replica, info })
    }

    pub fn encode(&self, buf: &mut WireBuffer) -> Result<(), FramingError> {
        buf.put_i32(self.replica);
        buf.put_count(self.info.len(), "init string")?;
        buf.put_bytes(&self.info);
        Ok(())
    }

    pub fn info_lossy(&self) -> String {
        String::from_utf8_lossy(&self.info).into_owned()
    }
}

/// Payload of `POSDATA`, in wire units.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMessage {
    pub cell: Matrix3<f64>,
    pub inverse: Matrix3<f64>,
    pub positions: Vec<Vector3<f64>>,
}

impl PositionMessage {
    /// Decodes cell, inverse cell, atom count and that many position triples.
    pub fn decode(reader: &mut impl Read, max_atoms: usize) -> Result<Self, FramingError> {
        let cell = wire::read_matrix3(reader, "cell matrix")?;
        let inverse = wire::read_matrix3(reader, "inverse cell matrix")?;
        let natoms = wire::read_atom_count(reader, max_atoms, "atom count")?;
        let positions = wire::read_vectors(reader, natoms, "positions")?;
        Ok(Self {
            cell,
            inverse,
            positions,
        })
    }

    pub fn encode(&self, buf: &mut WireBuffer) -> Result<(), FramingError> {
        buf.put_matrix3(&self.cell).put_matrix3(&self.inverse);
        buf.put_count(self.positions.len(), "atom count")?;
        buf.put_vectors(&self.positions);
        Ok(())
    }

    pub fn into_configuration(self, units: &WireUnits) -> AtomicConfiguration {
        let length = units.length_factor();
        let cell = SimulationCell::from_parts(self.cell, self.inverse).scaled(length);
        let positions = self
            .positions
            .into_iter()
            .map(|r| Point3::from(r * length))
            .collect();
        AtomicConfiguration::new(cell, positions)
    }

    pub fn from_configuration(configuration: &AtomicConfiguration, units: &WireUnits) -> Self {
        let cell = configuration.cell().scaled(1.0 / units.length_factor());
        let length = units.length_factor();
        Self {
            cell: *cell.matrix(),
            inverse: *cell.inverse(),
            positions: configuration
                .positions()
                .iter()
                .map(|p| p.coords / length)
                .collect(),
        }
    }
}

/// Payload of `FORCEREADY`, in wire units.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceMessage {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
    pub virial: Matrix3<f64>,
    pub extra: Vec<u8>,
}

impl ForceMessage {
    pub fn encode(&self, buf: &mut WireBuffer) -> Result<(), FramingError> {
        buf.put_f64(self.energy);
        buf.put_count(self.forces.len(), "atom count")?;
        buf.put_vectors(&self.forces).put_matrix3(&self.virial);
        buf.put_count(self.extra.len(), "extra string")?;
        buf.put_bytes(&self.extra);
        Ok(())
    }

    pub fn decode(reader: &mut impl Read, max_atoms: usize) -> Result<Self, FramingError> {
        let energy = wire::read_f64(reader, "energy")?;
        let natoms = wire::read_atom_count(reader, max_atoms, "atom count")?;
        let forces = wire::read_vectors(reader, natoms, "forces")?;
        let virial = wire::read_matrix3(reader, "virial")?;
        let extra = wire::read_prefixed_bytes(reader, "extra string")?;
        Ok(Self {
            energy,
            forces,
            virial,
            extra,
        })
    }

    pub fn from_result(result: &ForceResult, units: &WireUnits) -> Self {
        let energy = units.energy_factor();
        let force = units.force_factor();
        Self {
            energy: result.energy / energy,
            forces: result.forces.iter().map(|f| f / force).collect(),
            virial: result.virial / energy,
            extra: result.extra.as_bytes().to_vec(),
        }
    }

    pub fn into_result(self, units: &WireUnits) -> ForceResult {
        let energy = units.energy_factor();
        let force = units.force_factor();
        ForceResult {
            energy: self.energy * energy,
            forces: self.forces.into_iter().map(|f| f * force).collect(),
            virial: self.virial * energy,
            extra: String::from_utf8_lossy(&self.extra).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::{BOHR, HARTREE};
    use std::io::Cursor;

    fn f64_relative_equal(a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        ((a - b) / a.abs().max(b.abs())).abs() < 1e-12
    }

    fn sample_positions(n: usize) -> Vec<Vector3<f64>> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                Vector3::new(x, -0.5 * x, 1e-3 * x + 0.25)
            })
            .collect()
    }

    #[test]
    fn position_and_force_messages_survive_the_wire_for_various_sizes() {
        for n in [0usize, 1, 1000] {
            let positions = PositionMessage {
                cell: Matrix3::new(10.0, 0.1, 0.0, 0.0, 9.0, 0.2, 0.0, 0.0, 8.0),
                inverse: Matrix3::new(0.1, 0.0, 0.0, 0.0, 0.11, 0.0, 0.0, 0.0, 0.125),
                positions: sample_positions(n),
            };
            let mut buf = WireBuffer::new();
            positions.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), 2 * 72 + 4 + 24 * n);
            let decoded = PositionMessage::decode(&mut Cursor::new(buf.into_bytes()), n).unwrap();
            assert_eq!(decoded, positions);

            let forces = ForceMessage {
                energy: -1.25,
                forces: sample_positions(n),
                virial: Matrix3::from_fn(|i, j| (i * 3 + j) as f64),
                extra: b"{\"dipole\": [0, 0, 1]}".to_vec(),
            };
            let mut buf = WireBuffer::new();
            forces.encode(&mut buf).unwrap();
            let decoded = ForceMessage::decode(&mut Cursor::new(buf.into_bytes()), n).unwrap();
            assert_eq!(decoded, forces);
        }
    }

    #[test]
    fn position_decode_fails_when_fewer_triples_follow_than_declared() {
        let mut buf = WireBuffer::new();
        buf.put_matrix3(&Matrix3::identity())
            .put_matrix3(&Matrix3::identity())
            .put_i32(3)
            .put_vectors(&sample_positions(2));
        let err = PositionMessage::decode(&mut Cursor::new(buf.into_bytes()), 100).unwrap_err();
        assert!(matches!(
            err,
            FramingError::ShortRead {
                context: "positions",
                expected: 72,
                received: 48,
            }
        ));
    }

    #[test]
    fn init_message_decodes_replica_and_string() {
        let message = InitMessage {
            replica: 3,
            info: b"<bead index='3'/>".to_vec(),
        };
        let mut buf = WireBuffer::new();
        message.encode(&mut buf).unwrap();
        let decoded = InitMessage::decode(&mut Cursor::new(buf.into_bytes())).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.info_lossy(), "<bead index='3'/>");
    }

    #[test]
    fn into_configuration_converts_atomic_units_to_meters() {
        let message = PositionMessage {
            cell: Matrix3::from_diagonal_element(10.0),
            inverse: Matrix3::from_diagonal_element(0.1),
            positions: vec![Vector3::new(1.0, 2.0, 0.0)],
        };
        let configuration = message.into_configuration(&WireUnits::atomic());

        assert!(f64_relative_equal(
            configuration.cell().matrix()[(0, 0)],
            10.0 * BOHR
        ));
        assert!(f64_relative_equal(
            configuration.cell().inverse()[(0, 0)],
            0.1 / BOHR
        ));
        assert!(f64_relative_equal(configuration.positions()[0].y, 2.0 * BOHR));
    }

    #[test]
    fn from_result_converts_si_to_atomic_units() {
        let result = ForceResult::new(2.0 * HARTREE, vec![Vector3::new(HARTREE / BOHR, 0.0, 0.0)])
            .with_virial(Matrix3::from_diagonal_element(HARTREE));
        let message = ForceMessage::from_result(&result, &WireUnits::atomic());

        assert!(f64_relative_equal(message.energy, 2.0));
        assert!(f64_relative_equal(message.forces[0].x, 1.0));
        assert!(f64_relative_equal(message.virial[(2, 2)], 1.0));
        assert!(message.extra.is_empty());
    }

    #[test]
    fn si_wire_units_leave_values_untouched() {
        let result = ForceResult::new(1.0, vec![Vector3::new(0.5, -0.5, 2.0)]).with_extra("x");
        let message = ForceMessage::from_result(&result, &WireUnits::si());
        assert_eq!(message.energy, 1.0);
        assert_eq!(message.forces[0], Vector3::new(0.5, -0.5, 2.0));
        assert_eq!(message.into_result(&WireUnits::si()), result);
    }

    #[test]
    fn from_configuration_inverts_into_configuration() {
        let message = PositionMessage {
            cell: Matrix3::from_diagonal_element(12.0),
            inverse: Matrix3::from_diagonal_element(1.0 / 12.0),
            positions: vec![Vector3::new(1.0, -2.0, 3.0)],
        };
        let units = WireUnits::atomic();
        let back = PositionMessage::from_configuration(&message.clone().into_configuration(&units), &units);
        assert!((back.cell - message.cell).abs().max() < 1e-9);
        assert!((back.positions[0] - message.positions[0]).norm() < 1e-9);
    }
}
