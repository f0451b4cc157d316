//! Joint-to-motor coupling matrix
//!
//! Mechanically linked joints (differential wrists, tendon-driven shoulders)
//! share motors, so motor-space positions are a linear map of joint-space
//! positions. The map is block-diagonal: each group of coupled joints forms a
//! `k x k` block and groups never couple to each other.
//!
//! The driver publishes the map as a list of blocks in joint order. Blocks are
//! placed along the diagonal of an identity matrix of the configured size:
//!
//! ```text
//! blocks [a b c d], [e]  ->  | a b 0 |
//!                            | c d 0 |
//!                            | 0 0 e |
//! ```

use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Coupling matrix with its derived forms
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingMatrix {
    forward: DMatrix<f64>,
    transpose: DMatrix<f64>,
    inverse: DMatrix<f64>,
    inverse_transpose: DMatrix<f64>,
}

impl CouplingMatrix {
    /// Derive transpose and inverse from a square forward matrix
    pub fn from_forward(forward: DMatrix<f64>) -> Result<Self> {
        let size = forward.nrows();
        if forward.ncols() != size {
            return Err(Error::MatrixInversion { size });
        }

        let inverse = forward
            .clone()
            .lu()
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .ok_or(Error::MatrixInversion { size })?;

        Ok(Self {
            transpose: forward.transpose(),
            inverse_transpose: inverse.transpose(),
            forward,
            inverse,
        })
    }

    /// Uncoupled joints
    pub fn identity(size: usize) -> Self {
        let forward = DMatrix::identity(size, size);
        Self {
            transpose: forward.clone(),
            inverse: forward.clone(),
            inverse_transpose: forward.clone(),
            forward,
        }
    }

    /// Matrix dimension
    pub fn size(&self) -> usize {
        self.forward.nrows()
    }

    pub fn forward(&self) -> &DMatrix<f64> {
        &self.forward
    }

    pub fn transpose(&self) -> &DMatrix<f64> {
        &self.transpose
    }

    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.inverse
    }

    pub fn inverse_transpose(&self) -> &DMatrix<f64> {
        &self.inverse_transpose
    }

    /// Joint-space vector in motor units: `(M * joint) .* gearbox`
    pub fn joint_to_motor(&self, joint: &DVector<f64>, gearbox: &DVector<f64>) -> DVector<f64> {
        (&self.forward * joint).component_mul(gearbox)
    }

    /// Motor-space vector in joint units: `(M^-1 * motor) ./ gearbox`
    pub fn motor_to_joint(&self, motor: &DVector<f64>, gearbox: &DVector<f64>) -> DVector<f64> {
        (&self.inverse * motor).component_div(gearbox)
    }
}

/// Side length of a `k*k` block
fn block_side(block: usize, len: usize) -> Result<usize> {
    let k = (len as f64).sqrt().round() as usize;
    if k * k != len {
        return Err(Error::MatrixShape { block, len });
    }
    Ok(k)
}

/// Build the coupling matrix from its block description
///
/// Values of each block are row-major. Entries that would land outside the
/// `size x size` matrix are dropped; the part may publish blocks for joints
/// that are not under test.
pub fn build_coupling_matrix(blocks: &[Vec<f64>], size: usize) -> Result<CouplingMatrix> {
    let mut forward = DMatrix::<f64>::identity(size, size);
    let mut offset = 0;

    for (i, values) in blocks.iter().enumerate() {
        let k = block_side(i, values.len())?;

        for r in 0..k {
            for c in 0..k {
                let (row, col) = (offset + r, offset + c);
                if row < size && col < size {
                    forward[(row, col)] = values[r * k + c];
                }
            }
        }

        if offset + k > size {
            log::warn!(
                "Coupling block {} ({}x{}) at offset {} exceeds matrix size {}, clipped",
                i,
                k,
                k,
                offset,
                size
            );
        }
        offset += k;
    }

    CouplingMatrix::from_forward(forward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wrist_blocks() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 0.0, 0.0, -1.0, 1.6455, 0.0, -1.0, 1.6455, 1.6455],
            vec![0.5, 0.5, -0.5, 0.5],
        ]
    }

    #[test]
    fn test_block_placement() {
        let blocks = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0]];
        let m = build_coupling_matrix(&blocks, 3).unwrap();
        let f = m.forward();

        assert_eq!(f[(0, 0)], 1.0);
        assert_eq!(f[(0, 1)], 2.0);
        assert_eq!(f[(1, 0)], 3.0);
        assert_eq!(f[(1, 1)], 4.0);
        assert_eq!(f[(2, 2)], 5.0);
        for (r, c) in [(0, 2), (1, 2), (2, 0), (2, 1)] {
            assert_eq!(f[(r, c)], 0.0, "cross term ({}, {})", r, c);
        }
    }

    #[test]
    fn test_no_blocks_is_identity() {
        let m = build_coupling_matrix(&[], 4).unwrap();
        assert_eq!(m, CouplingMatrix::identity(4));
    }

    #[test]
    fn test_trailing_joints_stay_identity() {
        let blocks = vec![vec![2.0]];
        let m = build_coupling_matrix(&blocks, 3).unwrap();
        assert_eq!(m.forward()[(0, 0)], 2.0);
        assert_eq!(m.forward()[(1, 1)], 1.0);
        assert_eq!(m.forward()[(2, 2)], 1.0);
    }

    #[test]
    fn test_round_trip_identity() {
        let m = build_coupling_matrix(&wrist_blocks(), 5).unwrap();
        let product = m.forward() * m.inverse();
        let identity = DMatrix::<f64>::identity(5, 5);
        for (a, b) in product.iter().zip(identity.iter()) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_transform_inverse_property() {
        let m = build_coupling_matrix(&wrist_blocks(), 5).unwrap();
        let joint = DVector::from_vec(vec![-30.0, 30.0, 10.0, 5.0, -12.5]);

        let recovered = m.inverse() * (m.forward() * &joint);
        assert_relative_eq!(recovered, joint, epsilon = 1e-9);

        // A common gearbox ratio cancels between the two directions
        let gearbox = DVector::from_element(5, 100.0);
        let motor = m.joint_to_motor(&joint, &gearbox);
        assert_relative_eq!(m.motor_to_joint(&motor, &gearbox), joint, epsilon = 1e-9);
    }

    #[test]
    fn test_transpose_forms() {
        let m = build_coupling_matrix(&wrist_blocks(), 5).unwrap();
        assert_eq!(m.transpose(), &m.forward().transpose());
        assert_eq!(m.inverse_transpose(), &m.inverse().transpose());
    }

    #[test]
    fn test_non_square_block_rejected() {
        let blocks = vec![vec![1.0, 0.0, 0.0, 1.0], vec![1.0, 2.0, 3.0]];
        let err = build_coupling_matrix(&blocks, 4).unwrap_err();
        assert!(matches!(err, Error::MatrixShape { block: 1, len: 3 }));
    }

    #[test]
    fn test_oversized_block_clipped() {
        let blocks = vec![vec![1.0], vec![2.0, 0.0, 0.0, 3.0]];
        let m = build_coupling_matrix(&blocks, 2).unwrap();
        assert_eq!(m.forward()[(0, 0)], 1.0);
        assert_eq!(m.forward()[(1, 1)], 2.0);
        assert_eq!(m.forward()[(0, 1)], 0.0);
        assert_eq!(m.forward()[(1, 0)], 0.0);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let blocks = vec![vec![1.0, 1.0, 1.0, 1.0]];
        let err = build_coupling_matrix(&blocks, 2).unwrap_err();
        assert!(matches!(err, Error::MatrixInversion { size: 2 }));
    }
}
