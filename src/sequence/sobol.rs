//! 1-D (well, up-to-6-D) Gray-code Sobol sequence with hard-coded
//! direction-number seeds.
//!
//! This is the classic bit-reversal Sobol generator: six dimensions, each
//! with a fixed primitive polynomial and hand-seeded direction numbers, the
//! remaining direction numbers filled by the usual recurrence. The NA caller
//! only ever consumes dimensions 0 and 1, but all six are kept so the stream
//! matches the legacy generator bit for bit.

/// Bits of resolution; values are multiples of 2^-30.
const MAX_BIT: usize = 30;
/// Number of supported dimensions.
const MAX_DIM: usize = 6;

/// Polynomial degree per dimension.
const MDEG: [usize; MAX_DIM] = [1, 2, 3, 3, 4, 4];
/// Interior coefficient bits of each primitive polynomial.
const IP: [u64; MAX_DIM] = [0, 1, 1, 2, 1, 4];
/// Seed direction numbers, one row per bit level (row j seeds dimensions
/// whose polynomial degree is > j).
const IV_SEED: [[u64; MAX_DIM]; 4] = [
    [1, 1, 1, 1, 1, 1],
    [3, 1, 3, 3, 1, 1],
    [5, 7, 7, 3, 3, 5],
    [15, 11, 5, 15, 13, 9],
];

/// Up-to-6-dimension Gray-code Sobol generator.
#[derive(Debug, Clone)]
pub struct Sobol1 {
    iv: [[u64; MAX_BIT]; MAX_DIM],
    ix: [u64; MAX_DIM],
    count: u64,
    fac: f64,
}

impl Sobol1 {
    /// Create an initialized generator (the legacy negative-argument call).
    pub fn new() -> Self {
        let mut iv = [[0u64; MAX_BIT]; MAX_DIM];

        for k in 0..MAX_DIM {
            let q = MDEG[k];
            // Seeded rows, scaled so bit j occupies the top of the register.
            for j in 0..q {
                iv[k][j] = IV_SEED[j][k] << (MAX_BIT - 1 - j);
            }
            // Remaining rows from the primitive-polynomial recurrence.
            for j in q..MAX_BIT {
                let mut i = iv[k][j - q];
                i ^= i >> q;
                let mut ipp = IP[k];
                for l in (1..q).rev() {
                    if ipp & 1 != 0 {
                        i ^= iv[k][j - l];
                    }
                    ipp >>= 1;
                }
                iv[k][j] = i;
            }
        }

        Self {
            iv,
            ix: [0; MAX_DIM],
            count: 0,
            fac: 1.0 / (1u64 << MAX_BIT) as f64,
        }
    }

    /// Advance the sequence and write the next point's first `out.len()`
    /// coordinates (at most [`MAX_DIM`]).
    pub fn next_point(&mut self, out: &mut [f64]) {
        debug_assert!(out.len() <= MAX_DIM);

        // Position of the lowest zero bit of the running counter.
        let mut im = self.count;
        self.count += 1;
        let mut j = 0;
        while j < MAX_BIT && im & 1 != 0 {
            im >>= 1;
            j += 1;
        }
        assert!(j < MAX_BIT, "Sobol sequence exhausted MAX_BIT bits");

        for (k, slot) in out.iter_mut().enumerate() {
            self.ix[k] ^= self.iv[k][j];
            *slot = self.ix[k] as f64 * self.fac;
        }
    }
}

impl Default for Sobol1 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_dimension_is_the_van_der_corput_sequence() {
        // Dimension 0 of a Sobol sequence is the base-2 radical inverse in
        // Gray-code visiting order.
        let mut s = Sobol1::new();
        let mut x = [0.0; 1];
        let expected = [0.5, 0.25, 0.75, 0.375, 0.875, 0.125, 0.625];
        for e in expected {
            s.next_point(&mut x);
            assert!((x[0] - e).abs() < 1e-12, "got {} want {}", x[0], e);
        }
    }

    #[test]
    fn points_fill_the_unit_square_evenly() {
        // The generator skips the all-zero origin point, so a balanced
        // 256-point block is the origin plus the first 255 generated points.
        let mut s = Sobol1::new();
        let mut x = [0.0; 2];
        let mut quadrants = [0usize; 4];
        quadrants[0] += 1; // implicit (0, 0)
        for _ in 0..255 {
            s.next_point(&mut x);
            let q = (x[0] >= 0.5) as usize * 2 + (x[1] >= 0.5) as usize;
            quadrants[q] += 1;
        }
        for &c in &quadrants {
            assert_eq!(c, 64);
        }
    }

    #[test]
    fn streams_are_reproducible() {
        let mut a = Sobol1::new();
        let mut b = Sobol1::new();
        let mut xa = [0.0; MAX_DIM];
        let mut xb = [0.0; MAX_DIM];
        for _ in 0..500 {
            a.next_point(&mut xa);
            b.next_point(&mut xb);
            assert_eq!(xa, xb);
        }
    }
}
