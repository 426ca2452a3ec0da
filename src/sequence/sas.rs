//! n-dimensional Sobol–Antonov–Saleev (SAS) sequence family.
//!
//! Unlike the fixed 6-dimension generator in [`super::sobol`], the SAS family
//! builds up to [`MAX_SEQ`] independent sequences on demand. Each sequence is
//! assigned a primitive polynomial by a deterministic scheme — cycle through
//! the degrees ≥ 6, consuming roughly 1% of each degree's total polynomial
//! capacity per visit and cycling the polynomial order within the degree —
//! and its free direction numbers are drawn from the lagged-Fibonacci
//! generator. The result is a reproducible family: same seed, same tables.
//!
//! Two call modes mirror the legacy interface:
//! - [`SasGenerator::next_vector`] advances all sequences together (the
//!   initial space-filling sample);
//! - [`SasGenerator::next_deviate`] advances one selected sequence
//!   independently, which is what the NA axis walk uses — each (axis, cell)
//!   pair owns its own sequence and must not disturb the others.

use anyhow::{ensure, Result};

use super::Fibonacci;

/// Static ceiling on the number of independent sequences.
pub const MAX_SEQ: usize = 1024;
/// Bits of resolution; values are multiples of 2^-30.
const MAX_BIT: usize = 30;

// Primitive polynomials over GF(2), full bit encodings (x^q down to 1).
// CAPACITY holds the total number of primitive polynomials of each degree;
// the order index wraps over the stored subset.
const DEGREES: [usize; 5] = [6, 7, 8, 9, 10];
const CAPACITY: [usize; 5] = [6, 18, 16, 48, 60];
const POLYS_6: [u32; 6] = [0x43, 0x5B, 0x61, 0x67, 0x6D, 0x73];
const POLYS_7: [u32; 18] = [
    0x83, 0x89, 0x8F, 0x91, 0x9D, 0xA7, 0xAB, 0xB9, 0xBF, 0xC1, 0xCB, 0xD3, 0xD5, 0xE5, 0xEF,
    0xF1, 0xF7, 0xFD,
];
const POLYS_8: [u32; 16] = [
    0x11D, 0x12B, 0x12D, 0x14D, 0x15F, 0x163, 0x165, 0x169, 0x171, 0x187, 0x18D, 0x1A9, 0x1C3,
    0x1CF, 0x1E7, 0x1F5,
];
const POLYS_9: [u32; 10] = [
    0x211, 0x21B, 0x233, 0x259, 0x25F, 0x269, 0x277, 0x291, 0x2B5, 0x2E1,
];
const POLYS_10: [u32; 10] = [
    0x409, 0x41B, 0x427, 0x44D, 0x453, 0x477, 0x49F, 0x4AD, 0x4C5, 0x4E7,
];

fn poly_for(degree_idx: usize, order: usize) -> u32 {
    match degree_idx {
        0 => POLYS_6[order % POLYS_6.len()],
        1 => POLYS_7[order % POLYS_7.len()],
        2 => POLYS_8[order % POLYS_8.len()],
        3 => POLYS_9[order % POLYS_9.len()],
        _ => POLYS_10[order % POLYS_10.len()],
    }
}

// ── One SAS sequence ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Sequence {
    /// Direction numbers scaled to the top of the MAX_BIT register.
    v: [u64; MAX_BIT],
    /// Current integer state.
    ix: u64,
    /// Points drawn so far; drives the Gray-code bit selection.
    count: u64,
}

impl Sequence {
    /// Build direction numbers for a degree-q primitive polynomial, the first
    /// q of them seeded from the pseudo-random generator (odd, m_j < 2^j).
    fn new(degree: usize, poly: u32, rng: &mut Fibonacci) -> Self {
        let q = degree;
        let mut m = [0u64; MAX_BIT];
        for (j, slot) in m.iter_mut().enumerate().take(q) {
            let span = 1u64 << j; // 2^(j), m in {1, 3, .., 2^(j+1)-1}
            *slot = 2 * ((span as f64 * rng.next()) as u64).min(span - 1) + 1;
        }
        // Bratley–Fox recurrence:
        //   m_j = 2a_1 m_{j-1} ^ 4a_2 m_{j-2} ^ .. ^ 2^q m_{j-q} ^ m_{j-q}
        for j in q..MAX_BIT {
            let mut val = m[j - q] ^ (m[j - q] << q);
            for (k, shift) in (1..q).zip(1u32..) {
                if poly >> (q - k) & 1 != 0 {
                    val ^= m[j - k] << shift;
                }
            }
            m[j] = val;
        }

        let mut v = [0u64; MAX_BIT];
        for (j, (vj, mj)) in v.iter_mut().zip(m.iter()).enumerate() {
            *vj = mj << (MAX_BIT - 1 - j);
        }

        Self { v, ix: 0, count: 0 }
    }

    fn next(&mut self) -> f64 {
        // Antonov–Saleev: flip the direction number of the lowest zero bit.
        let mut im = self.count;
        self.count += 1;
        let mut j = 0;
        while j < MAX_BIT && im & 1 != 0 {
            im >>= 1;
            j += 1;
        }
        assert!(j < MAX_BIT, "SAS sequence exhausted MAX_BIT bits");
        self.ix ^= self.v[j];
        self.ix as f64 / (1u64 << MAX_BIT) as f64
    }
}

// ── The generator family ────────────────────────────────────────────────────

/// Family of independent SAS sequences, one per requested index.
#[derive(Debug, Clone)]
pub struct SasGenerator {
    seqs: Vec<Sequence>,
}

impl SasGenerator {
    /// Initialize `n` sequences, drawing direction-number seeds from `rng`.
    ///
    /// The degree/order assignment and the seed draws are strictly
    /// sequential, so the whole family is a pure function of `n` and the
    /// generator state.
    pub fn new(n: usize, rng: &mut Fibonacci) -> Result<Self> {
        ensure!(n > 0, "SAS generator needs at least one sequence");
        ensure!(
            n <= MAX_SEQ,
            "requested {n} SAS sequences, ceiling is {MAX_SEQ}"
        );

        let mut seqs = Vec::with_capacity(n);
        let mut order = [0usize; DEGREES.len()];
        let mut deg_idx = 0;
        while seqs.len() < n {
            // ~1% of this degree's capacity per visit, at least one.
            let take = (CAPACITY[deg_idx] / 100).max(1);
            for _ in 0..take {
                if seqs.len() == n {
                    break;
                }
                let poly = poly_for(deg_idx, order[deg_idx]);
                seqs.push(Sequence::new(DEGREES[deg_idx], poly, rng));
                order[deg_idx] += 1;
            }
            deg_idx = (deg_idx + 1) % DEGREES.len();
        }

        Ok(Self { seqs })
    }

    /// Number of initialized sequences.
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    /// True when no sequences were initialized (never, by construction).
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Mode 0: advance every sequence one step and write the coordinates
    /// of the next point into `out`.
    pub fn next_vector(&mut self, out: &mut [f64]) -> Result<()> {
        ensure!(
            out.len() <= self.seqs.len(),
            "requested {} coordinates from {} initialized SAS sequences",
            out.len(),
            self.seqs.len()
        );
        // All sequences advance, even beyond out.len(): the vector mode keeps
        // the family in lockstep so later vector calls stay aligned.
        for (k, seq) in self.seqs.iter_mut().enumerate() {
            let x = seq.next();
            if let Some(slot) = out.get_mut(k) {
                *slot = x;
            }
        }
        Ok(())
    }

    /// Mode ≠ 0: advance only sequence `k` and return its next value.
    pub fn next_deviate(&mut self, k: usize) -> Result<f64> {
        ensure!(
            k < self.seqs.len(),
            "SAS sequence index {k} out of range ({} initialized)",
            self.seqs.len()
        );
        Ok(self.seqs[k].next())
    }
}
