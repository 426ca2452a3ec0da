//! Lagged-Fibonacci pseudo-random generator.
//!
//! Subtractive lagged-Fibonacci over f64 with lags (55, 24), the standard
//! Knuth configuration. The 55-element lag table is filled from a 64-bit
//! xorshift-multiply integer generator so that a single integer seed
//! determines the whole stream.

/// Lag table length.
const LAG: usize = 55;
/// Short lag: the second tap sits 24 steps behind the first.
const SHORT_LAG: usize = 24;

/// Xorshift-multiply stream used only to fill the lag table.
struct SeedStream {
    v: u64,
}

impl SeedStream {
    fn new(seed: u64) -> Self {
        let mut s = Self {
            v: seed ^ 4101842887655102017,
        };
        s.next();
        s
    }

    fn next(&mut self) -> u64 {
        self.v ^= self.v >> 21;
        self.v ^= self.v << 35;
        self.v ^= self.v >> 4;
        self.v.wrapping_mul(2685821657736338717)
    }

    fn next_f64(&mut self) -> f64 {
        // 2^-64
        5.421010862427522e-20 * self.next() as f64
    }
}

/// Lagged-Fibonacci uniform generator on [0, 1).
///
/// Initialized exactly once per search with the configured integer seed
/// (negated if negative, so that legacy negative "initialize" seeds work).
#[derive(Debug, Clone)]
pub struct Fibonacci {
    table: [f64; LAG],
    i1: usize,
    i2: usize,
}

impl Fibonacci {
    /// Create a generator from an integer seed.
    pub fn new(seed: i64) -> Self {
        let seed = seed.unsigned_abs();
        let mut stream = SeedStream::new(seed);
        let mut table = [0.0; LAG];
        for slot in table.iter_mut() {
            *slot = stream.next_f64();
        }
        Self {
            table,
            i1: 0,
            i2: LAG - SHORT_LAG,
        }
    }

    /// Next uniform deviate in [0, 1).
    pub fn next(&mut self) -> f64 {
        self.i1 = (self.i1 + 1) % LAG;
        self.i2 = (self.i2 + 1) % LAG;
        let mut d = self.table[self.i1] - self.table[self.i2];
        if d < 0.0 {
            d += 1.0;
        }
        self.table[self.i1] = d;
        d
    }

    /// Shuffle `items` in place by repeated random transposition.
    ///
    /// This is the legacy "jumble": each position is swapped with a uniformly
    /// drawn index, which is what the NA misfit ranking uses to randomize
    /// tie-breaking among equal-misfit models.
    pub fn jumble<T>(&mut self, items: &mut [T]) {
        let n = items.len();
        for i in 0..n {
            let k = ((n as f64 * self.next()) as usize).min(n - 1);
            items.swap(i, k);
        }
    }
}
