//! Core data model: phase arrivals, stations, and the hypocentre solution
//! record.
//!
//! One event is a batch of [`PhaseRecord`]s against a station list and a
//! current [`Hypocentre`]. Phase records are mutated by every forward-model
//! pass (predicted time, derivatives, residual, defining flag); the NA search
//! therefore clones the whole phase array per trial model so that parallel
//! sample evaluations never alias.

/// A distinct seismic station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// Reporting station code.
    pub sta: String,
    /// Grouping key for co-located stations: duplicate codes at (nearly)
    /// identical coordinates share one key. The station list is sorted
    /// ascending by this key and binary-searched with it.
    pub altsta: String,
    /// Geographic latitude, degrees.
    pub lat: f64,
    /// Geographic longitude, degrees.
    pub lon: f64,
    /// Elevation above sea level, metres.
    pub elev: f64,
}

/// Binary-search a station list (sorted ascending by `altsta`) for a key.
pub fn find_station<'a>(stations: &'a [StationRecord], altsta: &str) -> Option<&'a StationRecord> {
    stations
        .binary_search_by(|s| s.altsta.as_str().cmp(altsta))
        .ok()
        .map(|i| &stations[i])
}

/// One reported phase arrival.
#[derive(Debug, Clone)]
pub struct PhaseRecord {
    /// Station grouping key (matches [`StationRecord::altsta`]).
    pub sta: String,
    /// Phase code as reported by the agency.
    pub reported_phase: String,
    /// Working phase code used for prediction; starts as the reported code
    /// and may be re-identified during location.
    pub phase: String,
    /// Arrival time, epoch seconds. `None` when the agency reported the
    /// phase without a usable time; such phases never receive a residual.
    pub time: Option<f64>,
    /// Epicentral distance to the current hypocentre, degrees.
    pub delta: f64,
    /// Event-to-station azimuth for the current hypocentre, degrees.
    pub esaz: f64,
    /// Observed backazimuth, degrees, if reported.
    pub obs_azim: Option<f64>,
    /// Observed horizontal slowness, s/deg, if reported.
    pub obs_slow: Option<f64>,
    /// Whether this phase contributes to the misfit.
    pub timedef: bool,
    /// A priori measurement-error estimate, seconds.
    pub measerr: f64,
    /// Reading id: phases reported together from one station/time window.
    pub rdid: u32,
    /// Set when iterative down-weighting removed the phase from the solution.
    pub purged: bool,
    /// Predicted travel time, seconds (forward-model output).
    pub ttime: Option<f64>,
    /// d(tt)/d(delta), s/deg (forward-model output).
    pub dtdd: f64,
    /// d(tt)/d(depth), s/km (forward-model output).
    pub dtdh: f64,
    /// Time residual, seconds (forward-model output).
    pub resid: Option<f64>,
}

impl PhaseRecord {
    /// A bare arrival with the given station key, phase code and time;
    /// everything else at rest state. Convenient for tests and loaders.
    pub fn new(sta: &str, phase: &str, time: Option<f64>) -> Self {
        Self {
            sta: sta.to_owned(),
            reported_phase: phase.to_owned(),
            phase: phase.to_owned(),
            time,
            delta: 0.0,
            esaz: 0.0,
            obs_azim: None,
            obs_slow: None,
            timedef: time.is_some(),
            measerr: 1.0,
            rdid: 0,
            purged: false,
            ttime: None,
            dtdd: 0.0,
            dtdh: 0.0,
            resid: None,
        }
    }

    /// Phase-type code: the leading alphabetic run of the working phase code.
    /// The covariance builder correlates only phases with equal type codes,
    /// different ray paths being assumed uncorrelated.
    pub fn phase_type(&self) -> &str {
        let bytes = self.phase.as_bytes();
        let mut end = 0;
        for (i, b) in bytes.iter().enumerate() {
            if b.is_ascii_alphabetic() {
                end = i + 1;
            } else {
                break;
            }
        }
        &self.phase[..end]
    }
}

/// The solution record: hypocentre parameters plus fixed-parameter flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hypocentre {
    /// Geographic latitude, degrees.
    pub lat: f64,
    /// Geographic longitude, degrees.
    pub lon: f64,
    /// Depth below surface, km (non-negative).
    pub depth: f64,
    /// Origin time, epoch seconds.
    pub time: f64,
    /// Epicentre held fixed (2 degrees of freedom removed).
    pub epicentre_fixed: bool,
    /// Origin time held fixed.
    pub time_fixed: bool,
    /// Depth held fixed.
    pub depth_fixed: bool,
}

impl Hypocentre {
    /// Number of free location parameters for this solution (0..=4).
    pub fn free_dimensions(&self) -> usize {
        let mut nd = 4;
        if self.epicentre_fixed {
            nd -= 2;
        }
        if self.time_fixed {
            nd -= 1;
        }
        if self.depth_fixed {
            nd -= 1;
        }
        nd
    }
}
