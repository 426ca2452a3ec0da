//! # hypoloc
//!
//! A **seismic event location core** written in Rust.
//!
//! Given a set of reported phase arrivals from a seismic network, `hypoloc`
//! finds a robust starting hypocentre (latitude, longitude, depth, origin
//! time) by a Neighbourhood-Algorithm (NA) global search over a travel-time
//! forward model. The result seeds an iterative least-squares relocation,
//! which lives outside this crate.
//!
//! ## Features
//!
//! - **Neighbourhood-Algorithm search** — derivative-free global search that
//!   adaptively concentrates samples in the lowest-misfit Voronoi cells of a
//!   growing model ensemble
//! - **Travel-time prediction** — bicubic spline interpolation over irregular
//!   distance × depth tables with ellipticity, station-elevation, and
//!   depth-phase bounce-point corrections
//! - **Correlated picking errors** — variogram-based data covariance with an
//!   eigendecomposition projection, block-diagonalized by a nearest-neighbour
//!   station ordering from single-linkage (SLINK) clustering
//! - **Reproducible** — all quasi-random (Sobol, Sobol–Antonov–Saleev) and
//!   pseudo-random (lagged-Fibonacci) generator state is scoped per search;
//!   the same seed and configuration yield bit-identical sample sequences
//! - **Parallel forward model** — per-sample misfit evaluations within one NA
//!   iteration run on a rayon worker pool over private phase-set copies
//!
//! ## Example
//!
//! ```no_run
//! use hypoloc::{Hypocentre, NaConfig, NaStatus, TableSet};
//!
//! # fn load_tables() -> TableSet { unimplemented!() }
//! # fn load_phases() -> (Vec<hypoloc::PhaseRecord>, Vec<hypoloc::StationRecord>) { unimplemented!() }
//! let tables = load_tables();
//! let (phases, stations) = load_phases();
//!
//! // Seed solution from the arrival data (e.g. earliest station)
//! let seed = Hypocentre {
//!     lat: 46.2,
//!     lon: 13.6,
//!     depth: 10.0,
//!     time: 1.334e9,
//!     ..Default::default()
//! };
//!
//! let config = NaConfig {
//!     radius_km: 300.0,
//!     max_iter: 5,
//!     seed: 5590,
//!     ..Default::default()
//! };
//!
//! let result = hypoloc::na_search(&seed, &phases, &stations, &tables, &config, None).unwrap();
//! if result.status == NaStatus::ModelFound {
//!     let best = result.best.unwrap();
//!     println!("NA hypocentre: {:.3} {:.3} depth {:.1} km, misfit {:.4}",
//!         best.lat, best.lon, best.depth, result.misfit.unwrap());
//! }
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Setup** — determine the free parameters (epicentre, origin time,
//!    depth) and their ranges around the seed solution
//! 2. **Initial sample** — fill the normalized search space with a
//!    quasi-uniform Sobol–Antonov–Saleev sample batch
//! 3. **Resample** — rank the ensemble by misfit, then walk the Voronoi cells
//!    of the best models axis-by-axis, drawing new coordinates inside the
//!    exact 1-D cell intersections
//! 4. **Forward model** — for every trial hypocentre, recompute distances and
//!    azimuths, predict travel times with all corrections, and score an
//!    Lp-norm misfit of (projection-decorrelated) residuals
//! 5. **Report** — the lowest-misfit model of the whole ensemble
//!
//! ## Credits
//!
//! The search follows M. Sambridge, "Geophysical inversion with a
//! neighbourhood algorithm — I. Searching a parameter space," GJI 138 (1999).
//! Ellipticity corrections follow B.L.N. Kennett & Ó. Gudmundsson,
//! "Ellipticity corrections for seismic phases," GJI 127 (1996).
//! Clustering follows R. Sibson, "SLINK: an optimally efficient algorithm for
//! the single-link cluster method," The Computer Journal 16 (1973).

pub mod cluster;
pub mod covariance;
pub mod geo;
pub mod interp;
pub mod model;
pub mod quality;
pub mod search;
pub mod sequence;
pub mod tables;
pub mod traveltime;

pub use cluster::{nearest_neighbour_order, Child, ClusterNode, StationOrder};
pub use covariance::{build_covariance, ProjectionMatrix};
pub use model::{Hypocentre, PhaseRecord, StationRecord};
pub use quality::{du_gap_sgap, NetworkQuality};
pub use search::{na_search, NaConfig, NaResult, NaStatus};
pub use tables::{EllipticityTable, TableSet, TopographyGrid, TravelTimeTable, Variogram};
pub use traveltime::{predict, Prediction};

// Commonly used types.
// Note: everything here is f64. Travel-time residuals are small differences
// of epoch-scale numbers, and the covariance projection needs the full
// mantissa, so there is no f32 fast path.
pub type Matrix = nalgebra::DMatrix<f64>;
pub type Vector = nalgebra::DVector<f64>;
