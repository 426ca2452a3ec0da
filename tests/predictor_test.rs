//! Travel-time prediction through the full public API, with every correction
//! layer active at once.

use hypoloc::tables::EllipticityEntry;
use hypoloc::traveltime::PredictContext;
use hypoloc::{predict, TableSet, TopographyGrid, TravelTimeTable};

/// tt = 10·delta + depth/10 with a constant 2° bounce-point distance.
fn depth_phase_table() -> TravelTimeTable {
    let deltas: Vec<f64> = (0..6).map(|j| j as f64 * 2.0).collect();
    let depths: Vec<f64> = (0..6).map(|i| i as f64 * 100.0).collect();
    let mut time = Vec::new();
    let mut dtdd = Vec::new();
    let mut dtdh = Vec::new();
    let mut bpdel = Vec::new();
    for h in &depths {
        for d in &deltas {
            time.push(10.0 * d + h / 10.0);
            dtdd.push(10.0);
            dtdh.push(0.1);
            bpdel.push(2.0);
        }
    }
    TravelTimeTable::new(deltas, depths, time, dtdd, dtdh, Some(bpdel)).unwrap()
}

fn constant_tau_entry() -> EllipticityEntry {
    let deltas: Vec<f64> = vec![0.0, 5.0, 10.0];
    let depths: Vec<f64> = vec![0.0, 500.0];
    let n = deltas.len() * depths.len();
    EllipticityEntry {
        deltas,
        depths,
        tau0: vec![1.0; n],
        tau1: vec![0.5; n],
        tau2: vec![0.2; n],
    }
}

#[test]
fn all_corrections_compose_additively() {
    let mut tables = TableSet::default();
    tables.tt.insert("pP".to_owned(), depth_phase_table());
    tables
        .ellipticity
        .insert("pP", constant_tau_entry())
        .unwrap();
    // 1 km of topography everywhere: a real bounce-point term for pP.
    tables.topography =
        Some(TopographyGrid::new(vec![1000; 19 * 37], 19, 37, 90.0, -180.0, 10.0).unwrap());

    let ctx = PredictContext {
        ev_lat: 0.0,
        ev_lon: 0.0,
        esaz: 90.0,
        station_elev: 580.0,
    };
    let p = predict(&tables, "pP", 200.0, 4.0, true, &ctx).unwrap();

    // Exact grid point: the uncorrected time is the tabulated 60 s.
    let raw = p.ttime - p.ellip_corr - p.elev_corr - p.bounce_corr;
    assert!((raw - 60.0).abs() < 1e-9);
    assert_eq!(p.dtdd, 10.0);
    assert_eq!(p.dtdh, 0.1);
    assert_eq!(p.bpdel, Some(2.0));

    // Elevated station and a land bounce point both cost positive time.
    assert!(p.elev_corr > 0.0);
    assert!(p.bounce_corr > 0.0);
    assert!(p.ellip_corr != 0.0);
}

#[test]
fn equatorial_ellipticity_matches_the_closed_form() {
    let mut tables = TableSet::default();
    tables.tt.insert("pP".to_owned(), depth_phase_table());
    tables
        .ellipticity
        .insert("pP", constant_tau_entry())
        .unwrap();

    // At the equator the geocentric colatitude is 90 degrees, so with
    // tau = (1.0, 0.5, 0.2) and azimuth 0:
    //   sc0 = 0.25(1 + 3cos(180°)) = -0.5
    //   sc1 = (√3/2)sin(180°)      = 0
    //   sc2 = (√3/2)sin²(90°)      = √3/2
    // correction = -0.5·1.0 + (√3/2)·0.2
    let ctx = PredictContext {
        ev_lat: 0.0,
        ev_lon: 0.0,
        esaz: 0.0,
        station_elev: 0.0,
    };
    let p = predict(&tables, "pP", 200.0, 4.0, false, &ctx).unwrap();
    let expected = -0.5 + 3.0f64.sqrt() / 2.0 * 0.2;
    assert!((p.ellip_corr - expected).abs() < 1e-9);
}

#[test]
fn missing_correction_inputs_degrade_to_zero() {
    // No ellipticity entry, no topography: the prediction still succeeds and
    // all correction terms except station elevation are zero.
    let mut tables = TableSet::default();
    tables.tt.insert("pP".to_owned(), depth_phase_table());

    let ctx = PredictContext {
        ev_lat: 0.0,
        ev_lon: 0.0,
        esaz: 90.0,
        station_elev: 0.0,
    };
    let p = predict(&tables, "pP", 200.0, 4.0, false, &ctx).unwrap();
    assert_eq!(p.ellip_corr, 0.0);
    assert_eq!(p.bounce_corr, 0.0);
    assert_eq!(p.elev_corr, 0.0);
    assert!((p.ttime - 60.0).abs() < 1e-9);
}
