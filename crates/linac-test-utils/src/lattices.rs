//! Reference lattices.
//!
//! Two lattices exercise the source element: a single charge state at
//! 930 MeV rest energy, and two charge states (42, 43) with populations
//! (1000, 1010) at unit energies.

use linac_core::{Config, Lattice};

/// The block-ones moment1 matrix (row-major) with `extra` added to `[0][0]`.
///
/// Even coordinates are fully correlated with each other, as are odd ones.
#[rustfmt::skip]
pub fn block_ones(extra: f64) -> [f64; 49] {
    [
        1.0 + extra, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0,
        1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0,
        1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ]
}

/// The 7×7 identity, row-major.
pub fn identity_tm() -> [f64; 49] {
    let mut m = [0.0; 49];
    for i in 0..7 {
        m[i * 7 + i] = 1.0;
    }
    m
}

/// `[a, a, 0, 0, 0, 0, 0]`.
pub fn centroid(a: f64) -> [f64; 7] {
    [a, a, 0.0, 0.0, 0.0, 0.0, 0.0]
}

/// Globals of the single-charge-state lattice.
pub fn single_charge_globals() -> Config {
    Config::new()
        .with("sim_type", "MomentMatrix")
        .with("Frf", 80.5e6)
        .with("IonEs", 930e6)
        .with("IonEk", 500e3)
        .with("IM", block_ones(0.0))
        .with("IV", centroid(1.0))
        .with("TM", identity_tm())
}

/// Globals of the two-charge-state lattice.
pub fn multi_charge_globals() -> Config {
    Config::new()
        .with("sim_type", "MomentMatrix")
        .with("Frf", 80.5e6)
        .with("IonEs", 1.0)
        .with("IonEk", 1.0)
        .with("IM0", block_ones(0.0))
        .with("IM1", block_ones(1.0))
        .with("IV0", centroid(1.0))
        .with("IV1", centroid(2.0))
        .with("TM", identity_tm())
        .with("IonChargeStates", [42.0, 43.0])
        .with("NCharge", [1000.0, 1010.0])
}

fn with_globals(globals: Config) -> Lattice {
    globals
        .iter()
        .fold(Lattice::new(), |l, (k, v)| l.global(k, v.clone()))
}

/// `elem0: source, initial = IM, moment0 = IV; foo: LINE = (elem0);`
pub fn single_source_lattice() -> Lattice {
    with_globals(single_charge_globals())
        .element(
            "elem0",
            "source",
            Config::new()
                .with("initial", block_ones(0.0))
                .with("moment0", centroid(1.0)),
        )
        .line("foo", ["elem0"])
}

/// `elem0: source, vector_variable = "IV", matrix_variable = "IM";
/// foo: LINE = (elem0);`
pub fn multi_charge_lattice() -> Lattice {
    with_globals(multi_charge_globals())
        .element(
            "elem0",
            "source",
            Config::new()
                .with("vector_variable", "IV")
                .with("matrix_variable", "IM"),
        )
        .line("foo", ["elem0"])
}

/// The flattened single-charge-state configuration.
pub fn single_source_config() -> Config {
    flatten(single_source_lattice())
}

/// The flattened two-charge-state configuration.
pub fn multi_charge_config() -> Config {
    flatten(multi_charge_lattice())
}

fn flatten(lattice: Lattice) -> Config {
    lattice
        .into_config()
        .expect("reference lattice flattens")
}
