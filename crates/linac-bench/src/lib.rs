//! Benchmark profiles for the Linac envelope simulation framework.
//!
//! Provides pre-built lattice configurations for benchmarks:
//!
//! - [`drift_line`]: a source followed by `n` misaligned drifts
//! - [`mixed_line`]: a source followed by repeating drift / generic / marker cells
//! - [`charge_states`]: evenly spaced charge states and populations

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use linac_core::{Config, ConfigError, Lattice};

/// Charge states `1..=count` (in units of the reference charge) with
/// populations growing by 10 per state.
pub fn charge_states(count: usize) -> (Vec<f64>, Vec<f64>) {
    let z = (1..=count).map(|i| i as f64).collect();
    let n = (0..count).map(|i| 1000.0 + 10.0 * i as f64).collect();
    (z, n)
}

fn source_lattice(states: usize) -> Lattice {
    let (z, n) = charge_states(states);
    let mut lattice = Lattice::new()
        .global("IonEs", 931.49e6)
        .global("IonEk", 500e3)
        .global("IonChargeStates", z)
        .global("NCharge", n);
    for i in 0..states {
        let mut m1 = [0.0; 49];
        for d in 0..6 {
            m1[d * 7 + d] = 1e-6 * (1.0 + i as f64);
        }
        lattice = lattice
            .global(format!("IV{i}"), [1e-3, 0.0, -1e-3, 0.0, 0.0, 0.0, 1.0])
            .global(format!("IM{i}"), m1);
    }
    lattice.element(
        "src",
        "source",
        Config::new()
            .with("vector_variable", "IV")
            .with("matrix_variable", "IM"),
    )
}

/// A source and `n` drifts of 0.1 m, every other one rolled by 10 mrad.
pub fn drift_line(n: usize, states: usize) -> Result<Config, ConfigError> {
    let mut lattice = source_lattice(states)
        .element("d", "drift", Config::new().with("L", 0.1))
        .element(
            "dt",
            "drift",
            Config::new().with("L", 0.1).with("tilt", 0.01),
        );
    let mut entries = vec!["src".to_string()];
    entries.extend((0..n).map(|i| if i % 2 == 0 { "d" } else { "dt" }.to_string()));
    lattice = lattice.line("bench", entries);
    lattice.into_config()
}

/// A source and `cells` repetitions of drift, generic map and marker.
pub fn mixed_line(cells: usize, states: usize) -> Result<Config, ConfigError> {
    let mut tm = [0.0; 49];
    for d in 0..7 {
        tm[d * 7 + d] = 1.0;
    }
    tm[1] = 0.25;
    tm[2 * 7 + 3] = 0.25;
    source_lattice(states)
        .element("d", "drift", Config::new().with("L", 0.2))
        .element(
            "g",
            "generic",
            Config::new().with("transfer", tm).with("L", 0.25),
        )
        .element("m", "marker", Config::new())
        .line("cell", ["d", "g", "m"])
        .line(
            "bench",
            std::iter::once("src".to_string())
                .chain(std::iter::repeat("cell".to_string()).take(cells)),
        )
        .into_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_line_has_source_and_drifts() {
        let conf = drift_line(4, 2).unwrap();
        let elements = conf.elements().unwrap();
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0].require::<&str>("type").unwrap(), "source");
        assert_eq!(elements[2].require::<f64>("tilt").unwrap(), 0.01);
    }

    #[test]
    fn mixed_line_expands_cells() {
        let conf = mixed_line(3, 1).unwrap();
        assert_eq!(conf.elements().unwrap().len(), 10);
    }

    #[test]
    fn charge_states_are_spaced() {
        let (z, n) = charge_states(3);
        assert_eq!(z, [1.0, 2.0, 3.0]);
        assert_eq!(n, [1000.0, 1010.0, 1020.0]);
    }
}
