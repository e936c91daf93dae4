//! Wave digital filter model of a first-order diode clipper.
//!
//! The circuit is a resistive voltage source in parallel with a capacitor,
//! terminated by an antiparallel diode pair:
//!
//! ```text
//!        R = 4.7k
//!  vin ──/\/\/──┬──────┬──── out
//!               │      │
//!               C    D ⇅ D
//!               │      │
//!  gnd ─────────┴──────┘
//! ```
//!
//! The source and capacitor meet in a parallel adaptor whose free port faces
//! the diode pair at the root of the tree. The diode pair has an explicit
//! solution in terms of the Wright omega function, so every sample is a fixed
//! number of operations with no iteration and no added latency.
//!
//! # References
//!
//! - K. Werner et al., "An Improved and Generalized Diode Clipper Model for
//!   Wave Digital Filters", AES 139, 2015.
//! - S. D'Angelo et al., "Fast Approximation of the Lambert W Function for
//!   Virtual Analog Modelling", DAFx 2019.

use core::f32::consts::PI;

/// Series resistance of the input source.
pub const SOURCE_RESISTANCE: f32 = 4700.0;

/// Thermal voltage of a single junction at room temperature.
pub const THERMAL_VOLTAGE: f32 = 0.02585;

/// Diode models selectable on the clipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiodeType {
    /// GZ34 tube rectifier.
    #[default]
    Gz34,
    /// 1N34 germanium.
    Germanium1N34,
    /// 1N4148 silicon.
    Silicon1N4148,
}

impl DiodeType {
    /// Labels in parameter order.
    pub const LABELS: &'static [&'static str] = &["GZ34", "1N34", "1N4148"];

    /// Saturation current in amperes.
    pub fn saturation_current(self) -> f32 {
        match self {
            Self::Gz34 => 2.52e-9,
            Self::Germanium1N34 => 15.0e-6,
            Self::Silicon1N4148 => 2.64e-9,
        }
    }

    /// Maps a choice parameter value to a diode type. Out-of-range values
    /// fall back to the default.
    pub fn from_index(value: f32) -> Self {
        match value.round() as i32 {
            1 => Self::Germanium1N34,
            2 => Self::Silicon1N4148,
            _ => Self::Gz34,
        }
    }
}

#[inline]
fn poly3(x: f32, [a, b, c, d]: [f32; 4]) -> f32 {
    ((a * x + b) * x + c) * x + d
}

/// Third-order piecewise approximation of the Wright omega function.
#[inline]
pub fn omega3(x: f32) -> f32 {
    const X1: f32 = -3.341_459_6;
    const X2: f32 = 8.0;
    const COEFFS: [f32; 4] = [-1.314_293_1e-3, 4.775_931_4e-2, 3.631_952_7e-1, 6.313_183_5e-1];
    if x < X1 {
        0.0
    } else if x < X2 {
        poly3(x, COEFFS)
    } else {
        x - libm::logf(x)
    }
}

/// [`omega3`] followed by one Newton-Raphson refinement step.
#[inline]
pub fn omega4(x: f32) -> f32 {
    let y = omega3(x);
    y - (y - libm::expf(x - y)) / (y + 1.0)
}

/// Ideal voltage source behind a series resistor. Adapted at its resistance.
#[derive(Debug, Clone, Copy)]
struct ResistiveVoltageSource {
    resistance: f32,
    voltage: f32,
}

impl ResistiveVoltageSource {
    #[inline]
    fn reflected(&self) -> f32 {
        self.voltage
    }
}

/// Bilinear-discretised capacitor.
#[derive(Debug, Clone, Copy)]
struct Capacitor {
    capacitance: f32,
    resistance: f32,
    state: f32,
}

impl Capacitor {
    fn new(capacitance: f32, sample_rate: f32) -> Self {
        Self {
            capacitance,
            resistance: 1.0 / (2.0 * capacitance * sample_rate),
            state: 0.0,
        }
    }

    fn set_capacitance(&mut self, capacitance: f32, sample_rate: f32) {
        self.capacitance = capacitance;
        self.resistance = 1.0 / (2.0 * capacitance * sample_rate);
    }

    #[inline]
    fn reflected(&self) -> f32 {
        self.state
    }

    #[inline]
    fn incident(&mut self, a: f32) {
        self.state = a;
    }
}

/// Three-port parallel adaptor, adapted at its free (upward) port.
#[derive(Debug, Clone, Copy, Default)]
struct Parallel {
    port1_reflect: f32,
    resistance: f32,
}

impl Parallel {
    fn adapt(r1: f32, r2: f32) -> Self {
        let g1 = 1.0 / r1;
        let g = g1 + 1.0 / r2;
        Self {
            port1_reflect: g1 / g,
            resistance: 1.0 / g,
        }
    }
}

/// Antiparallel diode pair as a root element.
#[derive(Debug, Clone, Copy)]
struct DiodePair {
    thermal_voltage: f32,
    /// `ln(R_port * Is / Vt)`, recomputed whenever any of the three changes.
    log_r_is_over_vt: f32,
}

impl DiodePair {
    fn new(port_resistance: f32, saturation_current: f32, thermal_voltage: f32) -> Self {
        let mut pair = Self {
            thermal_voltage,
            log_r_is_over_vt: 0.0,
        };
        pair.configure(port_resistance, saturation_current, thermal_voltage);
        pair
    }

    fn configure(&mut self, port_resistance: f32, saturation_current: f32, thermal_voltage: f32) {
        self.thermal_voltage = thermal_voltage;
        self.log_r_is_over_vt = libm::logf(port_resistance * saturation_current / thermal_voltage);
    }

    /// Reflected wave for incident wave `a`.
    #[inline]
    fn reflect(&self, a: f32) -> f32 {
        if a == 0.0 {
            return 0.0;
        }
        let lambda = a.signum();
        let vt = self.thermal_voltage;
        let x = lambda * a / vt;
        a - 2.0 * vt * lambda * (omega4(self.log_r_is_over_vt + x) - omega4(self.log_r_is_over_vt - x))
    }
}

/// One channel of the diode clipper circuit.
///
/// ```rust
/// use tonegraph_models::wdf::{DiodeClipperWdf, DiodeType};
///
/// let mut wdf = DiodeClipperWdf::new(48000.0);
/// wdf.set_parameters(2000.0, DiodeType::Gz34.saturation_current(), 1.0);
/// let y = wdf.process_sample(5.0);
/// assert!(y.abs() < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct DiodeClipperWdf {
    sample_rate: f32,
    cutoff_hz: f32,
    saturation_current: f32,
    n_diodes: f32,
    source: ResistiveVoltageSource,
    capacitor: Capacitor,
    parallel: Parallel,
    diodes: DiodePair,
}

impl DiodeClipperWdf {
    /// Default cutoff in Hz.
    pub const DEFAULT_CUTOFF: f32 = 2000.0;

    /// Builds the circuit at `sample_rate` with a GZ34 pair and the default cutoff.
    pub fn new(sample_rate: f32) -> Self {
        let saturation_current = DiodeType::Gz34.saturation_current();
        let source = ResistiveVoltageSource {
            resistance: SOURCE_RESISTANCE,
            voltage: 0.0,
        };
        let capacitor = Capacitor::new(capacitance_for(Self::DEFAULT_CUTOFF), sample_rate);
        let parallel = Parallel::adapt(source.resistance, capacitor.resistance);
        let diodes = DiodePair::new(parallel.resistance, saturation_current, THERMAL_VOLTAGE);
        Self {
            sample_rate,
            cutoff_hz: Self::DEFAULT_CUTOFF,
            saturation_current,
            n_diodes: 1.0,
            source,
            capacitor,
            parallel,
            diodes,
        }
    }

    /// Re-discretises for a new sample rate and clears the capacitor.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.capacitor
            .set_capacitance(capacitance_for(self.cutoff_hz), sample_rate);
        self.capacitor.state = 0.0;
        self.source.voltage = 0.0;
        self.readapt();
    }

    /// Updates cutoff, diode saturation current and diode count.
    ///
    /// Cheap when nothing changed; otherwise one logarithm and a few divides.
    pub fn set_parameters(&mut self, cutoff_hz: f32, saturation_current: f32, n_diodes: f32) {
        if cutoff_hz == self.cutoff_hz
            && saturation_current == self.saturation_current
            && n_diodes == self.n_diodes
        {
            return;
        }
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.capacitor
                .set_capacitance(capacitance_for(cutoff_hz), self.sample_rate);
        }
        self.saturation_current = saturation_current;
        self.n_diodes = n_diodes;
        self.readapt();
    }

    fn readapt(&mut self) {
        self.parallel = Parallel::adapt(self.source.resistance, self.capacitor.resistance);
        self.diodes.configure(
            self.parallel.resistance,
            self.saturation_current,
            THERMAL_VOLTAGE * self.n_diodes,
        );
    }

    /// Current capacitance in farads.
    pub fn capacitance(&self) -> f32 {
        self.capacitor.capacitance
    }

    /// Runs one sample and returns the voltage across the capacitor.
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        self.source.voltage = x;

        let b1 = self.source.reflected();
        let b2 = self.capacitor.reflected();
        let b_diff = b2 - b1;
        let b_up = b2 - self.parallel.port1_reflect * b_diff;

        let a_down = self.diodes.reflect(b_up);

        let a2 = b_up + a_down - b2;
        let voltage = 0.5 * (a2 + b2);
        self.capacitor.incident(a2);
        voltage
    }

    /// Runs a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for s in block.iter_mut() {
            *s = self.process_sample(*s);
        }
    }
}

/// Capacitance that puts the RC corner at `cutoff_hz`.
fn capacitance_for(cutoff_hz: f32) -> f32 {
    1.0 / (2.0 * PI * SOURCE_RESISTANCE * cutoff_hz.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Solves w + ln(w) = x by bisection.
    fn omega_reference(x: f64) -> f64 {
        let (mut lo, mut hi) = (1e-12f64, x.abs() + 2.0);
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if mid + mid.ln() < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    #[test]
    fn omega4_tracks_wright_omega() {
        for &x in &[-2.0f32, -0.5, 0.0, 0.7, 3.0, 9.0, 25.0] {
            let w = f64::from(omega4(x));
            let reference = omega_reference(f64::from(x));
            assert!(
                (w - reference).abs() <= 0.02 * reference.max(1.0),
                "x={x}: got {w}, expected {reference}"
            );
        }
    }

    #[test]
    fn omega4_tail_is_exponential() {
        let w = omega4(-10.0);
        assert!((w - libm::expf(-10.0)).abs() < 1e-6);
    }

    #[test]
    fn small_signals_pass_unclipped() {
        let mut wdf = DiodeClipperWdf::new(48000.0);
        wdf.set_parameters(20000.0, DiodeType::Gz34.saturation_current(), 1.0);
        let mut last = 0.0;
        for _ in 0..2000 {
            last = wdf.process_sample(0.01);
        }
        assert!((last - 0.01).abs() < 1e-3, "DC gain should be unity, got {last}");
    }

    #[test]
    fn large_signals_clip() {
        let mut wdf = DiodeClipperWdf::new(48000.0);
        let mut peak = 0.0f32;
        for n in 0..4800 {
            let x = 10.0 * libm::sinf(2.0 * PI * 100.0 * n as f32 / 48000.0);
            peak = peak.max(wdf.process_sample(x).abs());
        }
        assert!(peak < 1.0, "peak {peak}");
        assert!(peak > 0.1, "peak {peak}");
    }

    #[test]
    fn more_diodes_raise_the_clip_level() {
        let run = |n_diodes: f32| {
            let mut wdf = DiodeClipperWdf::new(48000.0);
            wdf.set_parameters(2000.0, DiodeType::Silicon1N4148.saturation_current(), n_diodes);
            (0..4800)
                .map(|n| wdf.process_sample(5.0 * libm::sinf(2.0 * PI * 50.0 * n as f32 / 48000.0)))
                .fold(0.0f32, |m, y| m.max(y.abs()))
        };
        assert!(run(3.0) > run(1.0));
    }

    #[test]
    fn cutoff_sets_capacitance() {
        let mut wdf = DiodeClipperWdf::new(48000.0);
        wdf.set_parameters(1000.0, DiodeType::Gz34.saturation_current(), 1.0);
        let expected = 1.0 / (2.0 * PI * 4700.0 * 1000.0);
        assert!((wdf.capacitance() - expected).abs() / expected < 1e-5);
    }

    #[test]
    fn diode_type_round_trips_through_index() {
        assert_eq!(DiodeType::from_index(0.0), DiodeType::Gz34);
        assert_eq!(DiodeType::from_index(1.0), DiodeType::Germanium1N34);
        assert_eq!(DiodeType::from_index(2.0), DiodeType::Silicon1N4148);
        assert_eq!(DiodeType::from_index(7.0), DiodeType::Gz34);
        assert_eq!(DiodeType::LABELS.len(), 3);
    }

    #[test]
    fn reset_clears_state() {
        let mut wdf = DiodeClipperWdf::new(48000.0);
        for _ in 0..64 {
            wdf.process_sample(1.0);
        }
        wdf.reset(96000.0);
        assert_eq!(wdf.process_sample(0.0), 0.0);
    }
}
