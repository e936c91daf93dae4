//! Nodal-DK model of a Cry-Baby-style wah.
//!
//! Four unknown node voltages: the input node `A`, the pot wiper `P`, the
//! resonant tank node `B` and the output node `O`.
//!
//! | Element | Between | Default |
//! |---------|---------|---------|
//! | source resistance | vin – A | 22 kΩ |
//! | feed resistor | A – B | 33 kΩ |
//! | pot, upper half | A – P | (1 − α) · 100 kΩ |
//! | pot, lower half | P – gnd | α · 100 kΩ |
//! | sweep capacitor | P – B | 47 nF |
//! | tank capacitor | B – gnd | 10 nF |
//! | inductor + series R | B – gnd | 0.5 H, 100 Ω |
//! | bias feed | 9 V – B | 470 kΩ |
//! | diode pair | B – gnd | Is 2.52 nA, nVt 45 mV |
//! | coupling capacitor | B – O | 10 nF |
//! | load | O – gnd | 1 MΩ |
//!
//! Reactive elements use trapezoidal companion models: a conductance plus a
//! history current source, one history value per element per channel.
//!
//! The linear part of the network is `G · v = b`. [`WahCircuit::update_pots`]
//! restamps `G` and caches its inverse `S`. Per sample the only nonlinearity
//! is the diode pair at `B`, which reduces to the scalar equation
//!
//! ```text
//! v = p + K · i(v),   p = (S · b)[B],   K = −S[B][B]
//! ```
//!
//! `K` is negative for any passive network, so `p + K·i(v) − v` is strictly
//! decreasing and Newton–Raphson from the previous sample's solution converges
//! to the unique root.

const NODES: usize = 4;

type Matrix = [[f64; NODES]; NODES];

const NODE_INPUT: usize = 0;
const NODE_WIPER: usize = 1;
const NODE_TANK: usize = 2;
const NODE_OUT: usize = 3;

/// Largest diode exponent before the junction law is clamped.
const EXP_LIMIT: f64 = 80.0;

/// Pot halves never go below this many ohms.
const MIN_POT_OHMS: f64 = 1.0;

/// Pivots smaller than this make the matrix singular.
const SINGULAR_PIVOT: f64 = 1e-300;

/// Newton–Raphson limits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverSettings {
    /// Iterations per sample before the sample counts as a fallback.
    pub max_iterations: usize,
    /// Convergence threshold on the voltage step, in volts.
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            tolerance: 1e-9,
        }
    }
}

/// Component values. SI units throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WahComponents {
    /// Source resistance into node A.
    pub r_source: f64,
    /// Feed resistor from A to the tank.
    pub r_feed: f64,
    /// Total pot resistance.
    pub pot: f64,
    /// Sweep capacitor from the wiper to the tank.
    pub c_sweep: f64,
    /// Tank capacitor.
    pub c_tank: f64,
    /// Tank inductance.
    pub inductance: f64,
    /// Inductor winding resistance.
    pub r_inductor: f64,
    /// Bias feed resistor.
    pub r_bias: f64,
    /// Bias supply voltage.
    pub v_bias: f64,
    /// Output coupling capacitor.
    pub c_coupling: f64,
    /// Output load.
    pub r_load: f64,
    /// Saturation current of each diode.
    pub diode_is: f64,
    /// Emission coefficient times thermal voltage.
    pub diode_nvt: f64,
}

impl Default for WahComponents {
    fn default() -> Self {
        Self {
            r_source: 22e3,
            r_feed: 33e3,
            pot: 100e3,
            c_sweep: 47e-9,
            c_tank: 10e-9,
            inductance: 0.5,
            r_inductor: 100.0,
            r_bias: 470e3,
            v_bias: 9.0,
            c_coupling: 10e-9,
            r_load: 1e6,
            diode_is: 2.52e-9,
            diode_nvt: 0.045,
        }
    }
}

/// Per-channel history.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    sweep: f64,
    tank: f64,
    coupling: f64,
    inductor: f64,
    /// Diode voltage of the last converged sample, the next Newton start.
    v_diode: f64,
    last_output: f64,
}

/// Companion-model conductances for one sample rate.
#[derive(Debug, Clone, Copy, Default)]
struct Discretised {
    g_sweep: f64,
    g_tank: f64,
    g_coupling: f64,
    /// `T / 2L`
    g_inductor: f64,
    /// Inductor and series resistor seen as one branch.
    g_inductor_branch: f64,
    /// `1 / (1 + g_inductor · R_L)`
    inductor_scale: f64,
}

/// Stereo nodal-DK wah circuit.
///
/// ```rust
/// use tonegraph_models::dk::{SolverSettings, WahCircuit};
///
/// let mut wah = WahCircuit::new(SolverSettings::default());
/// wah.reset(96000.0);
/// wah.update_pots(50e3, 50e3);
/// let y = wah.process_sample(0, 0.1);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct WahCircuit {
    parts: WahComponents,
    settings: SolverSettings,
    sample_rate: f64,
    disc: Discretised,
    base: Matrix,
    inverse: Matrix,
    r_upper: f64,
    r_lower: f64,
    v_crit: f64,
    channels: [ChannelState; 2],
    fallbacks: u64,
}

impl WahCircuit {
    /// Builds the default circuit at 48 kHz with the pot centred.
    pub fn new(settings: SolverSettings) -> Self {
        Self::with_components(WahComponents::default(), settings)
    }

    /// Builds a circuit from explicit component values.
    pub fn with_components(parts: WahComponents, settings: SolverSettings) -> Self {
        let half = 0.5 * parts.pot;
        let nvt = parts.diode_nvt;
        let mut circuit = Self {
            parts,
            settings,
            sample_rate: 48000.0,
            disc: Discretised::default(),
            base: [[0.0; NODES]; NODES],
            inverse: [[0.0; NODES]; NODES],
            r_upper: half,
            r_lower: half,
            v_crit: nvt * libm::log(nvt / (core::f64::consts::SQRT_2 * parts.diode_is)),
            channels: [ChannelState::default(); 2],
            fallbacks: 0,
        };
        circuit.reset(48000.0);
        circuit
    }

    /// Component values.
    pub fn components(&self) -> &WahComponents {
        &self.parts
    }

    /// Solver limits.
    pub fn settings(&self) -> SolverSettings {
        self.settings
    }

    /// Sample rate the companion models are discretised at.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Re-discretises at `sample_rate`, clears all history and the fallback
    /// counter, and re-inverts with the current pot position.
    pub fn reset(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        let p = &self.parts;
        let g_inductor = 1.0 / (2.0 * p.inductance * sample_rate);
        let inductor_scale = 1.0 / (1.0 + g_inductor * p.r_inductor);
        self.disc = Discretised {
            g_sweep: 2.0 * p.c_sweep * sample_rate,
            g_tank: 2.0 * p.c_tank * sample_rate,
            g_coupling: 2.0 * p.c_coupling * sample_rate,
            g_inductor,
            g_inductor_branch: g_inductor * inductor_scale,
            inductor_scale,
        };

        let d = &self.disc;
        let mut base = [[0.0; NODES]; NODES];
        stamp(&mut base, NODE_INPUT, None, 1.0 / p.r_source);
        stamp(&mut base, NODE_INPUT, Some(NODE_TANK), 1.0 / p.r_feed);
        stamp(&mut base, NODE_WIPER, Some(NODE_TANK), d.g_sweep);
        stamp(
            &mut base,
            NODE_TANK,
            None,
            d.g_tank + d.g_inductor_branch + 1.0 / p.r_bias,
        );
        stamp(&mut base, NODE_TANK, Some(NODE_OUT), d.g_coupling);
        stamp(&mut base, NODE_OUT, None, 1.0 / p.r_load);
        self.base = base;

        self.channels = [ChannelState::default(); 2];
        self.fallbacks = 0;
        let (upper, lower) = (self.r_upper, self.r_lower);
        if !self.update_pots(upper, lower) {
            self.update_pots(0.5 * self.parts.pot, 0.5 * self.parts.pot);
        }
    }

    /// Sets the two pot halves, restamps the conductance matrix and inverts it.
    ///
    /// Returns false and keeps the previous inverse when the values are not
    /// finite or the matrix is singular.
    pub fn update_pots(&mut self, r_upper: f64, r_lower: f64) -> bool {
        if !(r_upper.is_finite() && r_lower.is_finite()) {
            return false;
        }
        let r_upper = r_upper.max(MIN_POT_OHMS);
        let r_lower = r_lower.max(MIN_POT_OHMS);

        let mut g = self.base;
        stamp(&mut g, NODE_INPUT, Some(NODE_WIPER), 1.0 / r_upper);
        stamp(&mut g, NODE_WIPER, None, 1.0 / r_lower);

        match invert(&g) {
            Some(inverse) => {
                self.inverse = inverse;
                self.r_upper = r_upper;
                self.r_lower = r_lower;
                true
            }
            None => false,
        }
    }

    /// Current pot halves `(upper, lower)`.
    pub fn pots(&self) -> (f64, f64) {
        (self.r_upper, self.r_lower)
    }

    /// Samples that fell back to the last valid state since the last reset.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Runs one sample on `channel` (0 or 1) and returns the output voltage.
    ///
    /// On non-convergence or a non-finite value the channel keeps its state,
    /// the previous output is returned and the fallback counter goes up.
    pub fn process_sample(&mut self, channel: usize, input: f64) -> f64 {
        let Some(&state) = self.channels.get(channel) else {
            return 0.0;
        };

        let b = self.rhs(&state, input);
        let s = &self.inverse;
        let p = dot(&s[NODE_TANK], &b);
        let k = -s[NODE_TANK][NODE_TANK];

        let Some(v_diode) = self.solve_diode(p, k, state.v_diode) else {
            self.fallbacks += 1;
            return state.last_output;
        };
        let (i_diode, _) = diode(v_diode, &self.parts);

        let mut v = [0.0; NODES];
        for (node, row) in v.iter_mut().zip(s.iter()) {
            *node = dot(row, &b) - row[NODE_TANK] * i_diode;
        }
        if !v.iter().all(|x| x.is_finite()) {
            self.fallbacks += 1;
            return state.last_output;
        }

        let d = &self.disc;
        let v_tank = v[NODE_TANK];
        let i_inductor = d.g_inductor_branch * v_tank + d.inductor_scale * state.inductor;
        let v_inductor = v_tank - self.parts.r_inductor * i_inductor;

        let next = ChannelState {
            sweep: 2.0 * d.g_sweep * (v[NODE_WIPER] - v_tank) - state.sweep,
            tank: 2.0 * d.g_tank * v_tank - state.tank,
            coupling: 2.0 * d.g_coupling * (v_tank - v[NODE_OUT]) - state.coupling,
            inductor: i_inductor + d.g_inductor * v_inductor,
            v_diode,
            last_output: v[NODE_OUT],
        };
        self.channels[channel] = next;
        next.last_output
    }

    /// Source vector: input drive, bias and every history current.
    #[inline]
    fn rhs(&self, state: &ChannelState, input: f64) -> [f64; NODES] {
        let p = &self.parts;
        let mut b = [0.0; NODES];
        b[NODE_INPUT] = input / p.r_source;
        b[NODE_WIPER] = state.sweep;
        b[NODE_TANK] = -state.sweep + state.tank + state.coupling + p.v_bias / p.r_bias
            - self.disc.inductor_scale * state.inductor;
        b[NODE_OUT] = -state.coupling;
        b
    }

    /// Newton–Raphson on `p + K·i(v) − v = 0`.
    fn solve_diode(&self, p: f64, k: f64, guess: f64) -> Option<f64> {
        let mut v = if guess.is_finite() { guess } else { 0.0 };
        for _ in 0..self.settings.max_iterations {
            let (i, di) = diode(v, &self.parts);
            let f = p + k * i - v;
            let df = k * di - 1.0;
            let next = self.limit_junction(v, v - f / df);
            if !next.is_finite() {
                return None;
            }
            let step = next - v;
            v = next;
            if step.abs() < self.settings.tolerance {
                return Some(v);
            }
        }
        None
    }

    /// Keeps a Newton step from running far up the exponential.
    #[inline]
    fn limit_junction(&self, old: f64, new: f64) -> f64 {
        let nvt = self.parts.diode_nvt;
        if new.abs() <= self.v_crit || (new - old).abs() <= 2.0 * nvt {
            return new;
        }
        let base = if old.signum() == new.signum() {
            old.abs()
        } else {
            0.0
        };
        if new.abs() <= base {
            return new;
        }
        new.signum() * (base + nvt * libm::log(1.0 + (new.abs() - base) / nvt))
    }
}

/// Antiparallel pair current and its derivative at `v`.
#[inline]
fn diode(v: f64, parts: &WahComponents) -> (f64, f64) {
    let x = (v / parts.diode_nvt).clamp(-EXP_LIMIT, EXP_LIMIT);
    let current = 2.0 * parts.diode_is * libm::sinh(x);
    let slope = 2.0 * parts.diode_is * libm::cosh(x) / parts.diode_nvt;
    (current, slope)
}

/// Adds conductance `g` between node `a` and node `b` (ground when `None`).
fn stamp(m: &mut Matrix, a: usize, b: Option<usize>, g: f64) {
    m[a][a] += g;
    if let Some(b) = b {
        m[b][b] += g;
        m[a][b] -= g;
        m[b][a] -= g;
    }
}

#[inline]
fn dot(row: &[f64; NODES], b: &[f64; NODES]) -> f64 {
    row.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gauss–Jordan inverse with partial pivoting.
fn invert(m: &Matrix) -> Option<Matrix> {
    let mut a = *m;
    let mut inv = [[0.0; NODES]; NODES];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..NODES {
        let pivot = (col..NODES).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        let magnitude = a[pivot][col].abs();
        if magnitude.is_nan() || magnitude <= SINGULAR_PIVOT {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let d = a[col][col];
        for k in 0..NODES {
            a[col][k] /= d;
            inv[col][k] /= d;
        }
        let (pivot_row, pivot_inv) = (a[col], inv[col]);
        for row in 0..NODES {
            if row == col {
                continue;
            }
            let f = a[row][col];
            if f == 0.0 {
                continue;
            }
            for k in 0..NODES {
                a[row][k] -= f * pivot_row[k];
                inv[row][k] -= f * pivot_inv[k];
            }
        }
    }

    inv.iter().flatten().all(|x| x.is_finite()).then_some(inv)
}
