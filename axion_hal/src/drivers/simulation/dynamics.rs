//! Reference plant models.

use axion_common::consts::{DEFAULT_JOINT_INERTIA, MAX_AXES};
use axion_common::control_unit::config::DynamicsConfig;
use axion_common::hal::dynamics::PlantDynamics;
use axion_common::hal::error::HalError;
use nalgebra::DMatrix;
use tracing::info;

/// Build the plant model selected by `config` for `axes` joints.
pub fn plant_from_config(config: &DynamicsConfig, axes: usize) -> Result<Box<dyn PlantDynamics>, HalError> {
    let plant: Box<dyn PlantDynamics> = match config {
        DynamicsConfig::Decoupled { inertia, damping } => {
            Box::new(DecoupledInertia::new(axes, inertia, damping)?)
        }
        DynamicsConfig::Coupled {
            mass_matrix,
            damping,
            gravity,
        } => {
            let n = mass_matrix.len();
            if n != axes || mass_matrix.iter().any(|row| row.len() != n) {
                return Err(HalError::ConfigError(format!(
                    "mass_matrix must be {axes}x{axes} to match the calibrated axes"
                )));
            }
            let m = DMatrix::from_fn(n, n, |r, c| mass_matrix[r][c]);
            Box::new(CoupledInertia::new(m, damping, gravity)?)
        }
    };
    info!(axes, model = config_name(config), "Plant model ready");
    Ok(plant)
}

fn config_name(config: &DynamicsConfig) -> &'static str {
    match config {
        DynamicsConfig::Decoupled { .. } => "decoupled",
        DynamicsConfig::Coupled { .. } => "coupled",
    }
}

/// Pad `values` to `len` with `fill`.
fn padded(values: &[f64], len: usize, fill: f64, what: &str) -> Result<Vec<f64>, HalError> {
    if values.len() > len {
        return Err(HalError::ConfigError(format!(
            "{} {what} values for {len} axes",
            values.len()
        )));
    }
    let mut out = values.to_vec();
    out.resize(len, fill);
    Ok(out)
}

// ─── Decoupled ──────────────────────────────────────────────────────

/// Independent joints: `a_i = (τ_i − d_i·v_i) / J_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoupledInertia {
    inertia: Vec<f64>,
    damping: Vec<f64>,
}

impl DecoupledInertia {
    /// Unit inertia and no damping unless given.
    pub fn new(axes: usize, inertia: &[f64], damping: &[f64]) -> Result<Self, HalError> {
        let inertia = padded(inertia, axes, DEFAULT_JOINT_INERTIA, "inertia")?;
        if let Some(j) = inertia.iter().find(|j| !(j.is_finite() && **j > 0.0)) {
            return Err(HalError::ConfigError(format!("inertia {j} must be positive")));
        }
        Ok(Self {
            inertia,
            damping: padded(damping, axes, 0.0, "damping")?,
        })
    }
}

impl PlantDynamics for DecoupledInertia {
    fn axes(&self) -> usize {
        self.inertia.len()
    }

    fn forward(&self, torque: &[f64], velocity: &[f64], _position: &[f64], acceleration: &mut [f64]) {
        for (i, acc) in acceleration.iter_mut().enumerate().take(self.inertia.len()) {
            *acc = (torque[i] - self.damping[i] * velocity[i]) / self.inertia[i];
        }
    }
}

// ─── Coupled ────────────────────────────────────────────────────────

/// Constant mass matrix: `M·a = τ − d∘v − g∘sin(q)`.
///
/// `M` is factored once; each step is a matrix-vector product.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledInertia {
    inverse_mass: DMatrix<f64>,
    damping: Vec<f64>,
    gravity: Vec<f64>,
}

impl CoupledInertia {
    /// Factor `mass_matrix`, which must be symmetric positive-definite.
    pub fn new(mass_matrix: DMatrix<f64>, damping: &[f64], gravity: &[f64]) -> Result<Self, HalError> {
        let n = mass_matrix.nrows();
        if n == 0 || n > MAX_AXES || mass_matrix.ncols() != n {
            return Err(HalError::ConfigError(format!(
                "mass matrix must be square with 1..={MAX_AXES} rows"
            )));
        }
        if (&mass_matrix - mass_matrix.transpose()).amax() > 1e-9 {
            return Err(HalError::ConfigError("mass matrix is not symmetric".to_string()));
        }
        let inverse_mass = mass_matrix
            .cholesky()
            .ok_or_else(|| HalError::ConfigError("mass matrix is not positive-definite".to_string()))?
            .inverse();
        Ok(Self {
            inverse_mass,
            damping: padded(damping, n, 0.0, "damping")?,
            gravity: padded(gravity, n, 0.0, "gravity")?,
        })
    }
}

impl PlantDynamics for CoupledInertia {
    fn axes(&self) -> usize {
        self.inverse_mass.nrows()
    }

    fn forward(&self, torque: &[f64], velocity: &[f64], position: &[f64], acceleration: &mut [f64]) {
        let n = self.axes();
        let mut rhs = [0.0; MAX_AXES];
        for (j, r) in rhs.iter_mut().enumerate().take(n) {
            *r = torque[j] - self.damping[j] * velocity[j] - self.gravity[j] * position[j].sin();
        }
        for (i, acc) in acceleration.iter_mut().enumerate().take(n) {
            *acc = (0..n).map(|j| self.inverse_mass[(i, j)] * rhs[j]).sum();
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
