//! Forward dynamics of the simulated plant.

/// Maps joint torques to joint accelerations.
///
/// Called once per control cycle, only in simulation. Implementations must be
/// deterministic and free of side effects; all slices have the axis count as
/// their length.
pub trait PlantDynamics: Send + Sync {
    /// Number of joints the model describes.
    fn axes(&self) -> usize;

    /// Fill `acceleration` for the given torque, velocity and position.
    fn forward(&self, torque: &[f64], velocity: &[f64], position: &[f64], acceleration: &mut [f64]);
}
