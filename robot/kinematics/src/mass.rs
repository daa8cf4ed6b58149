//! Rigid-body mass properties and their combination.
//!
//! Used when a fixed joint is lumped: both bodies are expressed in the
//! surviving link's frame and summed about their combined center of mass.

use nalgebra::{Isometry3, Matrix3, Point3, Vector3};
use robot_sdf::{Inertia, Inertial, Pose};

use crate::error::NumericError;

/// Mass, center of mass and inertia about the center of mass, all expressed
/// in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Mass in kg.
    pub mass: f64,
    /// Center of mass.
    pub com: Vector3<f64>,
    /// Inertia about the center of mass, in the frame's axes.
    pub inertia: Matrix3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::zero()
    }
}

impl MassProperties {
    /// A massless body at the origin.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            com: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Mass properties of `inertial`, whose pose in the target frame is
    /// `frame_t_inertial`.
    #[must_use]
    pub fn from_inertial(inertial: &Inertial, frame_t_inertial: &Isometry3<f64>) -> Self {
        let r = frame_t_inertial.rotation.to_rotation_matrix();
        Self {
            mass: inertial.mass,
            com: frame_t_inertial.translation.vector,
            inertia: r.matrix() * inertial.inertia.to_matrix() * r.matrix().transpose(),
        }
    }

    /// The same body expressed in another frame, given `other_t_self`.
    #[must_use]
    pub fn transformed(&self, other_t_self: &Isometry3<f64>) -> Self {
        let r = other_t_self.rotation.to_rotation_matrix();
        Self {
            mass: self.mass,
            com: other_t_self.transform_point(&Point3::from(self.com)).coords,
            inertia: r.matrix() * self.inertia * r.matrix().transpose(),
        }
    }

    /// Combine two bodies expressed in the same frame.
    ///
    /// The combined center of mass is the mass-weighted average. If one side
    /// is massless the other side's center is used, and if both are the
    /// midpoint. Each inertia is shifted to the new center with the parallel
    /// axis theorem before summing.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let mass = self.mass + other.mass;
        let com = if self.mass > 0.0 && other.mass > 0.0 {
            (self.com * self.mass + other.com * other.mass) / mass
        } else if self.mass > 0.0 {
            self.com
        } else if other.mass > 0.0 {
            other.com
        } else {
            (self.com + other.com) * 0.5
        };
        let inertia = parallel_axis(&self.inertia, self.mass, &(self.com - com))
            + parallel_axis(&other.inertia, other.mass, &(other.com - com));
        Self { mass, com, inertia }
    }

    /// Convert back to an inertial whose pose is the center of mass with the
    /// frame's orientation.
    #[must_use]
    pub fn to_inertial(&self) -> Inertial {
        Inertial {
            mass: self.mass,
            pose: Some(Pose::new(self.com, Vector3::zeros())),
            inertia: Inertia::from_matrix(&self.inertia),
        }
    }
}

/// Check that `inertial` can enter mass computations: finite non-negative
/// mass, finite inertia and a finite pose.
///
/// # Errors
///
/// Returns [`NumericError`] naming `element` and the offending value.
pub fn check_inertial(inertial: &Inertial, element: &str) -> Result<(), NumericError> {
    if !inertial.mass.is_finite() {
        return Err(NumericError::new(element, format!("mass is {}", inertial.mass)));
    }
    if inertial.mass < 0.0 {
        return Err(NumericError::new(
            element,
            format!("mass {} is negative", inertial.mass),
        ));
    }
    if !inertial.inertia.is_finite() {
        return Err(NumericError::new(element, "inertia has non-finite components"));
    }
    match &inertial.pose {
        Some(pose) => check_pose(pose, element),
        None => Ok(()),
    }
}

/// Check that `pose` has only finite components.
///
/// # Errors
///
/// Returns [`NumericError`] naming `element`.
pub fn check_pose(pose: &Pose, element: &str) -> Result<(), NumericError> {
    if pose.is_finite() {
        Ok(())
    } else {
        Err(NumericError::new(element, "pose has non-finite components"))
    }
}

/// Inertia about a point displaced by `d` from the center of mass:
/// `I + m (d·d E - d dᵀ)`.
#[must_use]
pub fn parallel_axis(inertia: &Matrix3<f64>, mass: f64, d: &Vector3<f64>) -> Matrix3<f64> {
    inertia + (Matrix3::identity() * d.dot(d) - d * d.transpose()) * mass
}
