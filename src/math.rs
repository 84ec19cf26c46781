//! # Math
//!
//! Checked helpers on top of [glam] for the operations the transform graph relies on. Matrices
//! are column-major and TRS matrices are always composed as `translation * rotation * scale`.

use glam::Mat3;
use glam::Mat4;
use glam::Quat;
use glam::Vec3;

/// Tolerance used when checking that a quaternion is normalized.
pub const NORMALIZATION_EPSILON: f32 = 1e-4;

/// Determinants with an absolute value below this are treated as singular.
pub const SINGULARITY_EPSILON: f32 = 1e-12;

/// # Math Error
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum MathError {
    /// A rotation conversion received a quaternion that is not unit length.
    #[error("quaternion is not normalized (length {length})")]
    NotNormalized {
        /// Length of the rejected quaternion.
        length: f32,
    },
    /// The quaternion has zero or non-finite length and cannot be normalized.
    #[error("quaternion cannot be normalized")]
    DegenerateQuaternion,
    /// The matrix has no inverse.
    #[error("matrix is singular (determinant {determinant})")]
    SingularMatrix {
        /// Determinant of the rejected matrix.
        determinant: f32,
    },
    /// A vector or matrix was divided by zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Decomposed translation, rotation, and scale of a matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decomposed {
    /// Translation, the last matrix column.
    pub translation: Vec3,
    /// Unit rotation.
    pub rotation: Quat,
    /// Per-axis scale, the length of each basis column.
    pub scale: Vec3,
}

/// Returns the quaternion scaled to unit length.
pub fn normalize_quat(rotation: Quat) -> Result<Quat, MathError> {
    let length = rotation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        return Err(MathError::DegenerateQuaternion);
    }

    Ok(rotation / length)
}

/// Returns the 3x3 rotation matrix of a unit quaternion.
pub fn quat_to_mat3(rotation: Quat) -> Result<Mat3, MathError> {
    ensure_normalized(rotation)?;
    Ok(Mat3::from_quat(rotation))
}

/// Returns the 4x4 rotation matrix of a unit quaternion.
pub fn quat_to_mat4(rotation: Quat) -> Result<Mat4, MathError> {
    ensure_normalized(rotation)?;
    Ok(Mat4::from_quat(rotation))
}

/// Returns the rotation described by an orthonormal basis.
pub fn quat_from_mat3(matrix: &Mat3) -> Quat {
    Quat::from_mat3(matrix)
}

/// Returns `translation * rotation * scale`. The rotation must be normalized.
pub fn trs_matrix(translation: Vec3, rotation: Quat, scale: Vec3) -> Result<Mat4, MathError> {
    Ok(Mat4::from_translation(translation) * quat_to_mat4(rotation)? * Mat4::from_scale(scale))
}

/// Returns the inverse of the matrix.
pub fn inverse(matrix: &Mat4) -> Result<Mat4, MathError> {
    let determinant = matrix.determinant();
    if !determinant.is_finite() || determinant.abs() < SINGULARITY_EPSILON {
        return Err(MathError::SingularMatrix { determinant });
    }

    Ok(matrix.inverse())
}

/// Divides the vector by the scalar.
pub fn try_div(vector: Vec3, scalar: f32) -> Result<Vec3, MathError> {
    if scalar == 0.0 {
        return Err(MathError::DivisionByZero);
    }

    Ok(vector / scalar)
}

/// Decomposes an affine matrix into translation, rotation, and scale.
///
/// A basis column of zero length is left as is instead of being normalized, so zero scales
/// decompose without producing NaN.
pub fn decompose(matrix: &Mat4) -> Decomposed {
    let translation = matrix.w_axis.truncate();

    let mut columns = [
        matrix.x_axis.truncate(),
        matrix.y_axis.truncate(),
        matrix.z_axis.truncate(),
    ];
    let scale = Vec3::new(
        columns[0].length(),
        columns[1].length(),
        columns[2].length(),
    );

    for (column, length) in columns.iter_mut().zip(scale.to_array()) {
        if let Ok(normalized) = try_div(*column, length) {
            *column = normalized;
        }
    }

    let rotation = quat_from_mat3(&Mat3::from_cols(columns[0], columns[1], columns[2]));

    Decomposed {
        translation,
        rotation: normalize_quat(rotation).unwrap_or(Quat::IDENTITY),
        scale,
    }
}

fn ensure_normalized(rotation: Quat) -> Result<(), MathError> {
    let length = rotation.length();
    if (length - 1.0).abs() > NORMALIZATION_EPSILON {
        return Err(MathError::NotNormalized { length });
    }

    Ok(())
}
