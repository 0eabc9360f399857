use crate::controller_config::InvJacCtrlParameters;
use crate::kinematics::{KinematicChain, KinematicsError, RobotDescription};
use crate::types::{CartesianVector, JntArray, CARTESIAN_DOF};
use nalgebra as na;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvJacCtrlError {
    #[error("failed to build kinematic chain")]
    KinematicsError(#[from] KinematicsError),
    #[error("jacobian is singular, increase damping")]
    SingularJacobian,
}

type Result<T> = std::result::Result<T, InvJacCtrlError>;

/// Maps Cartesian twists to joint velocities with a damped pseudo inverse
#[derive(Debug, Clone)]
pub struct InvJacCtrlImpl {
    parameters: InvJacCtrlParameters,
    chain: KinematicChain,
}

impl InvJacCtrlImpl {
    pub fn new(description: &RobotDescription, parameters: InvJacCtrlParameters) -> Result<Self> {
        let chain = description.chain(&parameters.chain_root, &parameters.chain_tip)?;
        Ok(InvJacCtrlImpl { parameters, chain })
    }

    pub fn kinematics(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn parameters(&self) -> &InvJacCtrlParameters {
        &self.parameters
    }

    pub fn compute(&self, twist: &CartesianVector, q: &JntArray) -> Result<JntArray> {
        let mut twist = clamp_twist(
            twist,
            self.parameters.max_linear_velocity,
            self.parameters.max_angular_velocity,
        );

        if self.parameters.twist_in_tip_frame {
            let rotation = self.chain.forward_kinematics(q).rotation;
            let linear = rotation * twist.fixed_rows::<3>(0).into_owned();
            let angular = rotation * twist.fixed_rows::<3>(3).into_owned();
            twist.fixed_rows_mut::<3>(0).copy_from(&linear);
            twist.fixed_rows_mut::<3>(3).copy_from(&angular);
        }

        let jacobian = self.chain.jacobian(q);
        let damping = self.parameters.damping * self.parameters.damping;
        let jjt = jacobian * jacobian.transpose()
            + na::SMatrix::<f64, CARTESIAN_DOF, CARTESIAN_DOF>::identity() * damping;
        let inverse = jjt
            .try_inverse()
            .ok_or(InvJacCtrlError::SingularJacobian)?;
        let dq = jacobian.transpose() * inverse * twist;

        Ok(limit_joint_velocity(&dq, &self.chain.velocity_limits()))
    }
}

/// Scales linear and angular parts separately, keeping their direction
pub fn clamp_twist(
    twist: &CartesianVector,
    max_linear_velocity: f64,
    max_angular_velocity: f64,
) -> CartesianVector {
    let mut clamped = *twist;
    let linear = twist.fixed_rows::<3>(0).into_owned();
    if linear.norm() > max_linear_velocity {
        clamped
            .fixed_rows_mut::<3>(0)
            .copy_from(&(linear.normalize() * max_linear_velocity));
    }
    let angular = twist.fixed_rows::<3>(3).into_owned();
    if angular.norm() > max_angular_velocity {
        clamped
            .fixed_rows_mut::<3>(3)
            .copy_from(&(angular.normalize() * max_angular_velocity));
    }
    clamped
}

fn limit_joint_velocity(dq: &JntArray, limits: &JntArray) -> JntArray {
    let ratio = dq
        .iter()
        .zip(limits.iter())
        .map(|(dq_i, limit)| dq_i.abs() / limit)
        .fold(1.0, f64::max);
    dq / ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bent_configuration() -> JntArray {
        JntArray::from_column_slice(&[0.1, 0.5, -0.2, -1.2, 0.3, 0.8, -0.4])
    }

    fn base_frame_parameters() -> InvJacCtrlParameters {
        InvJacCtrlParameters {
            twist_in_tip_frame: false,
            damping: 0.0,
            max_linear_velocity: 1.0,
            max_angular_velocity: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn twist_within_limits_is_unchanged() {
        let twist = CartesianVector::new(0.05, 0.0, 0.0, 0.0, 0.02, 0.0);
        assert_relative_eq!(clamp_twist(&twist, 0.1, 0.1), twist);
    }

    #[test]
    fn twist_is_clamped_keeping_direction() {
        let twist = CartesianVector::new(0.3, 0.4, 0.0, 0.0, 0.0, 2.0);
        let clamped = clamp_twist(&twist, 0.1, 0.5);
        assert_relative_eq!(
            clamped,
            CartesianVector::new(0.06, 0.08, 0.0, 0.0, 0.0, 0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn undamped_inverse_reproduces_twist() {
        let ctrl =
            InvJacCtrlImpl::new(&RobotDescription::included_iiwa7(), base_frame_parameters())
                .unwrap();
        let q = bent_configuration();
        let twist = CartesianVector::new(0.02, -0.01, 0.03, 0.0, 0.05, -0.02);
        let dq = ctrl.compute(&twist, &q).unwrap();
        let reproduced = ctrl.kinematics().jacobian(&q) * dq;
        assert_relative_eq!(reproduced, twist, epsilon = 1e-9);
    }

    #[test]
    fn tip_frame_twist_is_rotated_into_base() {
        let description = RobotDescription::included_iiwa7();
        let base_ctrl = InvJacCtrlImpl::new(&description, base_frame_parameters()).unwrap();
        let tip_ctrl = InvJacCtrlImpl::new(
            &description,
            InvJacCtrlParameters {
                twist_in_tip_frame: true,
                ..base_frame_parameters()
            },
        )
        .unwrap();
        let q = bent_configuration();
        let tip_twist = CartesianVector::new(0.0, 0.0, 0.05, 0.0, 0.0, 0.0);
        let rotation = base_ctrl.kinematics().forward_kinematics(&q).rotation;
        let linear = rotation * na::Vector3::new(0.0, 0.0, 0.05);
        let base_twist = CartesianVector::new(linear.x, linear.y, linear.z, 0.0, 0.0, 0.0);
        assert_relative_eq!(
            tip_ctrl.compute(&tip_twist, &q).unwrap(),
            base_ctrl.compute(&base_twist, &q).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn damped_inverse_handles_singular_configuration() {
        let ctrl = InvJacCtrlImpl::new(
            &RobotDescription::included_iiwa7(),
            InvJacCtrlParameters::default(),
        )
        .unwrap();
        // stretched out arm is singular
        let dq = ctrl
            .compute(
                &CartesianVector::new(0.0, 0.0, 0.1, 0.0, 0.0, 0.0),
                &JntArray::zeros(),
            )
            .unwrap();
        assert!(dq.iter().all(|dq_i| dq_i.is_finite()));
    }

    #[test]
    fn joint_velocities_respect_limits() {
        let limits = JntArray::from_element(1.0);
        let dq = JntArray::from_column_slice(&[0.5, -4.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
        let limited = limit_joint_velocity(&dq, &limits);
        assert_relative_eq!(limited[1], -1.0);
        assert_relative_eq!(limited[0], 0.125);
        assert_relative_eq!(limit_joint_velocity(&(dq / 4.0), &limits), dq / 4.0);
    }

    #[test]
    fn unknown_chain_fails() {
        let result = InvJacCtrlImpl::new(
            &RobotDescription::included_iiwa7(),
            InvJacCtrlParameters {
                chain_tip: String::from("gripper"),
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(InvJacCtrlError::KinematicsError(KinematicsError::UnknownLink(_)))
        ));
    }

    #[test]
    fn zero_velocity_limit_fails() {
        let mut description = RobotDescription::included_iiwa7();
        for joint in &mut description.joints {
            if let Some(limits) = &mut joint.limits {
                limits.velocity = 0.0;
            }
        }
        let result = InvJacCtrlImpl::new(&description, InvJacCtrlParameters::default());
        assert!(matches!(
            result,
            Err(InvJacCtrlError::KinematicsError(
                KinematicsError::InvalidLimits { .. }
            ))
        ));
    }
}
