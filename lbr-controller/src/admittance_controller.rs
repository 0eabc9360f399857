use crate::admittance::AdmittanceImpl;
use crate::controller_config::{ConfigError, ControllerConfig};
use crate::interfaces::{
    interface_name, joint_names, CommandInterfaces, ForceTorqueSensor, InterfaceConfiguration,
    MissingInterface, StateInterfaces, HW_IF_AUXILIARY_PREFIX, HW_IF_POSITION, HW_IF_SAMPLE_TIME,
    HW_IF_SESSION_STATE,
};
use crate::inv_jac_ctrl::{InvJacCtrlError, InvJacCtrlImpl};
use crate::kinematics::{pose_vector, RobotDescription};
use crate::types::{CartesianVector, JntArray, SessionState, UnknownSessionState, N_JNTS};
use crate::workspace_limit::WorkspaceLimit;
use nalgebra as na;
use std::f64::consts::PI;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("invalid controller configuration")]
    ConfigError(#[from] ConfigError),
    #[error("failed to initialize inverse jacobian control")]
    InvJacCtrlError(#[from] InvJacCtrlError),
    #[error("state interface unavailable")]
    MissingInterface(#[from] MissingInterface),
    #[error("number of joint position state interfaces {found} does not match the number of joints in the robot {expected}")]
    JointCount { found: usize, expected: usize },
    #[error("invalid session state")]
    SessionState(#[from] UnknownSessionState),
    #[error("update period must be positive, got {0:?}")]
    InvalidPeriod(Duration),
    #[error("can not {action} controller while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: LifecycleState,
    },
}

type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Inactive,
    Active,
}

/// Moves the robot compliantly in response to the estimated external wrench.
///
/// The wrench drives a virtual mass-spring-damper anchored at the pose the
/// tip had on the first update after activation. The resulting twist is
/// mapped onto joint position commands through the inverse jacobian.
pub struct AdmittanceController {
    lifecycle_state: LifecycleState,
    joint_names: Vec<String>,
    admittance: AdmittanceImpl,
    inv_jac_ctrl: InvJacCtrlImpl,
    workspace_limit: WorkspaceLimit,
    estimated_ft_sensor: Option<ForceTorqueSensor>,

    // admittance
    initialized: bool,
    x_init: CartesianVector,
    x_prev: CartesianVector,
    f_ext: CartesianVector,
    x: CartesianVector,
    dx: CartesianVector,
    ddx: CartesianVector,

    // joint velocity computation
    q: JntArray,
    dq: JntArray,
    twist_command: CartesianVector,
}

impl AdmittanceController {
    pub fn new(config: &ControllerConfig, description: &RobotDescription) -> Result<Self> {
        config.validate()?;
        let inv_jac_ctrl = InvJacCtrlImpl::new(description, config.inv_jac_ctrl.clone())?;
        let admittance = AdmittanceImpl::new(config.admittance.clone());
        info!("Admittance controller initialized.");
        info!("Mass: {}", config.admittance.mass);
        info!("Damping: {}", config.admittance.damping);
        info!("Stiffness: {}", config.admittance.stiffness);
        Ok(AdmittanceController {
            lifecycle_state: LifecycleState::Unconfigured,
            joint_names: joint_names(&config.robot_name),
            admittance,
            inv_jac_ctrl,
            workspace_limit: WorkspaceLimit::new(&config.workspace),
            estimated_ft_sensor: None,
            initialized: false,
            x_init: CartesianVector::zeros(),
            x_prev: CartesianVector::zeros(),
            f_ext: CartesianVector::zeros(),
            x: CartesianVector::zeros(),
            dx: CartesianVector::zeros(),
            ddx: CartesianVector::zeros(),
            q: JntArray::zeros(),
            dq: JntArray::zeros(),
            twist_command: CartesianVector::zeros(),
        })
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Last twist handed to the inverse jacobian controller
    pub fn twist_command(&self) -> &CartesianVector {
        &self.twist_command
    }

    pub fn command_interface_configuration(&self) -> InterfaceConfiguration {
        InterfaceConfiguration {
            names: self.joint_position_names(),
        }
    }

    pub fn state_interface_configuration(&self) -> InterfaceConfiguration {
        let mut names = self.joint_position_names();
        let sensor = self
            .estimated_ft_sensor
            .clone()
            .unwrap_or_else(ForceTorqueSensor::estimated);
        names.extend(sensor.state_interface_names().iter().cloned());
        names.push(interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SAMPLE_TIME));
        names.push(interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SESSION_STATE));
        InterfaceConfiguration { names }
    }

    fn joint_position_names(&self) -> Vec<String> {
        self.joint_names
            .iter()
            .map(|joint_name| interface_name(joint_name, HW_IF_POSITION))
            .collect()
    }

    pub fn configure(&mut self) -> Result<()> {
        self.expect_state("configure", LifecycleState::Unconfigured)?;
        self.estimated_ft_sensor = Some(ForceTorqueSensor::estimated());
        self.lifecycle_state = LifecycleState::Inactive;
        Ok(())
    }

    pub fn activate(&mut self, state: &StateInterfaces) -> Result<()> {
        self.expect_state("activate", LifecycleState::Inactive)?;
        self.reference_state_interfaces(state)?;
        self.zero_all_values();
        self.lifecycle_state = LifecycleState::Active;
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<()> {
        self.expect_state("deactivate", LifecycleState::Active)?;
        self.lifecycle_state = LifecycleState::Inactive;
        Ok(())
    }

    /// Runs one control cycle.
    ///
    /// Returns no command unless the robot is actively commanding.
    pub fn update(
        &mut self,
        state: &StateInterfaces,
        period: Duration,
    ) -> Result<Option<CommandInterfaces>> {
        self.expect_state("update", LifecycleState::Active)?;
        if period.is_zero() {
            return Err(ControllerError::InvalidPeriod(period));
        }
        let period_sec = period.as_secs_f64();

        if let Some(sensor) = &self.estimated_ft_sensor {
            self.f_ext = sensor.read(state)?;
        }
        self.read_joint_positions(state)?;

        let chain_tip_frame = self.inv_jac_ctrl.kinematics().forward_kinematics(&self.q);
        self.x = pose_vector(&chain_tip_frame);

        // steady state position and orientation
        if !self.initialized {
            self.x_init = self.x;
            self.x_prev = self.x;
            self.initialized = true;
        }

        self.dx = pose_difference(&self.x, &self.x_prev) / period_sec;
        self.ddx = self.admittance.compute(
            &self.f_ext,
            &pose_difference(&self.x, &self.x_init),
            &self.dx,
        );
        self.x_prev = self.x;

        self.twist_command = self.ddx * period_sec;

        let session_state = SessionState::try_from(
            state.get(&interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SESSION_STATE))?,
        )?;
        if session_state != SessionState::CommandingActive {
            return Ok(None);
        }

        self.dq = self.inv_jac_ctrl.compute(&self.twist_command, &self.q)?;
        let sample_time =
            state.get(&interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SAMPLE_TIME))?;
        let mut target = self
            .inv_jac_ctrl
            .kinematics()
            .clamp_to_limits(&(self.q + self.dq * sample_time));

        let target_tip = self
            .inv_jac_ctrl
            .kinematics()
            .forward_kinematics(&target)
            .translation
            .vector;
        if !self.workspace_limit.contains(&na::Point3::from(target_tip)) {
            warn!("Commanded tip position {:?} leaves the workspace", target_tip);
            target = self.q;
        }

        let mut command = CommandInterfaces::new();
        for (name, position) in self.joint_position_names().into_iter().zip(target.iter()) {
            command.set(name, *position);
        }
        Ok(Some(command))
    }

    fn expect_state(&self, action: &'static str, expected: LifecycleState) -> Result<()> {
        if self.lifecycle_state == expected {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                action,
                state: self.lifecycle_state,
            })
        }
    }

    fn reference_state_interfaces(&self, state: &StateInterfaces) -> Result<()> {
        let found = self
            .joint_position_names()
            .iter()
            .filter(|name| state.contains(name))
            .count();
        if found != N_JNTS {
            return Err(ControllerError::JointCount {
                found,
                expected: N_JNTS,
            });
        }
        if let Some(sensor) = &self.estimated_ft_sensor {
            sensor.assign(state)?;
        }
        state.get(&interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SAMPLE_TIME))?;
        state.get(&interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SESSION_STATE))?;
        Ok(())
    }

    fn read_joint_positions(&mut self, state: &StateInterfaces) -> Result<()> {
        for (q_i, name) in self.q.iter_mut().zip(self.joint_names.iter()) {
            *q_i = state.get(&interface_name(name, HW_IF_POSITION))?;
        }
        Ok(())
    }

    fn zero_all_values(&mut self) {
        self.initialized = false;
        self.f_ext.fill(0.0);
        self.x.fill(0.0);
        self.dx.fill(0.0);
        self.ddx.fill(0.0);
        self.dq.fill(0.0);
        self.twist_command.fill(0.0);
    }
}

/// Difference of two pose vectors with the angular part wrapped to [-pi, pi)
fn pose_difference(lhs: &CartesianVector, rhs: &CartesianVector) -> CartesianVector {
    let mut difference = lhs - rhs;
    for angle in difference.fixed_rows_mut::<3>(3).iter_mut() {
        *angle = (*angle + PI).rem_euclid(2.0 * PI) - PI;
    }
    difference
}
