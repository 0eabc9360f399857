use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of joints of the LBR
pub const N_JNTS: usize = 7;
/// Linear and angular
pub const CARTESIAN_DOF: usize = 6;

pub type JntArray = na::SVector<f64, N_JNTS>;
/// Three linear components followed by three angular components
pub type CartesianVector = na::SVector<f64, CARTESIAN_DOF>;
pub type Jacobian = na::SMatrix<f64, CARTESIAN_DOF, N_JNTS>;

#[derive(Error, Debug, PartialEq)]
#[error("unknown session state value {0}")]
pub struct UnknownSessionState(pub f64);

/// Session state as reported by the robot's fast research interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    MonitoringWait,
    MonitoringReady,
    CommandingWait,
    CommandingActive,
}

impl SessionState {
    pub fn as_f64(&self) -> f64 {
        match self {
            SessionState::Idle => 0.0,
            SessionState::MonitoringWait => 1.0,
            SessionState::MonitoringReady => 2.0,
            SessionState::CommandingWait => 3.0,
            SessionState::CommandingActive => 4.0,
        }
    }
}

impl TryFrom<f64> for SessionState {
    type Error = UnknownSessionState;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        // interfaces carry every value as a double
        match value as i64 {
            _ if value.fract() != 0.0 => Err(UnknownSessionState(value)),
            0 => Ok(SessionState::Idle),
            1 => Ok(SessionState::MonitoringWait),
            2 => Ok(SessionState::MonitoringReady),
            3 => Ok(SessionState::CommandingWait),
            4 => Ok(SessionState::CommandingActive),
            _ => Err(UnknownSessionState(value)),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "IDLE",
            SessionState::MonitoringWait => "MONITORING_WAIT",
            SessionState::MonitoringReady => "MONITORING_READY",
            SessionState::CommandingWait => "COMMANDING_WAIT",
            SessionState::CommandingActive => "COMMANDING_ACTIVE",
        };
        write!(f, "{}", name)
    }
}
