use crate::interfaces::{
    interface_name, joint_names, CommandInterfaces, ForceTorqueSensor, MissingInterface,
    StateInterfaces, HW_IF_AUXILIARY_PREFIX, HW_IF_POSITION, HW_IF_SAMPLE_TIME,
    HW_IF_SESSION_STATE,
};
use crate::types::{CartesianVector, JntArray, SessionState};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("command is missing an interface")]
    MissingCommand(#[from] MissingInterface),
    #[error("robot is not accepting commands in session state {0}")]
    NotCommanding(SessionState),
}

type Result<T> = std::result::Result<T, DriverError>;

#[async_trait]
pub trait RobotDriver: Send + Sync {
    async fn read_state(&mut self) -> Result<StateInterfaces>;
    async fn write_command(&mut self, command: &CommandInterfaces) -> Result<()>;
}

/// Robot that reaches every commanded position within one sample
pub struct SimulatedRobot {
    joint_names: Vec<String>,
    positions: JntArray,
    external_wrench: CartesianVector,
    sample_time: f64,
    session_state: SessionState,
}

impl SimulatedRobot {
    pub fn new(robot_name: &str, positions: JntArray, sample_time: f64) -> Self {
        SimulatedRobot {
            joint_names: joint_names(robot_name),
            positions,
            external_wrench: CartesianVector::zeros(),
            sample_time,
            session_state: SessionState::CommandingActive,
        }
    }

    pub fn with_external_wrench(mut self, external_wrench: CartesianVector) -> Self {
        self.external_wrench = external_wrench;
        self
    }

    pub fn with_session_state(mut self, session_state: SessionState) -> Self {
        self.session_state = session_state;
        self
    }

    pub fn set_external_wrench(&mut self, external_wrench: CartesianVector) {
        self.external_wrench = external_wrench;
    }

    pub fn set_session_state(&mut self, session_state: SessionState) {
        self.session_state = session_state;
    }

    pub fn positions(&self) -> &JntArray {
        &self.positions
    }
}

#[async_trait]
impl RobotDriver for SimulatedRobot {
    async fn read_state(&mut self) -> Result<StateInterfaces> {
        let mut state = StateInterfaces::new();
        for (name, position) in self.joint_names.iter().zip(self.positions.iter()) {
            state.set(interface_name(name, HW_IF_POSITION), *position);
        }
        let sensor = ForceTorqueSensor::estimated();
        for (name, value) in sensor
            .state_interface_names()
            .iter()
            .zip(self.external_wrench.iter())
        {
            state.set(name.clone(), *value);
        }
        state.set(
            interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SAMPLE_TIME),
            self.sample_time,
        );
        state.set(
            interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SESSION_STATE),
            self.session_state.as_f64(),
        );
        Ok(state)
    }

    async fn write_command(&mut self, command: &CommandInterfaces) -> Result<()> {
        if self.session_state != SessionState::CommandingActive {
            return Err(DriverError::NotCommanding(self.session_state));
        }
        let mut positions = self.positions;
        for (name, position) in self.joint_names.iter().zip(positions.iter_mut()) {
            *position = command.get(&interface_name(name, HW_IF_POSITION))?;
        }
        self.positions = positions;
        Ok(())
    }
}
