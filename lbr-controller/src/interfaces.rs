//! Names and values exchanged between the controller and the robot.
//!
//! Every interface is a `prefix/interface` name carrying a single `f64`,
//! e.g. `lbr_A1/position` or `auxiliary_sensor/session_state`.

use crate::types::{CartesianVector, N_JNTS};
use std::collections::BTreeMap;
use thiserror::Error;

pub const HW_IF_POSITION: &str = "position";
pub const HW_IF_AUXILIARY_PREFIX: &str = "auxiliary_sensor";
pub const HW_IF_SAMPLE_TIME: &str = "sample_time";
pub const HW_IF_SESSION_STATE: &str = "session_state";
pub const HW_IF_ESTIMATED_FT_PREFIX: &str = "estimated_ft_sensor";
pub const HW_IF_FORCE_X: &str = "force.x";
pub const HW_IF_FORCE_Y: &str = "force.y";
pub const HW_IF_FORCE_Z: &str = "force.z";
pub const HW_IF_TORQUE_X: &str = "torque.x";
pub const HW_IF_TORQUE_Y: &str = "torque.y";
pub const HW_IF_TORQUE_Z: &str = "torque.z";

#[derive(Error, Debug, PartialEq)]
#[error("missing interface {0}")]
pub struct MissingInterface(pub String);

pub fn interface_name(prefix: &str, interface: &str) -> String {
    format!("{}/{}", prefix, interface)
}

/// `<robot_name>_A1` through `<robot_name>_A7`
pub fn joint_names(robot_name: &str) -> Vec<String> {
    (1..=N_JNTS)
        .map(|joint| format!("{}_A{}", robot_name, joint))
        .collect()
}

/// Names a controller claims from the robot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceConfiguration {
    pub names: Vec<String>,
}

/// Snapshot of values keyed by full interface name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceValues {
    values: BTreeMap<String, f64>,
}

/// Values read from the robot
pub type StateInterfaces = InterfaceValues;
/// Values written to the robot
pub type CommandInterfaces = InterfaceValues;

impl InterfaceValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<f64, MissingInterface> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| MissingInterface(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values whose interface part (after the last `/`) matches
    pub fn count_interface(&self, interface: &str) -> usize {
        self.names()
            .filter(|name| name.rsplit('/').next() == Some(interface))
            .count()
    }
}

/// Six axis force-torque sensor spread over individual interfaces
#[derive(Debug, Clone, PartialEq)]
pub struct ForceTorqueSensor {
    names: [String; 6],
}

impl ForceTorqueSensor {
    pub fn new(prefix: &str) -> Self {
        ForceTorqueSensor {
            names: [
                HW_IF_FORCE_X,
                HW_IF_FORCE_Y,
                HW_IF_FORCE_Z,
                HW_IF_TORQUE_X,
                HW_IF_TORQUE_Y,
                HW_IF_TORQUE_Z,
            ]
            .map(|interface| interface_name(prefix, interface)),
        }
    }

    /// The estimated external wrench reported by the robot
    pub fn estimated() -> Self {
        ForceTorqueSensor::new(HW_IF_ESTIMATED_FT_PREFIX)
    }

    pub fn state_interface_names(&self) -> &[String] {
        &self.names
    }

    pub fn assign(&self, state: &StateInterfaces) -> Result<(), MissingInterface> {
        for name in &self.names {
            state.get(name)?;
        }
        Ok(())
    }

    /// Forces followed by torques
    pub fn read(&self, state: &StateInterfaces) -> Result<CartesianVector, MissingInterface> {
        let mut wrench = CartesianVector::zeros();
        for (value, name) in wrench.iter_mut().zip(self.names.iter()) {
            *value = state.get(name)?;
        }
        Ok(wrench)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn joint_names_follow_robot_name() {
        let names = joint_names("lbr");
        assert_eq!(names.len(), N_JNTS);
        assert_eq!(names[0], "lbr_A1");
        assert_eq!(names[6], "lbr_A7");
    }

    #[test]
    fn force_torque_sensor_names() {
        let sensor = ForceTorqueSensor::estimated();
        assert_eq!(
            sensor.state_interface_names()[0],
            "estimated_ft_sensor/force.x"
        );
        assert_eq!(
            sensor.state_interface_names()[5],
            "estimated_ft_sensor/torque.z"
        );
    }

    #[test]
    fn reads_wrench_in_order() {
        let sensor = ForceTorqueSensor::estimated();
        let mut state = StateInterfaces::new();
        for (index, name) in sensor.state_interface_names().iter().enumerate() {
            state.set(name.clone(), index as f64);
        }
        assert_relative_eq!(
            sensor.read(&state).unwrap(),
            CartesianVector::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn missing_sensor_value_is_reported() {
        let sensor = ForceTorqueSensor::estimated();
        let state = StateInterfaces::new();
        assert_eq!(
            sensor.assign(&state),
            Err(MissingInterface(String::from("estimated_ft_sensor/force.x")))
        );
    }

    #[test]
    fn counts_interfaces_by_type() {
        let mut state = StateInterfaces::new();
        state.set("lbr_A1/position", 0.0);
        state.set("lbr_A2/position", 0.0);
        state.set(interface_name(HW_IF_AUXILIARY_PREFIX, HW_IF_SAMPLE_TIME), 0.005);
        assert_eq!(state.count_interface(HW_IF_POSITION), 2);
        assert_eq!(state.count_interface(HW_IF_SAMPLE_TIME), 1);
        assert!(state.contains("auxiliary_sensor/sample_time"));
    }
}
