use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error while accessing configuration")]
    IoError(#[from] std::io::Error),
    #[error("error while parsing json")]
    JsonError(#[from] serde_json::Error),
    #[error("error while parsing yaml")]
    YamlError(#[from] serde_yaml::Error),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdmittanceParameters {
    /// virtual mass
    pub mass: f64,
    pub damping: f64,
    pub stiffness: f64,
}

impl Default for AdmittanceParameters {
    fn default() -> Self {
        AdmittanceParameters {
            mass: 1.0,
            damping: 0.1,
            stiffness: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InvJacCtrlParameters {
    pub chain_root: String,
    pub chain_tip: String,
    /// Force-torque is estimated in the tip frame, so twists are too
    #[serde(default = "default_twist_in_tip_frame")]
    pub twist_in_tip_frame: bool,
    /// damping of the least squares pseudo inverse
    pub damping: f64,
    /// m/s
    pub max_linear_velocity: f64,
    /// rad/s
    pub max_angular_velocity: f64,
}

fn default_twist_in_tip_frame() -> bool {
    true
}

impl Default for InvJacCtrlParameters {
    fn default() -> Self {
        InvJacCtrlParameters {
            chain_root: String::from("lbr_link_0"),
            chain_tip: String::from("lbr_link_ee"),
            twist_in_tip_frame: true,
            damping: 0.2,
            max_linear_velocity: 0.1,
            max_angular_velocity: 0.1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkspaceLimitParameters {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl Default for WorkspaceLimitParameters {
    fn default() -> Self {
        WorkspaceLimitParameters {
            center: Vector3::new(0.0, 0.0, 0.34),
            radius: 0.95,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub robot_name: String,
    pub admittance: AdmittanceParameters,
    pub inv_jac_ctrl: InvJacCtrlParameters,
    #[serde(default)]
    pub workspace: WorkspaceLimitParameters,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            robot_name: String::from("lbr"),
            admittance: AdmittanceParameters::default(),
            inv_jac_ctrl: InvJacCtrlParameters::default(),
            workspace: WorkspaceLimitParameters::default(),
        }
    }
}

impl ControllerConfig {
    /// The controller comes with an included config file.
    ///
    /// This file is packaged with the binary
    /// This method retrieves this included version
    pub fn included() -> Result<ControllerConfig> {
        ControllerConfig::parse_yaml(include_str!("../config/admittance_controller.yaml"))
    }

    pub fn parse_json(text: &str) -> Result<ControllerConfig> {
        let config: ControllerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_yaml(text: &str) -> Result<ControllerConfig> {
        let config: ControllerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn serialize_to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<ControllerConfig> {
        let text = fs::read_to_string(path)?;
        ControllerConfig::parse_json(&text)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> Result<ControllerConfig> {
        let text = fs::read_to_string(path)?;
        ControllerConfig::parse_yaml(&text)
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.serialize_to_yaml()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.robot_name.is_empty() {
            return Err(invalid("robot_name", "must not be empty"));
        }
        positive("admittance.mass", self.admittance.mass)?;
        non_negative("admittance.damping", self.admittance.damping)?;
        non_negative("admittance.stiffness", self.admittance.stiffness)?;
        if self.inv_jac_ctrl.chain_root.is_empty() {
            return Err(invalid("inv_jac_ctrl.chain_root", "must not be empty"));
        }
        if self.inv_jac_ctrl.chain_tip.is_empty() {
            return Err(invalid("inv_jac_ctrl.chain_tip", "must not be empty"));
        }
        non_negative("inv_jac_ctrl.damping", self.inv_jac_ctrl.damping)?;
        positive(
            "inv_jac_ctrl.max_linear_velocity",
            self.inv_jac_ctrl.max_linear_velocity,
        )?;
        positive(
            "inv_jac_ctrl.max_angular_velocity",
            self.inv_jac_ctrl.max_angular_velocity,
        )?;
        positive("workspace.radius", self.workspace.radius)?;
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_owned(),
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("expected a positive value, got {}", value)))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            name,
            &format!("expected a non negative value, got {}", value),
        ))
    }
}
