pub mod admittance;
pub mod admittance_controller;
pub mod controller_config;
pub mod interfaces;
pub mod inv_jac_ctrl;
pub mod kinematics;
pub mod robot_driver;
pub mod types;
pub mod workspace_limit;
