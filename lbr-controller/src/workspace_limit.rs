use crate::controller_config::WorkspaceLimitParameters;
use nalgebra as na;
use parry3d_f64::{query::PointQuery, shape};

/// Region the tip is allowed to be commanded into
pub struct WorkspaceLimit {
    workspace_sphere: shape::Ball,
    center: na::Isometry3<f64>,
}

impl WorkspaceLimit {
    pub fn new(parameters: &WorkspaceLimitParameters) -> Self {
        Self {
            workspace_sphere: shape::Ball::new(parameters.radius),
            center: na::Isometry3::translation(
                parameters.center.x,
                parameters.center.y,
                parameters.center.z,
            ),
        }
    }

    pub fn contains(&self, point: &na::Point3<f64>) -> bool {
        self.workspace_sphere.contains_point(&self.center, point)
    }
}
