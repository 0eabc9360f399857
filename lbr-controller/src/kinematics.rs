use crate::types::{CartesianVector, JntArray, Jacobian, N_JNTS};
use lazy_static::lazy_static;
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KinematicsError {
    #[error("error while accessing robot description")]
    IoError(#[from] std::io::Error),
    #[error("error while parsing robot description")]
    YamlError(#[from] serde_yaml::Error),
    #[error("no joint has child link {0}")]
    UnknownLink(String),
    #[error("revolute joint {0} has no axis")]
    MissingAxis(String),
    #[error("link {0} is its own ancestor")]
    CyclicChain(String),
    #[error("joint {joint} has invalid limits: {reason}")]
    InvalidLimits { joint: String, reason: &'static str },
    #[error("chain from {root} to {tip} has {found} revolute joints, expected {expected}")]
    JointCount {
        root: String,
        tip: String,
        found: usize,
        expected: usize,
    },
}

type Result<T> = std::result::Result<T, KinematicsError>;

lazy_static! {
    static ref INCLUDED_IIWA7: RobotDescription = {
        let yaml = include_str!("../config/iiwa7.yaml");
        serde_yaml::from_str(yaml).expect("included iiwa7 description is valid")
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Origin {
    pub xyz: na::Vector3<f64>,
    pub rpy: na::Vector3<f64>,
}

impl Origin {
    fn isometry(&self) -> na::Isometry3<f64> {
        na::Isometry3::from_parts(
            na::Translation3::from(self.xyz),
            na::UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z),
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Revolute,
    Fixed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointLimits {
    /// rad
    pub lower: f64,
    /// rad
    pub upper: f64,
    /// rad/s
    pub velocity: f64,
}

impl JointLimits {
    fn validate(&self, joint: &str) -> Result<()> {
        let invalid = |reason| KinematicsError::InvalidLimits {
            joint: joint.to_owned(),
            reason,
        };
        if !(self.lower.is_finite() && self.upper.is_finite()) {
            return Err(invalid("position bounds must be finite"));
        }
        if self.lower > self.upper {
            return Err(invalid("lower bound exceeds upper bound"));
        }
        // NaN fails this too
        if !(self.velocity > 0.0) {
            return Err(invalid("velocity must be positive"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointDescription {
    pub name: String,
    pub parent: String,
    pub child: String,
    pub origin: Origin,
    pub kind: JointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<na::Vector3<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<JointLimits>,
}

/// Tree of links connected by joints, in the spirit of a URDF
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RobotDescription {
    pub name: String,
    pub joints: Vec<JointDescription>,
}

impl RobotDescription {
    /// Description of the LBR iiwa 7 R800 packaged with the binary
    pub fn included_iiwa7() -> RobotDescription {
        INCLUDED_IIWA7.clone()
    }

    pub fn parse_yaml(text: &str) -> Result<RobotDescription> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> Result<RobotDescription> {
        let text = fs::read_to_string(path)?;
        RobotDescription::parse_yaml(&text)
    }

    /// Extract the serial chain between two links
    pub fn chain(&self, root: &str, tip: &str) -> Result<KinematicChain> {
        let by_child: HashMap<&str, &JointDescription> = self
            .joints
            .iter()
            .map(|joint| (joint.child.as_str(), joint))
            .collect();

        let mut joints = vec![];
        let mut visited = HashSet::new();
        let mut link = tip;
        while link != root {
            if !visited.insert(link) {
                return Err(KinematicsError::CyclicChain(link.to_owned()));
            }
            let joint = by_child
                .get(link)
                .ok_or_else(|| KinematicsError::UnknownLink(link.to_owned()))?;
            joints.push(*joint);
            link = joint.parent.as_str();
        }
        joints.reverse();

        let segments = joints
            .into_iter()
            .map(Segment::from_description)
            .collect::<Result<Vec<_>>>()?;
        let found = segments
            .iter()
            .filter(|segment| segment.joint.is_some())
            .count();
        if found != N_JNTS {
            return Err(KinematicsError::JointCount {
                root: root.to_owned(),
                tip: tip.to_owned(),
                found,
                expected: N_JNTS,
            });
        }
        Ok(KinematicChain { segments })
    }
}

#[derive(Debug, Clone)]
struct RevoluteJoint {
    name: String,
    axis: na::Unit<na::Vector3<f64>>,
    limits: Option<JointLimits>,
}

#[derive(Debug, Clone)]
struct Segment {
    origin: na::Isometry3<f64>,
    joint: Option<RevoluteJoint>,
}

impl Segment {
    fn from_description(description: &JointDescription) -> Result<Segment> {
        let joint = match description.kind {
            JointKind::Fixed => None,
            JointKind::Revolute => {
                let axis = description
                    .axis
                    .and_then(|axis| na::Unit::try_new(axis, f64::EPSILON))
                    .ok_or_else(|| KinematicsError::MissingAxis(description.name.clone()))?;
                if let Some(limits) = &description.limits {
                    limits.validate(&description.name)?;
                }
                Some(RevoluteJoint {
                    name: description.name.clone(),
                    axis,
                    limits: description.limits.clone(),
                })
            }
        };
        Ok(Segment {
            origin: description.origin.isometry(),
            joint,
        })
    }
}

/// Serial chain with exactly [`N_JNTS`] revolute joints
#[derive(Debug, Clone)]
pub struct KinematicChain {
    segments: Vec<Segment>,
}

impl KinematicChain {
    pub fn joint_names(&self) -> Vec<String> {
        self.revolute_joints()
            .map(|joint| joint.name.clone())
            .collect()
    }

    fn revolute_joints(&self) -> impl Iterator<Item = &RevoluteJoint> {
        self.segments
            .iter()
            .filter_map(|segment| segment.joint.as_ref())
    }

    /// Pose of the tip in the root frame
    pub fn forward_kinematics(&self, q: &JntArray) -> na::Isometry3<f64> {
        self.walk(q, |_, _, _| ())
    }

    /// Geometric jacobian in the root frame with the tip as reference point
    pub fn jacobian(&self, q: &JntArray) -> Jacobian {
        let mut axes = [(na::Vector3::<f64>::zeros(), na::Vector3::<f64>::zeros()); N_JNTS];
        let tip = self.walk(q, |index, position, axis| axes[index] = (position, axis));
        let tip_position = tip.translation.vector;

        let mut jacobian = Jacobian::zeros();
        for (index, (position, axis)) in axes.iter().enumerate() {
            let linear = axis.cross(&(tip_position - position));
            jacobian
                .fixed_view_mut::<3, 1>(0, index)
                .copy_from(&linear);
            jacobian.fixed_view_mut::<3, 1>(3, index).copy_from(axis);
        }
        jacobian
    }

    /// Accumulates the chain, reporting each joint's position and axis in the root frame
    fn walk<F>(&self, q: &JntArray, mut on_joint: F) -> na::Isometry3<f64>
    where
        F: FnMut(usize, na::Vector3<f64>, na::Vector3<f64>),
    {
        let mut frame = na::Isometry3::identity();
        let mut index = 0;
        for segment in &self.segments {
            frame *= segment.origin;
            if let Some(joint) = &segment.joint {
                on_joint(
                    index,
                    frame.translation.vector,
                    frame.rotation * joint.axis.into_inner(),
                );
                frame *= na::UnitQuaternion::from_axis_angle(&joint.axis, q[index]);
                index += 1;
            }
        }
        frame
    }

    pub fn velocity_limits(&self) -> JntArray {
        JntArray::from_iterator(self.revolute_joints().map(|joint| {
            joint
                .limits
                .as_ref()
                .map_or(f64::INFINITY, |limits| limits.velocity)
        }))
    }

    pub fn clamp_to_limits(&self, q: &JntArray) -> JntArray {
        JntArray::from_iterator(self.revolute_joints().zip(q.iter()).map(|(joint, q_i)| {
            match &joint.limits {
                Some(limits) => (*q_i).clamp(limits.lower, limits.upper),
                None => *q_i,
            }
        }))
    }
}

/// Translation followed by roll, pitch and yaw
pub fn pose_vector(pose: &na::Isometry3<f64>) -> CartesianVector {
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    let translation = pose.translation.vector;
    CartesianVector::new(
        translation.x,
        translation.y,
        translation.z,
        roll,
        pitch,
        yaw,
    )
}
