//! Geometry utilities: SO(3) perturbations, SE3 transforms, the landmark frame chain.

pub mod frames;
pub mod se3;
pub mod so3;

pub use se3::SE3;
pub use so3::{exp_so3, perturb_rotation, perturb_rotation_exact, skew};
