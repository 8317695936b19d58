//! EFK Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the EFK stack controller.

pub mod component;
pub mod efk_stack;
pub mod status;

pub use component::*;
pub use efk_stack::*;
pub use status::*;
