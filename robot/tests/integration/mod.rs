//! Integration tests for the robot description pipeline.
//!
//! These tests run text through every stage:
//! - SDF text → Document → validation
//! - Document → frame graph → canonical tree → URDF → URDF text
//! - URDF text → Document (import) and back
//! - Resolver and lumping invariants under random inputs

pub mod pipeline;
pub mod properties;
pub mod round_trip;
pub mod topology;
