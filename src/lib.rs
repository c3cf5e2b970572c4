//! Targe: an interactive wizard for granting and revoking AWS IAM permissions.
//!
//! The wizard walks a principal (user, group or role) through picking an
//! operation, optionally narrowing it to a service and resource, choosing or
//! generating a policy, and confirming. The selection state machine lives in
//! [`wizard`]; AWS access sits behind [`iam::IamProvider`] and policy
//! generation behind [`synth::PolicySynthesizer`].

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod iam;
pub mod logging;
pub mod synth;
pub mod terraform;
pub mod ui;
pub mod wizard;
