//! The selection state machine behind the interactive wizard.
//!
//! [`navigator::next`] maps a [`state::SelectionState`] to the screen to show,
//! [`loader::ScreenLoader`] fetches that screen's items, and
//! [`dispatcher::execute`] turns a completed selection into IAM calls.

pub mod differ;
pub mod dispatcher;
pub mod loader;
pub mod navigator;
pub mod operation;
pub mod seed;
pub mod state;
