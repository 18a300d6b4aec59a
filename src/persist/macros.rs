//! Macro definitions for tracked models.
//!
//! `tracked_model!` generates a record struct together with its `Model`
//! implementation and static descriptor.

#[path = "macros/attr_helpers.rs"]
mod attr_helpers;
#[path = "macros/tracked_model.rs"]
mod tracked_model;
