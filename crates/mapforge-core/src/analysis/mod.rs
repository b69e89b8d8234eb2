// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Static analysis over discovered callables and specification bodies.
//!
//! - [`call_graph`] and [`cycles`] run once per batch, before any
//!   specification is transformed.
//! - [`classify`] runs per specification, on the rewritten body.

pub mod call_graph;
pub mod classify;
pub mod cycles;

pub use call_graph::CallGraph;
pub use classify::{PathTypeInfo, PathTypes, PropertyPath, TypeCategory, classify};
pub use cycles::{CycleReport, Unsafety};
