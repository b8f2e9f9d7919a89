// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Convention selection for multi-unit builds.
//!
//! Decide which named configuration bundles, i.e., __conventions__, apply to
//! each build unit of a larger build. The decision itself is made by a pure,
//! immutable [`Policy`]. Applying the chosen conventions is left to a host
//! through the [`ConventionApplier`] trait.
//!
//! # See Also
//!
//! 1. [`policy`] for the selection rules.
//! 2. [`config`] for the policy file layout.
//! 3. [`apply`] for convention application.

pub mod apply;
pub mod config;
pub mod path;
pub mod policy;

pub use apply::{
    apply_resolution, Applied, ApplyReport, Catalog, CatalogApplier, ConventionApplier,
};
pub use config::PolicyDefinition;
pub use policy::{
    ConventionId, Decision, Mode, Policy, PolicyBuilder, PolicySummary, Resolution, UnitPath,
};
