// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Convention application.
//!
//! A [`Resolution`] only states _what_ should happen to each build unit.
//! Actually applying conventions is a side effect owned by the host build
//! tool, so it goes through the [`ConventionApplier`] trait. The
//! [`apply_resolution`] routine walks a resolution, feeds every convention to
//! the applier in order, and collects the outcome into an [`ApplyReport`].
//!
//! # Failure Handling
//!
//! A failure to apply a convention only affects the unit it happened on. The
//! remaining conventions of that unit are not applied, because later
//! conventions may build on top of earlier ones. Every other unit is still
//! processed. All failures are recorded with the unit, the convention, and
//! the cause.

use crate::{
    config::CatalogEntry,
    policy::{join_conventions, ConventionId, Decision, Resolution, UnitPath},
};

use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

/// Layer of indirection for applying conventions to units.
pub trait ConventionApplier {
    /// Apply one convention to one unit.
    fn apply(&mut self, unit: &UnitPath, convention: &ConventionId) -> Result<Applied>;
}

/// Successful outcome of applying one convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Convention is now applied to the unit.
    Done,

    /// Convention was already applied to the unit, nothing changed.
    AlreadyApplied,
}

/// Apply every decision of a resolution through target applier.
///
/// Units are visited in the order of the resolution.
#[instrument(skip(resolution, applier), level = "debug")]
pub fn apply_resolution(
    resolution: &Resolution,
    applier: &mut impl ConventionApplier,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (unit, decision) in resolution {
        let conventions = match decision {
            Decision::Skip => {
                info!("skipping conventions for {unit} (not eligible)");
                report.skipped.push(unit.clone());
                continue;
            }
            Decision::Unconfigured => {
                warn!("no conventions configured for {unit}");
                report.unconfigured.push(unit.clone());
                continue;
            }
            Decision::Apply(conventions) => conventions,
        };

        info!("applying conventions to {unit}: {}", join_conventions(conventions));
        let mut applied = Vec::new();
        for convention in conventions {
            match applier.apply(unit, convention) {
                Ok(Applied::Done) => applied.push(convention.clone()),
                Ok(Applied::AlreadyApplied) => {
                    debug!("convention '{convention}' listed more than once for {unit}");
                }
                Err(source) => {
                    error!("failed to apply convention '{convention}' to {unit}: {source}");
                    report.failures.push(ApplyFailure {
                        unit: unit.clone(),
                        convention: convention.clone(),
                        source,
                    });
                    break;
                }
            }
        }
        report.applied.insert(unit.clone(), applied);
    }

    report
}

/// Outcome of applying a resolution.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Conventions newly applied to each unit, in order.
    ///
    /// Conventions the applier reported as already applied are left out.
    /// Holds a prefix of the requested conventions for units that failed.
    pub applied: BTreeMap<UnitPath, Vec<ConventionId>>,

    /// Units that were not eligible.
    pub skipped: Vec<UnitPath>,

    /// Eligible units without any conventions.
    pub unconfigured: Vec<UnitPath>,

    /// Failures, at most one per unit.
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// Check if every requested convention was applied.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Failure to apply convention to unit.
#[derive(Debug, thiserror::Error)]
#[error("failed to apply convention '{convention}' to {unit}")]
pub struct ApplyFailure {
    pub unit: UnitPath,
    pub convention: ConventionId,
    #[source]
    pub source: ApplyError,
}

/// Catalog of known conventions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<ConventionId, CatalogEntry>,
}

impl Catalog {
    /// Register convention.
    ///
    /// Returns false if a convention with the same name is already known, in
    /// which case the catalog is left untouched.
    pub fn insert(&mut self, entry: CatalogEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }

        self.entries.insert(entry.name.clone(), entry);
        true
    }

    /// Look up known convention.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&CatalogEntry> {
        self.entries.get(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

/// Convention applier backed by a [`Catalog`].
///
/// Checks every convention against the catalog, and records a plan of what
/// was applied to each unit. A convention is only applied once all of its
/// prerequisites have already been applied to the same unit. Applying the same
/// convention twice to the same unit does nothing.
#[derive(Debug)]
pub struct CatalogApplier<'catalog> {
    catalog: &'catalog Catalog,
    plan: BTreeMap<UnitPath, Vec<ConventionId>>,
}

impl<'catalog> CatalogApplier<'catalog> {
    /// Construct new catalog applier.
    pub fn new(catalog: &'catalog Catalog) -> Self {
        Self {
            catalog,
            plan: BTreeMap::new(),
        }
    }

    /// Conventions applied so far to each unit.
    pub fn plan(&self) -> &BTreeMap<UnitPath, Vec<ConventionId>> {
        &self.plan
    }

    /// Take recorded plan.
    pub fn into_plan(self) -> BTreeMap<UnitPath, Vec<ConventionId>> {
        self.plan
    }
}

impl ConventionApplier for CatalogApplier<'_> {
    fn apply(&mut self, unit: &UnitPath, convention: &ConventionId) -> Result<Applied> {
        let entry = self
            .catalog
            .get(convention)
            .ok_or_else(|| ApplyError::UnknownConvention(convention.clone()))?;

        let applied = self.plan.entry(unit.clone()).or_default();
        if applied.contains(convention) {
            debug!("convention '{convention}' already applied to {unit}");
            return Ok(Applied::AlreadyApplied);
        }

        // INVARIANT: Prerequisites must come earlier in application order.
        if let Some(missing) = entry.requires.iter().find(|req| !applied.contains(req)) {
            return Err(ApplyError::MissingPrerequisite {
                convention: convention.clone(),
                requires: missing.clone(),
            });
        }

        debug!("apply convention '{convention}' to {unit}");
        applied.push(convention.clone());

        Ok(Applied::Done)
    }
}

/// Convention application error types.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Convention is not known by the host.
    #[error("convention '{0}' not found")]
    UnknownConvention(ConventionId),

    /// Convention needs another convention applied before it.
    #[error("convention '{convention}' requires '{requires}' to be applied first")]
    MissingPrerequisite {
        convention: ConventionId,
        requires: ConventionId,
    },

    /// Host specific failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ApplyError> = std::result::Result<T, E>;
