// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the policy file to simplify the process of
//! serialization and deserialization. Locating and reading the policy file is
//! handled by [`path`](crate::path).
//!
//! # General Layout
//!
//! ```toml
//! [conventions]
//! default = ["kotlin-convention", "test-convention"]
//! exclude = [":legacy-module"]
//!
//! [[override]]
//! unit = ":user-service"
//! conventions = ["kotlin-convention", "spring-convention"]
//!
//! [[catalog]]
//! name = "spring-convention"
//! requires = ["kotlin-convention"]
//!
//! [workspace]
//! units = [":core", ":legacy-module", ":user-service"]
//! ```
//!
//! Only the `[conventions]` table is required.

use crate::{
    apply::Catalog,
    policy::{ConventionId, Policy, UnitPath},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Policy file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PolicyDefinition {
    /// Default conventions and unit filters.
    pub conventions: ConventionSettings,

    /// Per-unit convention overrides.
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Vec<ConventionOverride>>,

    /// Known conventions that can be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<CatalogEntry>>,

    /// Build units known to the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceSettings>,
}

impl PolicyDefinition {
    /// Build immutable policy out of policy definition.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::DuplicateOverride`] if the same unit is
    ///   overridden more than once.
    pub fn to_policy(&self) -> Result<Policy> {
        let mut builder = Policy::builder()
            .apply_to_all(self.conventions.default.iter().cloned())
            .include(self.conventions.include.iter().cloned())
            .exclude(self.conventions.exclude.iter().cloned());

        let mut seen = BTreeSet::new();
        for entry in self.overrides.iter().flatten() {
            if !seen.insert(&entry.unit) {
                return Err(ConfigError::DuplicateOverride(entry.unit.clone()));
            }
            builder = builder.for_unit(entry.unit.clone(), entry.conventions.iter().cloned());
        }

        Ok(builder.build())
    }

    /// Build catalog of known conventions.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::DuplicateConvention`] if the same convention
    ///   is listed more than once.
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        for entry in self.catalog.iter().flatten() {
            if !catalog.insert(entry.clone()) {
                return Err(ConfigError::DuplicateConvention(entry.name.clone()));
            }
        }

        Ok(catalog)
    }

    /// Build catalog of known conventions for applying them.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::DuplicateConvention`] if the same convention
    ///   is listed more than once.
    /// - Return [`ConfigError::EmptyCatalog`] if no conventions are listed.
    pub fn applicable_catalog(&self) -> Result<Catalog> {
        let catalog = self.catalog()?;
        if catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        Ok(catalog)
    }

    /// Select units to resolve.
    ///
    /// Uses given units if there are any, otherwise falls back to the units of
    /// the workspace table.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoUnits`] if both are empty.
    pub fn select_units(
        &self,
        units: impl IntoIterator<Item = impl Into<UnitPath>>,
    ) -> Result<Vec<UnitPath>> {
        let mut units = units.into_iter().map(Into::into).collect::<Vec<_>>();
        if units.is_empty() {
            units = self.units().to_vec();
        }

        if units.is_empty() {
            return Err(ConfigError::NoUnits);
        }

        Ok(units)
    }

    /// Build units listed by workspace table.
    pub fn units(&self) -> &[UnitPath] {
        self.workspace
            .as_ref()
            .map(|workspace| workspace.units.as_slice())
            .unwrap_or_default()
    }
}

impl FromStr for PolicyDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for PolicyDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Default conventions and unit filters.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConventionSettings {
    /// Conventions to apply to every eligible unit without an override.
    #[serde(default)]
    pub default: Vec<ConventionId>,

    /// Only apply conventions to these units.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<UnitPath>,

    /// Never apply conventions to these units. Ignored when `include` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<UnitPath>,
}

/// Convention override for one unit.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConventionOverride {
    /// Unit to override.
    pub unit: UnitPath,

    /// Conventions to use instead of the default ones.
    #[serde(default)]
    pub conventions: Vec<ConventionId>,
}

/// Known convention.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CatalogEntry {
    /// Name of the convention.
    pub name: ConventionId,

    /// Brief description of what the convention configures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Conventions that must already be applied to the unit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<ConventionId>,
}

/// Workspace settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct WorkspaceSettings {
    /// Build units known to the workspace.
    #[serde(default)]
    pub units: Vec<UnitPath>,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Unit was overridden more than once.
    #[error("unit '{0}' is overridden more than once")]
    DuplicateOverride(UnitPath),

    /// Convention was listed in catalog more than once.
    #[error("convention '{0}' is listed in catalog more than once")]
    DuplicateConvention(ConventionId),

    /// Catalog lists no conventions to apply.
    #[error("policy file has no [[catalog]] entries to apply")]
    EmptyCatalog,

    /// No units given, and workspace table lists none either.
    #[error("no units given, and policy file has no [workspace] units")]
    NoUnits,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
