// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Convention selection policy.
//!
//! A __convention__ is a named bundle of build configuration, e.g., shared
//! compiler flags, test setup, dependency catalogs, etc. A multi-unit build
//! usually wants most of its __build units__ to share the same conventions,
//! while a handful of units either opt out entirely or need a different set
//! of conventions altogether.
//!
//! # Selection Rules
//!
//! A [`Policy`] decides which conventions apply to a given build unit in two
//! steps:
//!
//! 1. __Eligibility__. If the include list is non-empty, then only the units
//!    listed in it are eligible, and the exclude list is ignored entirely.
//!    Otherwise every unit is eligible except the ones in the exclude list.
//! 2. __Selection__. An eligible unit with an override entry gets exactly the
//!    conventions of that entry. Every other eligible unit gets the default
//!    conventions.
//!
//! Convention order is always preserved, because later conventions may
//! refine or depend on earlier ones. An eligible unit that ends up with no
//! conventions at all is reported as [`Decision::Unconfigured`], which is
//! kept distinct from [`Decision::Skip`] so the caller can decide how loudly
//! to complain about it.
//!
//! Nothing in here performs I/O or fails. Convention identifiers are opaque
//! data, so checking that they actually exist is left to whoever applies
//! them. See [`apply`](crate::apply) for that.

use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Identifier of a convention.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConventionId(String);

impl ConventionId {
    /// Construct new convention identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Treat convention identifier as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Path of a build unit within a multi-unit build.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UnitPath(String);

impl UnitPath {
    /// Construct new unit path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Treat unit path as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

macro_rules! impl_string_newtype {
    ($name:ident) => {
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
                fmt.write_str(self.0.as_str())
            }
        }
    };
}

impl_string_newtype!(ConventionId);
impl_string_newtype!(UnitPath);

/// Immutable convention selection policy.
///
/// Construct through [`PolicyBuilder`], or load one from a policy file via
/// [`PolicyDefinition`](crate::config::PolicyDefinition).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Policy {
    default_conventions: Vec<ConventionId>,
    included_units: BTreeSet<UnitPath>,
    excluded_units: BTreeSet<UnitPath>,
    overrides: BTreeMap<UnitPath, Vec<ConventionId>>,
}

impl Policy {
    /// Start building a new policy.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Default conventions in application order.
    pub fn default_conventions(&self) -> &[ConventionId] {
        &self.default_conventions
    }

    /// Units listed for include mode.
    pub fn included_units(&self) -> &BTreeSet<UnitPath> {
        &self.included_units
    }

    /// Units listed for exclude mode.
    pub fn excluded_units(&self) -> &BTreeSet<UnitPath> {
        &self.excluded_units
    }

    /// Per-unit convention overrides.
    pub fn overrides(&self) -> &BTreeMap<UnitPath, Vec<ConventionId>> {
        &self.overrides
    }

    /// Determine active selection mode.
    pub fn mode(&self) -> Mode {
        if !self.included_units.is_empty() {
            Mode::Include
        } else if !self.excluded_units.is_empty() {
            Mode::Exclude
        } else {
            Mode::All
        }
    }

    /// Check if conventions should be applied to target unit at all.
    pub fn is_eligible(&self, unit: impl AsRef<str>) -> bool {
        let unit = unit.as_ref();

        // INVARIANT: Include mode is the sole arbiter when active.
        if !self.included_units.is_empty() {
            return self.included_units.contains(unit);
        }

        !self.excluded_units.contains(unit)
    }

    /// Select conventions for target unit.
    ///
    /// Returns the override entry of the unit verbatim, even when it is empty.
    /// Otherwise returns the default conventions. Eligibility is not checked,
    /// use [`Policy::resolve`] for that.
    pub fn conventions_for(&self, unit: impl AsRef<str>) -> &[ConventionId] {
        match self.overrides.get(unit.as_ref()) {
            Some(conventions) => conventions,
            None => &self.default_conventions,
        }
    }

    /// Decide what to do with each unit.
    ///
    /// Every distinct unit of the input shows up exactly once in the result.
    pub fn resolve(&self, units: impl IntoIterator<Item = impl Into<UnitPath>>) -> Resolution {
        units
            .into_iter()
            .map(Into::into)
            .map(|unit| {
                let decision = self.decide(&unit);
                (unit, decision)
            })
            .collect()
    }

    /// Report shape of policy for diagnostics.
    pub fn summarize(&self) -> PolicySummary {
        PolicySummary {
            default_conventions: self.default_conventions.clone(),
            mode: self.mode(),
            included_count: self.included_units.len(),
            excluded_count: self.excluded_units.len(),
            override_count: self.overrides.len(),
        }
    }

    fn decide(&self, unit: &UnitPath) -> Decision {
        if !self.is_eligible(unit) {
            return Decision::Skip;
        }

        let conventions = self.conventions_for(unit);
        if conventions.is_empty() {
            return Decision::Unconfigured;
        }

        Decision::Apply(conventions.to_vec())
    }
}

/// Builder for [`Policy`].
///
/// Accumulates selection rules, and hands out an immutable [`Policy`] once
/// finished.
#[derive(Debug, Default, Clone)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    /// Append conventions to default convention listing.
    pub fn apply_to_all(
        mut self,
        conventions: impl IntoIterator<Item = impl Into<ConventionId>>,
    ) -> Self {
        self.policy
            .default_conventions
            .extend(conventions.into_iter().map(Into::into));
        self
    }

    /// Exclude units from convention application.
    pub fn exclude(mut self, units: impl IntoIterator<Item = impl Into<UnitPath>>) -> Self {
        self.policy
            .excluded_units
            .extend(units.into_iter().map(Into::into));
        self
    }

    /// Only apply conventions to given units.
    pub fn include(mut self, units: impl IntoIterator<Item = impl Into<UnitPath>>) -> Self {
        self.policy
            .included_units
            .extend(units.into_iter().map(Into::into));
        self
    }

    /// Override conventions for a specific unit.
    ///
    /// Replaces any earlier override of the same unit.
    pub fn for_unit(
        mut self,
        unit: impl Into<UnitPath>,
        conventions: impl IntoIterator<Item = impl Into<ConventionId>>,
    ) -> Self {
        self.policy.overrides.insert(
            unit.into(),
            conventions.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Finish building policy.
    pub fn build(self) -> Policy {
        self.policy
    }
}

/// Outcome of policy for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Unit is not eligible.
    Skip,

    /// Unit is eligible, but no conventions are configured for it.
    Unconfigured,

    /// Apply these conventions in order.
    Apply(Vec<ConventionId>),
}

impl Display for Decision {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Skip => fmt.write_str("skip"),
            Self::Unconfigured => fmt.write_str("unconfigured"),
            Self::Apply(conventions) => {
                write!(fmt, "apply {}", join_conventions(conventions))
            }
        }
    }
}

/// Decision of each unit, ordered by unit path.
pub type Resolution = BTreeMap<UnitPath, Decision>;

/// Selection mode of a policy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every unit is eligible.
    #[default]
    All,

    /// Only included units are eligible.
    Include,

    /// Every unit except excluded ones is eligible.
    Exclude,
}

impl Display for Mode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::All => fmt.write_str("ALL"),
            Self::Include => fmt.write_str("INCLUDE"),
            Self::Exclude => fmt.write_str("EXCLUDE"),
        }
    }
}

/// Diagnostic overview of a policy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    pub default_conventions: Vec<ConventionId>,
    pub mode: Mode,
    pub included_count: usize,
    pub excluded_count: usize,
    pub override_count: usize,
}

impl Display for PolicySummary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let defaults = if self.default_conventions.is_empty() {
            "<none>".to_string()
        } else {
            join_conventions(&self.default_conventions)
        };

        writeln!(fmt, "default conventions: {defaults}")?;
        writeln!(fmt, "mode: {}", self.mode)?;
        writeln!(fmt, "included units: {}", self.included_count)?;
        writeln!(fmt, "excluded units: {}", self.excluded_count)?;
        writeln!(fmt, "overridden units: {}", self.override_count)
    }
}

pub(crate) fn join_conventions(conventions: &[ConventionId]) -> String {
    conventions
        .iter()
        .map(ConventionId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn ids(names: &[&str]) -> Vec<ConventionId> {
        names.iter().copied().map(ConventionId::from).collect()
    }

    #[test_case(&[], &[], "core", true; "all mode")]
    #[test_case(&["core"], &[], "core", true; "include mode listed")]
    #[test_case(&["core"], &[], "other", false; "include mode unlisted")]
    #[test_case(&["core"], &["core"], "core", true; "include mode ignores exclude")]
    #[test_case(&["core"], &["other"], "other", false; "include mode ignores exclude for unlisted")]
    #[test_case(&[], &["legacy"], "legacy", false; "exclude mode listed")]
    #[test_case(&[], &["legacy"], "core", true; "exclude mode unlisted")]
    #[test]
    fn policy_is_eligible(included: &[&str], excluded: &[&str], unit: &str, expect: bool) {
        let policy = Policy::builder()
            .include(included.iter().copied())
            .exclude(excluded.iter().copied())
            .build();
        pretty_assertions::assert_eq!(policy.is_eligible(unit), expect);
    }

    #[test]
    fn policy_conventions_for_prefers_override() {
        let policy = Policy::builder()
            .apply_to_all(["kotlin", "test"])
            .for_unit(":spring-app", ["kotlin", "spring", "test"])
            .for_unit(":bare", Vec::<String>::new())
            .build();

        assert_eq!(
            policy.conventions_for(":spring-app"),
            ids(&["kotlin", "spring", "test"])
        );
        assert_eq!(policy.conventions_for(":bare"), ids(&[]));
        assert_eq!(policy.conventions_for(":core"), ids(&["kotlin", "test"]));
    }

    #[test]
    fn policy_conventions_for_ignores_eligibility() {
        let policy = Policy::builder()
            .apply_to_all(["kotlin"])
            .exclude([":legacy"])
            .build();
        assert_eq!(policy.conventions_for(":legacy"), ids(&["kotlin"]));
    }

    #[test]
    fn policy_builder_keeps_order_and_last_override() {
        let policy = Policy::builder()
            .apply_to_all(["test", "kotlin"])
            .apply_to_all(["docs"])
            .for_unit(":svc", ["a"])
            .for_unit(":svc", ["b", "a"])
            .build();

        assert_eq!(policy.default_conventions(), ids(&["test", "kotlin", "docs"]));
        assert_eq!(policy.conventions_for(":svc"), ids(&["b", "a"]));
        assert_eq!(policy.overrides().len(), 1);
    }

    #[test]
    fn policy_resolve_exclude_mode() {
        let policy = Policy::builder()
            .apply_to_all(["K", "T"])
            .exclude(["legacy"])
            .build();

        let result = policy.resolve(["core", "legacy"]);
        let expect = Resolution::from([
            (UnitPath::from("core"), Decision::Apply(ids(&["K", "T"]))),
            (UnitPath::from("legacy"), Decision::Skip),
        ]);
        assert_eq!(result, expect);
    }

    #[test]
    fn policy_resolve_include_mode_wins_over_exclude() {
        let policy = Policy::builder()
            .apply_to_all(["K"])
            .include(["core"])
            .exclude(["core"])
            .build();

        let result = policy.resolve(["core", "other"]);
        let expect = Resolution::from([
            (UnitPath::from("core"), Decision::Apply(ids(&["K"]))),
            (UnitPath::from("other"), Decision::Skip),
        ]);
        assert_eq!(result, expect);
    }

    #[test]
    fn policy_resolve_unconfigured_is_not_skip() {
        let policy = Policy::builder().for_unit("svc", ["S", "T"]).build();

        let result = policy.resolve(["svc", "lib"]);
        let expect = Resolution::from([
            (UnitPath::from("svc"), Decision::Apply(ids(&["S", "T"]))),
            (UnitPath::from("lib"), Decision::Unconfigured),
        ]);
        assert_eq!(result, expect);
    }

    #[test]
    fn policy_resolve_empty_override_is_unconfigured() {
        let policy = Policy::builder()
            .apply_to_all(["K"])
            .for_unit("svc", Vec::<String>::new())
            .build();

        let result = policy.resolve(["svc"]);
        assert_eq!(result.get("svc"), Some(&Decision::Unconfigured));
    }

    #[test]
    fn policy_resolve_one_decision_per_unit() {
        let policy = Policy::builder()
            .apply_to_all(["K"])
            .exclude(["b"])
            .build();
        let units = ["a", "b", "c", "d"];

        let result = policy.resolve(units);
        assert_eq!(result.len(), units.len());
        for unit in units {
            assert!(result.contains_key(unit), "missing decision for {unit}");
        }

        // No hidden state between runs.
        assert_eq!(policy.resolve(units), result);
    }

    #[test]
    fn policy_resolve_from_many_threads() {
        let policy = Policy::builder()
            .apply_to_all(["K", "T"])
            .exclude(["legacy"])
            .build();
        let expect = policy.resolve(["core", "legacy"]);

        std::thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| scope.spawn(|| policy.resolve(["legacy", "core"])))
                .collect::<Vec<_>>();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expect);
            }
        });
    }

    #[test_case(&[], &[], Mode::All; "all")]
    #[test_case(&["a"], &[], Mode::Include; "include")]
    #[test_case(&["a"], &["b"], Mode::Include; "include over exclude")]
    #[test_case(&[], &["b"], Mode::Exclude; "exclude")]
    #[test]
    fn policy_mode(included: &[&str], excluded: &[&str], expect: Mode) {
        let policy = Policy::builder()
            .include(included.iter().copied())
            .exclude(excluded.iter().copied())
            .build();
        pretty_assertions::assert_eq!(policy.mode(), expect);
    }

    #[test]
    fn policy_summarize_exclude_mode() {
        let policy = Policy::builder()
            .apply_to_all(["K", "T"])
            .exclude(["legacy"])
            .build();

        let result = policy.summarize();
        let expect = PolicySummary {
            default_conventions: ids(&["K", "T"]),
            mode: Mode::Exclude,
            included_count: 0,
            excluded_count: 1,
            override_count: 0,
        };
        assert_eq!(result, expect);

        let expect = indoc! {r#"
            default conventions: K, T
            mode: EXCLUDE
            included units: 0
            excluded units: 1
            overridden units: 0
        "#};
        assert_eq!(result.to_string(), expect);
    }

    #[test]
    fn decision_display() {
        assert_eq!(Decision::Skip.to_string(), "skip");
        assert_eq!(Decision::Unconfigured.to_string(), "unconfigured");
        assert_eq!(Decision::Apply(ids(&["K", "T"])).to_string(), "apply K, T");
    }
}
