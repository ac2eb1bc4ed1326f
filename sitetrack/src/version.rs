//! Dotted plugin versions and the comparisons used to guard upgrade steps.

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

/// Errors produced while parsing versions or comparison operators
#[crate::sitetrack_error]
pub enum VersionError {
    /// The string is not a dotted numeric version
    #[error("invalid version: {version:?}")]
    InvalidVersion {
        /// The rejected version string
        version: String,
    },

    /// The string is not a known comparison operator
    #[error("invalid comparison operator: {operator:?}")]
    InvalidOperator {
        /// The rejected operator string
        operator: String,
    },
}

/// A dotted numeric version such as `1.4.3.2`.
///
/// The empty string parses to the *unversioned* value, which orders before every real
/// version. Components compare numerically left to right; when one version is a prefix of
/// the other the longer one is greater, so `1.4.3.2 > 1.4.3` and `1.4.3.0 > 1.4.3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PluginVersion(Vec<u64>);

impl PluginVersion {
    /// Parses a version string.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// - `VersionError::InvalidVersion` if a component is empty or not a decimal number
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Ok(Self::unversioned());
        }
        trimmed
            .split('.')
            .map(|component| {
                if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                component.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
            .ok_or_else(|| VersionError::InvalidVersion {
                version: version.to_string(),
            })
    }

    /// The value of a record that has never been stamped with a version
    #[must_use]
    pub const fn unversioned() -> Self {
        Self(Vec::new())
    }

    /// Whether this is the unversioned value
    #[must_use]
    pub fn is_unversioned(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluates `self <operator> target`
    #[must_use]
    pub fn satisfies(&self, operator: ComparisonOperator, target: &Self) -> bool {
        operator.holds(self.cmp(target))
    }
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| a.cmp(b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut components = self.0.iter();
        if let Some(first) = components.next() {
            write!(f, "{first}")?;
            for component in components {
                write!(f, ".{component}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for PluginVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Comparison operators accepted by [`compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ComparisonOperator {
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    GreaterThan,
}

impl ComparisonOperator {
    /// Whether the operator accepts `ordering` (of left side relative to right side)
    #[must_use]
    pub const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::LessThan => ordering.is_lt(),
            Self::LessOrEqual => ordering.is_le(),
            Self::Equal => ordering.is_eq(),
            Self::NotEqual => ordering.is_ne(),
            Self::GreaterOrEqual => ordering.is_ge(),
            Self::GreaterThan => ordering.is_gt(),
        }
    }

    /// Canonical symbol, e.g. `>=`
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterOrEqual => ">=",
            Self::GreaterThan => ">",
        }
    }
}

impl Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" | "lt" => Ok(Self::LessThan),
            "<=" | "le" => Ok(Self::LessOrEqual),
            "=" | "==" | "eq" => Ok(Self::Equal),
            "!=" | "<>" | "ne" => Ok(Self::NotEqual),
            ">=" | "ge" => Ok(Self::GreaterOrEqual),
            ">" | "gt" => Ok(Self::GreaterThan),
            other => Err(VersionError::InvalidOperator {
                operator: other.to_string(),
            }),
        }
    }
}

/// Compares two version strings: `current <operator> target`.
///
/// # Errors
/// - `VersionError::InvalidVersion` if either side does not parse
#[uniffi::export]
pub fn compare(
    current: &str,
    target: &str,
    operator: ComparisonOperator,
) -> Result<bool, VersionError> {
    let current = PluginVersion::parse(current)?;
    let target = PluginVersion::parse(target)?;
    Ok(current.satisfies(operator, &target))
}

/// A conjunction of version comparisons, evaluated in insertion order.
///
/// An empty guard never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionGuard {
    conditions: Vec<(PluginVersion, ComparisonOperator)>,
}

impl VersionGuard {
    /// Starts an empty guard
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Adds the condition `stored <operator> target`.
    ///
    /// # Errors
    /// - `VersionError::InvalidVersion` if `target` does not parse
    pub fn and(mut self, operator: ComparisonOperator, target: &str) -> Result<Self, VersionError> {
        self.conditions.push((PluginVersion::parse(target)?, operator));
        Ok(self)
    }

    /// Half-open range guard `from <= stored < to`. Without `from`, just `stored < to`.
    ///
    /// # Errors
    /// - `VersionError::InvalidVersion` if a bound does not parse
    pub fn range(from: Option<&str>, to: &str) -> Result<Self, VersionError> {
        let guard = match from {
            Some(from) => Self::new().and(ComparisonOperator::GreaterOrEqual, from)?,
            None => Self::new(),
        };
        guard.and(ComparisonOperator::LessThan, to)
    }

    /// Whether every condition holds for `current`; `false` for an empty guard
    #[must_use]
    pub fn matches(&self, current: &PluginVersion) -> bool {
        !self.conditions.is_empty()
            && self
                .conditions
                .iter()
                .all(|(target, operator)| current.satisfies(*operator, target))
    }
}

impl Display for VersionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .conditions
            .iter()
            .map(|(target, operator)| format!("{operator} {target}"))
            .collect();
        write!(f, "{}", rendered.join(" && "))
    }
}

/// Checks `current` against every `(target, operator)` pair, in order.
///
/// Returns `false` for an empty list.
///
/// # Errors
/// - `VersionError::InvalidVersion` if `current` or a target does not parse
/// - `VersionError::InvalidOperator` if an operator is not recognized
pub fn compare_all(current: &str, conditions: &[(&str, &str)]) -> Result<bool, VersionError> {
    let current = PluginVersion::parse(current)?;
    let guard = conditions
        .iter()
        .try_fold(VersionGuard::new(), |guard, (target, operator)| {
            guard.and(operator.parse()?, target)
        })?;
    Ok(guard.matches(&current))
}
