use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Serialize, Serializer};

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("empty requirement spec")]
    Empty,
    #[error("invalid distribution name `{0}`")]
    InvalidName(String),
    #[error("invalid version in `{spec}`")]
    InvalidVersion { spec: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VersionOperator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Compatible,
    Less,
    Greater,
}

impl VersionOperator {
    /// Two-character operators come first so `<=` is never read as `<`.
    const SCAN_ORDER: [VersionOperator; 7] = [
        VersionOperator::Equal,
        VersionOperator::NotEqual,
        VersionOperator::LessEqual,
        VersionOperator::GreaterEqual,
        VersionOperator::Compatible,
        VersionOperator::Less,
        VersionOperator::Greater,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VersionOperator::Equal => "==",
            VersionOperator::NotEqual => "!=",
            VersionOperator::LessEqual => "<=",
            VersionOperator::GreaterEqual => ">=",
            VersionOperator::Compatible => "~=",
            VersionOperator::Less => "<",
            VersionOperator::Greater => ">",
        }
    }

    fn match_at(text: &str) -> Option<Self> {
        Self::SCAN_ORDER
            .into_iter()
            .find(|op| text.starts_with(op.as_str()))
    }
}

impl fmt::Display for VersionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionPredicate {
    pub operator: VersionOperator,
    pub version: String,
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A requirement as smartrun sees it: the module a script imports, the
/// distribution that provides it, and an optional version predicate.
///
/// Identity is the normalized distribution name. `pandas` and `pandas==2.0`
/// compare equal; each keeps its own predicate for display and install.
#[derive(Clone, Debug)]
pub struct PackageName {
    importable_name: String,
    distribution_name: String,
    extras: Vec<String>,
    predicates: Vec<VersionPredicate>,
    marker: Option<String>,
    key: String,
}

impl PackageName {
    /// Parses a free-form spec such as `pandas<=2.3.0`, `requests[socks]` or
    /// `numpy>=1.20,<2.0; python_version >= "3.9"`.
    ///
    /// Anything after `;` is kept verbatim as an environment marker. The rest
    /// is split at the first operator found scanning left to right; the tail is
    /// a comma-separated list of clauses, each with its own operator.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SpecError::Empty);
        }
        let (requirement, marker) = match spec.split_once(';') {
            Some((requirement, marker)) => {
                let marker = marker.trim();
                (requirement.trim(), (!marker.is_empty()).then(|| marker.to_string()))
            }
            None => (spec, None),
        };

        let split = requirement
            .char_indices()
            .find_map(|(idx, _)| VersionOperator::match_at(&requirement[idx..]).map(|_| idx));

        let (name_part, predicates) = match split {
            Some(idx) => (
                requirement[..idx].trim(),
                parse_constraint(&requirement[idx..]).ok_or_else(|| SpecError::InvalidVersion {
                    spec: spec.to_string(),
                })?,
            ),
            None => (requirement, Vec::new()),
        };

        let (name, extras) = split_extras(name_part)?;
        if !is_valid_distribution_name(name) {
            return Err(SpecError::InvalidName(name_part.to_string()));
        }

        Ok(Self {
            importable_name: name.to_string(),
            distribution_name: name.to_string(),
            key: normalize_distribution_name(name),
            extras,
            predicates,
            marker,
        })
    }

    /// Builds an entry for an import whose distribution was resolved without a
    /// predicate.
    #[must_use]
    pub fn from_import(importable_name: &str, distribution_name: &str) -> Self {
        Self {
            importable_name: importable_name.to_string(),
            distribution_name: distribution_name.to_string(),
            key: normalize_distribution_name(distribution_name),
            extras: Vec::new(),
            predicates: Vec::new(),
            marker: None,
        }
    }

    #[must_use]
    pub fn with_distribution_name(mut self, distribution_name: &str) -> Self {
        self.distribution_name = distribution_name.to_string();
        self.key = normalize_distribution_name(distribution_name);
        self
    }

    #[must_use]
    pub fn with_importable_name(mut self, importable_name: &str) -> Self {
        self.importable_name = importable_name.to_string();
        self
    }

    pub fn importable_name(&self) -> &str {
        &self.importable_name
    }

    pub fn distribution_name(&self) -> &str {
        &self.distribution_name
    }

    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// First clause of the version constraint.
    pub fn version_predicate(&self) -> Option<&VersionPredicate> {
        self.predicates.first()
    }

    pub fn version_predicates(&self) -> &[VersionPredicate] {
        &self.predicates
    }

    /// Environment marker, without the leading `;`.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Normalized distribution name used for identity.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `name` refers to this package by distribution or import name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.distribution_name.eq_ignore_ascii_case(name)
            || self.importable_name.eq_ignore_ascii_case(name)
            || self.key == normalize_distribution_name(name)
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.distribution_name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        for (idx, predicate) in self.predicates.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{predicate}")?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

impl FromStr for PackageName {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lowercases and folds runs of `-`, `_` and `.` into a single `-`.
#[must_use]
pub fn normalize_distribution_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.push(ch.to_ascii_lowercase());
    }
    out
}

fn split_extras(name_part: &str) -> Result<(&str, Vec<String>), SpecError> {
    let Some(open) = name_part.find('[') else {
        return Ok((name_part, Vec::new()));
    };
    let Some(inner) = name_part[open + 1..].strip_suffix(']') else {
        return Err(SpecError::InvalidName(name_part.to_string()));
    };
    let extras = inner
        .split(',')
        .map(str::trim)
        .filter(|extra| !extra.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    Ok((name_part[..open].trim(), extras))
}

fn is_valid_distribution_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

/// Splits `>=1.20, <2.0` into one predicate per clause. `None` when any clause lacks
/// an operator or a well-formed version.
fn parse_constraint(constraint: &str) -> Option<Vec<VersionPredicate>> {
    constraint
        .split(',')
        .map(|clause| {
            let clause = clause.trim();
            let operator = VersionOperator::match_at(clause)?;
            let version = clause[operator.as_str().len()..].trim();
            is_valid_version(version).then(|| VersionPredicate {
                operator,
                version: version.to_string(),
            })
        })
        .collect()
}

fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '*' | '+' | '!' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parses_bare_name_without_predicate() {
        let pkg = PackageName::parse("numpy").expect("parse");
        assert_eq!(pkg.distribution_name(), "numpy");
        assert!(pkg.version_predicate().is_none());
    }

    #[test]
    fn splits_at_first_operator() {
        let pkg = PackageName::parse("pandas<=2.3.0").expect("parse");
        assert_eq!(pkg.distribution_name(), "pandas");
        let predicate = pkg.version_predicate().expect("predicate");
        assert_eq!(predicate.operator, VersionOperator::LessEqual);
        assert_eq!(predicate.version, "2.3.0");

        let pkg = PackageName::parse("scipy > 1.6").expect("parse");
        assert_eq!(pkg.distribution_name(), "scipy");
        assert_eq!(pkg.version_predicate().unwrap().to_string(), ">1.6");
    }

    #[test]
    fn display_round_trips_for_every_operator() {
        for op in ["==", "!=", "<=", ">=", "<", ">", "~="] {
            let spec = format!("Some_Pkg{op}1.4.2");
            let first = PackageName::parse(&spec).expect("parse");
            let second = PackageName::parse(&first.to_string()).expect("reparse");
            assert_eq!(first, second, "round trip for {spec}");
            assert_eq!(first.version_predicate(), second.version_predicate());
            assert_eq!(first.to_string(), spec);
        }
    }

    #[test]
    fn extras_survive_formatting() {
        let pkg = PackageName::parse("requests[socks, security]>=2.25").expect("parse");
        assert_eq!(pkg.extras(), ["socks", "security"]);
        assert_eq!(pkg.to_string(), "requests[socks,security]>=2.25");
    }

    #[test]
    fn equality_ignores_predicate_and_case() {
        let plain = PackageName::parse("pandas").unwrap();
        let pinned = PackageName::parse("Pandas==2.0").unwrap();
        assert_eq!(plain, pinned);

        let set: HashSet<_> = [plain, pinned].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn normalization_folds_separators() {
        assert_eq!(normalize_distribution_name("Scikit_Learn"), "scikit-learn");
        assert_eq!(normalize_distribution_name("zope..interface"), "zope-interface");
        assert_eq!(
            PackageName::parse("ruamel.yaml").unwrap(),
            PackageName::parse("ruamel-yaml").unwrap()
        );
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(PackageName::parse("   "), Err(SpecError::Empty));
        assert!(matches!(
            PackageName::parse("numpy=="),
            Err(SpecError::InvalidVersion { .. })
        ));
        assert!(matches!(
            PackageName::parse("-bad"),
            Err(SpecError::InvalidName(_))
        ));
        assert!(matches!(
            PackageName::parse("pkg==1.0 extra"),
            Err(SpecError::InvalidVersion { .. })
        ));
        assert!(matches!(
            PackageName::parse("numpy>=1.20,2.0"),
            Err(SpecError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn keeps_every_constraint_clause() {
        let pkg = PackageName::parse("numpy >= 1.20, <2.0").expect("parse");
        let clauses: Vec<String> = pkg
            .version_predicates()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(clauses, [">=1.20", "<2.0"]);
        assert_eq!(pkg.to_string(), "numpy>=1.20,<2.0");
        assert_eq!(
            PackageName::parse(&pkg.to_string()).unwrap().version_predicates(),
            pkg.version_predicates()
        );
    }

    #[test]
    fn environment_markers_are_carried_through() {
        let pkg = PackageName::parse("pandas==2.0; python_version >= '3.9'").expect("parse");
        assert_eq!(pkg.distribution_name(), "pandas");
        assert_eq!(pkg.marker(), Some("python_version >= '3.9'"));
        assert_eq!(pkg.version_predicate().unwrap().to_string(), "==2.0");
        assert_eq!(pkg.to_string(), "pandas==2.0; python_version >= '3.9'");

        let bare = PackageName::parse("colorama; sys_platform == 'win32'").expect("parse");
        assert!(bare.version_predicate().is_none());
        assert_eq!(bare.to_string(), "colorama; sys_platform == 'win32'");
    }
}
