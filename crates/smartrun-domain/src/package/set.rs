use indexmap::IndexMap;
use serde::Serialize;

use super::name::PackageName;

/// Where a requirement entry came from. Later variants outrank earlier ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementOrigin {
    Import,
    Block,
    Inline,
}

impl RequirementOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementOrigin::Import => "import",
            RequirementOrigin::Block => "block",
            RequirementOrigin::Inline => "inline",
        }
    }

    #[must_use]
    pub fn is_directive(self) -> bool {
        !matches!(self, RequirementOrigin::Import)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Requirement {
    pub package: PackageName,
    pub origin: RequirementOrigin,
}

/// Insertion-ordered requirements keyed by normalized distribution name.
///
/// The first entry for a name is kept unless a later one has a higher-ranked
/// origin, in which case it replaces the existing entry in place.
#[derive(Clone, Debug, Default)]
pub struct RequirementSet {
    entries: IndexMap<String, Requirement>,
}

impl RequirementSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the entry was added or replaced an existing one.
    pub fn insert(&mut self, package: PackageName, origin: RequirementOrigin) -> bool {
        let key = package.key().to_string();
        match self.entries.get_mut(&key) {
            Some(existing) if origin > existing.origin => {
                existing.package = package;
                existing.origin = origin;
                true
            }
            Some(_) => false,
            None => {
                self.entries.insert(key, Requirement { package, origin });
                true
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Requirement) -> bool) {
        self.entries.retain(|_, requirement| keep(requirement));
    }

    #[must_use]
    pub fn get(&self, distribution_name: &str) -> Option<&PackageName> {
        let key = super::normalize_distribution_name(distribution_name);
        self.entries.get(&key).map(|requirement| &requirement.package)
    }

    #[must_use]
    pub fn contains(&self, distribution_name: &str) -> bool {
        self.get(distribution_name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.values()
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageName> {
        self.entries.values().map(|requirement| &requirement.package)
    }

    /// Requirement lines in the form an installer accepts.
    #[must_use]
    pub fn to_specs(&self) -> Vec<String> {
        self.packages().map(ToString::to_string).collect()
    }
}

impl Serialize for RequirementSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a Requirement;
    type IntoIter = indexmap::map::Values<'a, String, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
