mod mappings;
mod name;
mod set;

pub use mappings::{distribution_for, known_mapping, KNOWN_MAPPINGS};
pub use name::{
    normalize_distribution_name, PackageName, SpecError, VersionOperator, VersionPredicate,
};
pub use set::{Requirement, RequirementOrigin, RequirementSet};
