use std::fmt;
use std::str::FromStr;

/// Interpreter version used to pick the standard-library name set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    pub const DEFAULT: PythonVersion = PythonVersion::new(3, 12);

    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub fn at_least(self, major: u8, minor: u8) -> bool {
        self >= Self::new(major, minor)
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = anyhow::Error;

    /// Accepts `3.12`, `3.12.4` and `3.13.0rc1`; anything past the minor
    /// component is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|part| part.parse::<u8>().ok())
            .ok_or_else(|| anyhow::anyhow!("invalid python version `{s}`"))?;
        let minor = parts
            .next()
            .map(|part| {
                part.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
            })
            .and_then(|digits| digits.parse::<u8>().ok())
            .ok_or_else(|| anyhow::anyhow!("invalid python version `{s}`"))?;
        Ok(Self::new(major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_strings() {
        assert_eq!("3.11".parse::<PythonVersion>().unwrap(), PythonVersion::new(3, 11));
        assert_eq!("3.12.4".parse::<PythonVersion>().unwrap(), PythonVersion::new(3, 12));
        assert_eq!("3.13rc1".parse::<PythonVersion>().unwrap(), PythonVersion::new(3, 13));
        assert!("three".parse::<PythonVersion>().is_err());
    }

    #[test]
    fn orders_by_minor() {
        assert!(PythonVersion::new(3, 12).at_least(3, 9));
        assert!(!PythonVersion::new(3, 8).at_least(3, 9));
    }
}
