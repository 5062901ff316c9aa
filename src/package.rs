use crate::error::InspectResult;
use serde::{Serialize, Serializer};
use std::fmt;

pub trait PackageIndex {
    fn list_packages(&self) -> InspectResult<Vec<PackageRecord>>;

    fn show_package(&self, name: &str) -> InspectResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub arch: Option<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: None,
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }
}

/// `name@version`, or `name@version?arch=arch` when the index records one.
impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if let Some(ref arch) = self.arch {
            write!(f, "?arch={}", arch)?;
        }
        Ok(())
    }
}

impl Serialize for PackageRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PackageRecord::new("bash", "5.2-1").to_string(), "bash@5.2-1");
        assert_eq!(
            PackageRecord::new("curl", "7.1-1").with_arch("x86_64").to_string(),
            "curl@7.1-1?arch=x86_64"
        );
    }

    #[test]
    fn test_serializes_as_string() {
        let records = vec![
            PackageRecord::new("a", "1.0"),
            PackageRecord::new("b", "2.0").with_arch("noarch"),
        ];
        let json = serde_json::to_string(&records).unwrap();
        assert_eq!(json, r#"["a@1.0","b@2.0?arch=noarch"]"#);
    }
}
