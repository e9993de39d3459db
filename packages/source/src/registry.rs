//! Branch registry: which spreadsheet and which sheet hold a branch's data.
//!
//! The default table is baked into the binary from `branches.toml` via
//! [`include_str!`]. Setting [`BRANCHES_ENV_VAR`] to a TOML file path
//! replaces it at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr as _;

use dealer_feed_source_models::{BranchLocator, DataDomain};
use serde::Deserialize;

use crate::SourceError;

/// Registry TOML embedded at compile time.
const DEFAULT_BRANCHES_TOML: &str = include_str!("../branches.toml");

/// Environment variable naming a registry TOML file that overrides the
/// embedded table.
pub const BRANCHES_ENV_VAR: &str = "DEALER_FEED_BRANCHES";

#[derive(Debug, Deserialize)]
struct RegistryConfig {
    export_base: String,
    #[serde(default)]
    branches: Vec<BranchConfig>,
}

#[derive(Debug, Deserialize)]
struct BranchConfig {
    id: String,
    spreadsheet_id: String,
    #[serde(default)]
    sheets: BTreeMap<String, SheetLocator>,
}

/// Sheet gids are numeric in the spreadsheet UI but opaque to us, so both
/// `sales = 0` and `sales = "0"` are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SheetLocator {
    Text(String),
    Number(u64),
}

impl SheetLocator {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_owned(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Immutable branch → spreadsheet/sheet table, in registration order.
#[derive(Debug, Clone)]
pub struct BranchRegistry {
    export_base: String,
    branches: Vec<BranchLocator>,
}

impl BranchRegistry {
    /// Builds a registry from locators directly.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if a branch id or spreadsheet id is
    /// empty, or a branch id is registered twice.
    pub fn new(export_base: &str, branches: Vec<BranchLocator>) -> Result<Self, SourceError> {
        for (i, branch) in branches.iter().enumerate() {
            if branch.branch_id.trim().is_empty() {
                return Err(SourceError::Config {
                    message: format!("branch #{} has an empty id", i + 1),
                });
            }
            if branch.spreadsheet_id.trim().is_empty() {
                return Err(SourceError::Config {
                    message: format!("branch '{}' has an empty spreadsheet_id", branch.branch_id),
                });
            }
            if branches[..i]
                .iter()
                .any(|other| other.branch_id == branch.branch_id)
            {
                return Err(SourceError::Config {
                    message: format!("branch '{}' is registered twice", branch.branch_id),
                });
            }
        }

        Ok(Self {
            export_base: export_base.trim_end_matches('/').to_owned(),
            branches,
        })
    }

    /// Parses a registry from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Toml`] for malformed TOML and
    /// [`SourceError::Config`] for invalid branch entries or unknown data
    /// domain names.
    pub fn from_toml(toml: &str) -> Result<Self, SourceError> {
        let config: RegistryConfig = toml::from_str(toml)?;

        let mut branches = Vec::with_capacity(config.branches.len());

        for branch in config.branches {
            let mut sheets = BTreeMap::new();
            for (key, locator) in branch.sheets {
                let domain = DataDomain::from_str(&key).map_err(|_| SourceError::Config {
                    message: format!("branch '{}' maps unknown data domain '{key}'", branch.id),
                })?;
                sheets.insert(domain, locator.into_string());
            }

            branches.push(BranchLocator {
                branch_id: branch.id.trim().to_owned(),
                spreadsheet_id: branch.spreadsheet_id.trim().to_owned(),
                sheets,
            });
        }

        Self::new(&config.export_base, branches)
    }

    /// Returns the registry embedded at compile time.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the embedded TOML is invalid.
    pub fn embedded() -> Result<Self, SourceError> {
        Self::from_toml(DEFAULT_BRANCHES_TOML)
    }

    /// Reads a registry from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let toml = std::fs::read_to_string(path)?;
        Self::from_toml(&toml)
    }

    /// Loads the registry named by [`BRANCHES_ENV_VAR`], or the embedded
    /// one when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the chosen configuration cannot be read or
    /// is invalid.
    pub fn load() -> Result<Self, SourceError> {
        match std::env::var(BRANCHES_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading branch registry from {path}");
                Self::from_file(Path::new(path.trim()))
            }
            _ => Self::embedded(),
        }
    }

    /// Resolves the spreadsheet id and sheet locator holding `domain` for
    /// `branch_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownBranch`] if `branch_id` is not
    /// registered.
    pub fn resolve(&self, branch_id: &str, domain: DataDomain) -> Result<(&str, &str), SourceError> {
        let locator = self
            .locator(branch_id)
            .ok_or_else(|| SourceError::UnknownBranch(branch_id.to_owned()))?;
        Ok((locator.spreadsheet_id.as_str(), locator.sheet_for(domain)))
    }

    /// Returns the locator of `branch_id`, if registered.
    #[must_use]
    pub fn locator(&self, branch_id: &str) -> Option<&BranchLocator> {
        self.branches.iter().find(|b| b.branch_id == branch_id)
    }

    /// Branch ids in registration order.
    #[must_use]
    pub fn list_branches(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.branch_id.as_str()).collect()
    }

    /// All locators in registration order.
    #[must_use]
    pub fn branches(&self) -> &[BranchLocator] {
        &self.branches
    }

    /// Spreadsheet export host prefix.
    #[must_use]
    pub fn export_base(&self) -> &str {
        &self.export_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_branches_in_order() {
        let registry = BranchRegistry::embedded().unwrap();
        assert_eq!(
            registry.list_branches(),
            vec![
                "Bhavani",
                "Kumarapalayam",
                "Anthiyur",
                "Kavindapadi",
                "Ammapettai"
            ]
        );
        assert_eq!(
            registry.export_base(),
            "https://docs.google.com/spreadsheets/d"
        );
    }

    #[test]
    fn resolves_explicit_and_fallback_locators() {
        let registry = BranchRegistry::embedded().unwrap();

        let (sheet, gid) = registry.resolve("Bhavani", DataDomain::Stock).unwrap();
        assert_eq!(sheet, "bhavani-branch-sheet");
        assert_eq!(gid, "471760422");

        // Kavindapadi has no service sheet mapped.
        let (_, gid) = registry
            .resolve("Kavindapadi", DataDomain::Service)
            .unwrap();
        assert_eq!(gid, "0");

        // Numeric gids are accepted.
        let (_, gid) = registry
            .resolve("Ammapettai", DataDomain::Bookings)
            .unwrap();
        assert_eq!(gid, "4");
        let (_, gid) = registry.resolve("Ammapettai", DataDomain::Stock).unwrap();
        assert_eq!(gid, "674010899");
    }

    #[test]
    fn unknown_branch_is_an_error() {
        let registry = BranchRegistry::embedded().unwrap();
        let err = registry.resolve("Erode", DataDomain::Sales).unwrap_err();
        assert!(matches!(err, SourceError::UnknownBranch(b) if b == "Erode"));
    }

    #[test]
    fn rejects_duplicate_branch_ids() {
        let toml = r#"
            export_base = "http://localhost"
            [[branches]]
            id = "A"
            spreadsheet_id = "one"
            [[branches]]
            id = "A"
            spreadsheet_id = "two"
        "#;
        assert!(matches!(
            BranchRegistry::from_toml(toml),
            Err(SourceError::Config { .. })
        ));
    }

    #[test]
    fn rejects_empty_spreadsheet_id() {
        let toml = r#"
            export_base = "http://localhost"
            [[branches]]
            id = "A"
            spreadsheet_id = "  "
        "#;
        assert!(matches!(
            BranchRegistry::from_toml(toml),
            Err(SourceError::Config { .. })
        ));
    }

    #[test]
    fn rejects_unknown_domain_keys() {
        let toml = r#"
            export_base = "http://localhost"
            [[branches]]
            id = "A"
            spreadsheet_id = "one"
            [branches.sheets]
            leads = "9"
        "#;
        assert!(matches!(
            BranchRegistry::from_toml(toml),
            Err(SourceError::Config { .. })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            BranchRegistry::from_toml("export_base = "),
            Err(SourceError::Toml(_))
        ));
    }
}
