//! Per-partition AWS settings.
//!
//! The registry is built once at start and handed to the workflow by
//! reference. Lookups never fall back to another partition.

use std::{collections::HashMap, fmt, str::FromStr};

use crate::{
    constants::IAM_POLICY_ADMINISTRATOR,
    error::{Result, RotationError},
};

const AWS_REGION_DEFAULT_GLOBAL: &str = "us-east-1";
const AWS_REGION_DEFAULT_CHINA: &str = "cn-north-1";

const AWS_SECRET_NAME_GLOBAL: &str = "aws-account-operator-credentials";
const AWS_SECRET_NAME_CHINA: &str = "aws-account-operator-china-credentials";

const AWS_ARN_PREFIX_GLOBAL: &str = "arn:aws:";
const AWS_ARN_PREFIX_CHINA: &str = "arn:aws-cn:";

const AWS_FED_ENDPOINT_URL_GLOBAL: &str = "https://signin.aws.amazon.com/federation";
const AWS_FED_ENDPOINT_URL_CHINA: &str = "https://signin.amazonaws.cn/federation";

const AWS_FED_CONSOLE_URL_GLOBAL: &str = "https://console.aws.amazon.com/";
const AWS_FED_CONSOLE_URL_CHINA: &str = "https://console.amazonaws.cn/";

const AWS_REGIONS_GLOBAL: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

const AWS_REGIONS_CHINA: &[&str] = &["cn-north-1", "cn-northwest-1"];

/// Isolated AWS deployment with its own ARN namespace and endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Global,
    Restricted,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Global, Partition::Restricted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "global" => Ok(Self::Global),
            "restricted" => Ok(Self::Restricted),
            other => Err(RotationError::UnknownPartition(other.to_string())),
        }
    }
}

/// Sign-in federation endpoint and the console it redirects into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationConfig {
    pub endpoint_url: &'static str,
    pub console_url: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub partition: Partition,
    pub default_region: &'static str,
    /// Secret holding the setup identity used for AssumeRole
    pub setup_secret_name: &'static str,
    pub arn_prefix: &'static str,
    pub covered_regions: &'static [&'static str],
    pub federation: FederationConfig,
}

impl PlatformConfig {
    pub fn global() -> Self {
        Self {
            partition: Partition::Global,
            default_region: AWS_REGION_DEFAULT_GLOBAL,
            setup_secret_name: AWS_SECRET_NAME_GLOBAL,
            arn_prefix: AWS_ARN_PREFIX_GLOBAL,
            covered_regions: AWS_REGIONS_GLOBAL,
            federation: FederationConfig {
                endpoint_url: AWS_FED_ENDPOINT_URL_GLOBAL,
                console_url: AWS_FED_CONSOLE_URL_GLOBAL,
            },
        }
    }

    pub fn restricted() -> Self {
        Self {
            partition: Partition::Restricted,
            default_region: AWS_REGION_DEFAULT_CHINA,
            setup_secret_name: AWS_SECRET_NAME_CHINA,
            arn_prefix: AWS_ARN_PREFIX_CHINA,
            covered_regions: AWS_REGIONS_CHINA,
            federation: FederationConfig {
                endpoint_url: AWS_FED_ENDPOINT_URL_CHINA,
                console_url: AWS_FED_CONSOLE_URL_CHINA,
            },
        }
    }

    /// `<prefix>iam::<account_id>:role/<role>`
    pub fn role_arn(&self, account_id: &str, role: &str) -> String {
        format!("{}iam::{account_id}:role/{role}", self.arn_prefix)
    }

    pub fn administrator_policy_arn(&self) -> String {
        format!("{}{IAM_POLICY_ADMINISTRATOR}", self.arn_prefix)
    }

    pub fn covers_region(&self, region: &str) -> bool {
        self.covered_regions.contains(&region)
    }
}

/// Immutable partition lookup table
#[derive(Debug, Clone)]
pub struct PlatformConfigRegistry {
    entries: HashMap<Partition, PlatformConfig>,
}

impl PlatformConfigRegistry {
    pub fn standard() -> Self {
        Self::from_configs([PlatformConfig::global(), PlatformConfig::restricted()])
    }

    pub fn from_configs(configs: impl IntoIterator<Item = PlatformConfig>) -> Self {
        Self {
            entries: configs.into_iter().map(|c| (c.partition, c)).collect(),
        }
    }

    pub fn get(&self, partition: Partition) -> Result<&PlatformConfig> {
        self.entries
            .get(&partition)
            .ok_or_else(|| RotationError::UnknownPartition(partition.to_string()))
    }

    /// Resolve a partition identifier as declared on an account.
    pub fn resolve(&self, partition: &str) -> Result<&PlatformConfig> {
        self.get(partition.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_global() {
        let registry = PlatformConfigRegistry::standard();
        let pc = registry.resolve("global").unwrap();
        assert_eq!(pc.partition, Partition::Global);
        assert_eq!(pc.arn_prefix, "arn:aws:");
        assert_eq!(pc.default_region, "us-east-1");
        assert_eq!(pc.setup_secret_name, "aws-account-operator-credentials");
        assert_eq!(
            pc.federation.endpoint_url,
            "https://signin.aws.amazon.com/federation"
        );
        assert_eq!(pc.federation.console_url, "https://console.aws.amazon.com/");
    }

    #[test]
    fn test_resolve_restricted_is_isolated() {
        let registry = PlatformConfigRegistry::standard();
        let pc = registry.resolve("restricted").unwrap();
        assert_eq!(pc.arn_prefix, "arn:aws-cn:");
        assert_ne!(pc.arn_prefix, "arn:aws:");
        assert_eq!(pc.default_region, "cn-north-1");
        assert!(pc.federation.endpoint_url.contains("amazonaws.cn"));
        assert!(pc.federation.console_url.contains("amazonaws.cn"));
        assert!(pc.covers_region("cn-northwest-1"));
        assert!(!pc.covers_region("us-east-1"));

        let global = registry.resolve("global").unwrap();
        assert!(!global.covers_region("cn-north-1"));
        assert!(
            global
                .covered_regions
                .iter()
                .all(|r| !pc.covered_regions.contains(r))
        );
    }

    #[test]
    fn test_unknown_partition_is_error() {
        let registry = PlatformConfigRegistry::standard();
        let err = registry.resolve("aws-us-gov").unwrap_err();
        assert!(matches!(err, RotationError::UnknownPartition(ref p) if p == "aws-us-gov"));

        // No case folding or aliasing
        assert!(registry.resolve("Global").is_err());
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn test_registry_missing_entry() {
        let registry = PlatformConfigRegistry::from_configs([PlatformConfig::global()]);
        assert!(registry.get(Partition::Global).is_ok());
        assert!(matches!(
            registry.get(Partition::Restricted),
            Err(RotationError::UnknownPartition(_))
        ));
    }

    #[test]
    fn test_role_and_policy_arns() {
        let global = PlatformConfig::global();
        assert_eq!(
            global.role_arn("123456789012", "OrganizationAccountAccessRole"),
            "arn:aws:iam::123456789012:role/OrganizationAccountAccessRole"
        );
        assert_eq!(
            global.administrator_policy_arn(),
            "arn:aws:iam::aws:policy/AdministratorAccess"
        );

        let restricted = PlatformConfig::restricted();
        assert_eq!(
            restricted.role_arn("123456789012", "BYOCAdminAccess"),
            "arn:aws-cn:iam::123456789012:role/BYOCAdminAccess"
        );
        assert_eq!(
            restricted.administrator_policy_arn(),
            "arn:aws-cn:iam::aws:policy/AdministratorAccess"
        );
    }

    #[test]
    fn test_partition_round_trip_names() {
        for partition in Partition::ALL {
            assert_eq!(partition.as_str().parse::<Partition>().unwrap(), partition);
        }
    }
}
