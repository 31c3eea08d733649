//! IAM policy documents.
//!
//! AWS rejects documents whose keys are not capitalised exactly as below,
//! and treats `"Resource": null` differently from an absent key, so every
//! optional field is skipped rather than serialized empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Policy language version accepted by IAM
pub const POLICY_VERSION: &str = "2012-10-17";

/// Condition block: operator (`StringEquals`, `IpAddress`, ...) to key to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(pub BTreeMap<String, BTreeMap<String, ConditionValue>>);

impl Condition {
    pub fn with(mut self, operator: &str, key: &str, value: impl Into<ConditionValue>) -> Self {
        self.0
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "AWS", default, skip_serializing_if = "Vec::is_empty")]
    pub aws: Vec<String>,
    #[serde(rename = "Service", default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<String>,
}

/// One permission statement, in caller order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Effect")]
    pub effect: String,
    #[serde(rename = "Action")]
    pub action: Vec<String>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(rename = "Principal", default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

impl Statement {
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: "Allow".to_string(),
            action: actions.into_iter().map(Into::into).collect(),
            resource: Vec::new(),
            condition: None,
            principal: None,
        }
    }

    pub fn on<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource = resources.into_iter().map(Into::into).collect();
        self
    }
}

// Field order is the wire order: Version, then Statement.
#[derive(Debug, Serialize)]
struct PolicyDocument<'a> {
    #[serde(rename = "Version")]
    version: &'static str,
    #[serde(rename = "Statement")]
    statement: &'a [Statement],
}

/// Serialize statements into a policy document string IAM accepts.
pub fn build_policy(statements: &[Statement]) -> Result<String> {
    let document = PolicyDocument {
        version: POLICY_VERSION,
        statement: statements,
    };
    Ok(serde_json::to_string(&document)?)
}

/// Custom inline policy attached to a federated role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPolicy {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// A role definition users can be federated into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedRole {
    pub role_display_name: String,
    #[serde(default)]
    pub role_description: String,
    #[serde(default, rename = "awsCustomPolicy")]
    pub custom_policy: CustomPolicy,
    #[serde(default, rename = "awsManagedPolicies")]
    pub managed_policies: Vec<String>,
}

impl FederatedRole {
    pub fn policy_document(&self) -> Result<String> {
        build_policy(&self.custom_policy.statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_allow_statement() {
        let statements = vec![Statement::allow(["s3:GetObject"]).on(["*"])];
        let document = build_policy(&statements).unwrap();
        assert_eq!(
            document,
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:GetObject"],"Resource":["*"]}]}"#
        );
        assert!(!document.contains("Condition"));
        assert!(!document.contains("Principal"));
    }

    #[test]
    fn test_resource_omitted_when_empty() {
        let statements = vec![Statement::allow(["sts:AssumeRole"])];
        let document = build_policy(&statements).unwrap();
        assert_eq!(
            document,
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["sts:AssumeRole"]}]}"#
        );
    }

    #[test]
    fn test_statement_order_preserved() {
        let statements = vec![
            Statement::allow(["ec2:*"]).on(["*"]),
            Statement {
                effect: "Deny".to_string(),
                ..Statement::allow(["iam:*"]).on(["*"])
            },
            Statement::allow(["s3:ListBucket"]).on(["arn:aws:s3:::bucket"]),
        ];
        let document = build_policy(&statements).unwrap();

        let ec2 = document.find("ec2:*").unwrap();
        let iam = document.find("iam:*").unwrap();
        let s3 = document.find("s3:ListBucket").unwrap();
        assert!(ec2 < iam && iam < s3);
    }

    #[test]
    fn test_condition_and_principal_casing() {
        let statement = Statement {
            condition: Some(Condition::default().with(
                "StringEquals",
                "aws:RequestedRegion",
                "us-east-1",
            )),
            principal: Some(Principal {
                aws: vec!["arn:aws:iam::123456789012:root".to_string()],
                service: Vec::new(),
            }),
            ..Statement::allow(["sts:AssumeRole"])
        };
        let document = build_policy(&[statement]).unwrap();
        assert_eq!(
            document,
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["sts:AssumeRole"],"Condition":{"StringEquals":{"aws:RequestedRegion":"us-east-1"}},"Principal":{"AWS":["arn:aws:iam::123456789012:root"]}}]}"#
        );
    }

    #[test]
    fn test_empty_statement_list() {
        let document = build_policy(&[]).unwrap();
        assert_eq!(document, r#"{"Version":"2012-10-17","Statement":[]}"#);
    }

    #[test]
    fn test_federated_role_from_json() {
        let json = r#"{
            "roleDisplayName": "Read Only",
            "roleDescription": "Read-only access",
            "awsCustomPolicy": {
                "name": "ReadOnlyCustom",
                "statements": [
                    {"Effect": "Allow", "Action": ["s3:Get*", "s3:List*"], "Resource": ["*"]}
                ]
            },
            "awsManagedPolicies": ["ReadOnlyAccess"]
        }"#;
        let role: FederatedRole = serde_json::from_str(json).unwrap();
        assert_eq!(role.role_display_name, "Read Only");
        assert_eq!(role.managed_policies, vec!["ReadOnlyAccess"]);
        assert_eq!(
            role.policy_document().unwrap(),
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:Get*","s3:List*"],"Resource":["*"]}]}"#
        );
    }

    #[test]
    fn test_multi_value_condition() {
        let condition = Condition::default().with(
            "StringLike",
            "aws:PrincipalArn",
            vec!["arn:aws:iam::*:role/a".to_string(), "arn:aws:iam::*:role/b".to_string()],
        );
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(
            json,
            r#"{"StringLike":{"aws:PrincipalArn":["arn:aws:iam::*:role/a","arn:aws:iam::*:role/b"]}}"#
        );
    }
}
