//! 权限记录
//!
//! 一条权限是 (assignee, resource, operation) 三元组。一次授予
//! `"create,read,update"` 会展开成三条独立记录。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::identity::IdentityRef;

/// Separator accepted between operations in a grant string.
pub const OPERATION_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub assignee: IdentityRef,
    pub resource: String,
    pub operation: String,
}

impl Permission {
    pub fn new(
        assignee: IdentityRef,
        resource: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            assignee,
            resource: resource.into(),
            operation: operation.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_resource(&self.resource)?;
        validate_operation(&self.operation)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}:{}", self.assignee, self.resource, self.operation)
    }
}

pub fn validate_resource(resource: &str) -> Result<(), ValidationError> {
    if resource.is_empty() {
        return Err(ValidationError::required("permission.resource"));
    }
    if resource.trim() != resource {
        return Err(ValidationError::invalid_format(
            "permission.resource",
            "leading or trailing whitespace",
        ));
    }
    Ok(())
}

fn validate_operation(operation: &str) -> Result<(), ValidationError> {
    if operation.is_empty() {
        return Err(ValidationError::required("permission.operation"));
    }
    if operation.contains(OPERATION_SEPARATOR) || operation.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format(
            "permission.operation",
            format!("'{operation}' must be a single word"),
        ));
    }
    Ok(())
}

/// 一次授予/撤销请求中的操作集合
///
/// Accepts `"create,read"` as well as any list of strings; each item may itself be
/// comma separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operations(Vec<String>);

impl Operations {
    /// Splits, trims and de-duplicates the requested operations, keeping first-seen order.
    /// Fails on an empty request or an empty item.
    pub fn normalize(&self) -> Result<Vec<String>, ValidationError> {
        let mut out: Vec<String> = Vec::new();
        for raw in &self.0 {
            for op in raw.split(OPERATION_SEPARATOR) {
                let op = op.trim();
                if op.is_empty() {
                    return Err(ValidationError::invalid_format(
                        "operations",
                        format!("empty operation in '{raw}'"),
                    ));
                }
                validate_operation(op)?;
                if !out.iter().any(|o| o == op) {
                    out.push(op.to_string());
                }
            }
        }
        if out.is_empty() {
            return Err(ValidationError::required("operations"));
        }
        Ok(out)
    }
}

impl From<&str> for Operations {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Operations {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl<S: Into<String>> From<Vec<S>> for Operations {
    fn from(value: Vec<S>) -> Self {
        Self(value.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Operations {
    fn from(value: [S; N]) -> Self {
        Self(value.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for Operations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
