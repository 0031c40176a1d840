//! Expression types of the stable `admissionregistration.k8s.io/v1` API.
//!
//! These are the shapes an in-process CEL evaluator consumes.  They are field-compatible with,
//! but distinct from, the types in [`crate::v1alpha1`].

/// How an admission error or evaluation failure is handled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum FailurePolicyType {
    /// Reject the request when evaluation fails.
    Fail,
    /// Ignore the failure and let the request through.
    Ignore,
}

/// A named CEL precondition a request must satisfy before validations run.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MatchCondition {
    /// Identifier of the condition; unique within a policy.
    pub name: String,
    /// CEL expression evaluating to a bool.
    pub expression: String,
}

/// A named CEL expression whose result is bound for use by other expressions.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Variable {
    /// Name the result is bound to under `variables`.
    pub name: String,
    /// CEL expression computing the value.
    pub expression: String,
}

/// A CEL validation with the message reported when it fails.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// CEL expression evaluating to a bool; `false` is a violation.
    pub expression: String,
    /// Static message reported on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// CEL expression computing the message reported on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_expression: String,
}
