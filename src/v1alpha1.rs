//! Objects of the experimental `admissionregistration.k8s.io/v1alpha1` API.
//!
//! The compiler emits [`ValidatingAdmissionPolicy`] and [`ValidatingAdmissionPolicyBinding`]
//! objects in this version.  Field names serialize exactly as the API server expects, and empty
//! optional fields are omitted.

use crate::meta::{LabelSelector, ObjectMeta};

/// The API version every object in this module serializes with.
pub const API_VERSION: &str = "admissionregistration.k8s.io/v1alpha1";

//////////////////////////////////// ValidatingAdmissionPolicy /////////////////////////////////////

/// A compiled policy: the rules, match conditions and variables evaluated for each request.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatingAdmissionPolicy {
    /// Always [`API_VERSION`].
    pub api_version: String,
    /// Always `ValidatingAdmissionPolicy`.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// The policy body.
    pub spec: ValidatingAdmissionPolicySpec,
}

impl ValidatingAdmissionPolicy {
    /// The kind string of this object.
    pub const KIND: &'static str = "ValidatingAdmissionPolicy";

    /// Wrap a spec into a named policy object.
    pub fn new(name: impl Into<String>, spec: ValidatingAdmissionPolicySpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
        }
    }
}

/// The body of a [`ValidatingAdmissionPolicy`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatingAdmissionPolicySpec {
    /// The kind of resource bindings reference as parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_kind: Option<ParamKind>,
    /// Which requests the policy applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_constraints: Option<MatchResources>,
    /// Validations evaluated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
    /// How evaluation failures are handled; unset means the API server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicyType>,
    /// Preconditions evaluated in order; all must hold for validations to run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<MatchCondition>,
    /// Variables evaluated lazily, each able to reference the ones before it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
}

/// Identifies the kind of a parameter resource.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamKind {
    /// `group/version` of the parameter resource.
    pub api_version: String,
    /// Kind of the parameter resource.
    pub kind: String,
}

/////////////////////////////////////////// MatchResources /////////////////////////////////////////

/// Decides whether a request is in scope based on its resource and the selectors.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResources {
    /// Selects on the labels of the request's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
    /// Selects on the labels of the request's object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_selector: Option<LabelSelector>,
    /// Resources and operations that are in scope.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_rules: Vec<NamedRuleWithOperations>,
    /// Resources and operations that are out of scope, taking precedence over `resource_rules`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_resource_rules: Vec<NamedRuleWithOperations>,
}

/// A [`RuleWithOperations`] optionally narrowed to specific resource names.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRuleWithOperations {
    /// Resource names the rule is restricted to; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
    /// The operations and resources.
    #[serde(flatten)]
    pub rule_with_operations: RuleWithOperations,
}

/// A [`Rule`] together with the operations it covers.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RuleWithOperations {
    /// Operations the rule covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationType>,
    /// The resources the rule covers.
    #[serde(flatten)]
    pub rule: Rule,
}

/// A set of API groups, versions and resources.  `*` matches everything.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// API groups; the core group is the empty string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_groups: Vec<String>,
    /// API versions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_versions: Vec<String>,
    /// Resources, optionally with a `/subresource` suffix.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

/// An admission operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum OperationType {
    /// Every operation.
    #[serde(rename = "*")]
    All,
    /// Object creation.
    #[serde(rename = "CREATE")]
    Create,
    /// Object update.
    #[serde(rename = "UPDATE")]
    Update,
    /// Object deletion.
    #[serde(rename = "DELETE")]
    Delete,
    /// Connection to a subresource such as `pods/exec`.
    #[serde(rename = "CONNECT")]
    Connect,
}

//////////////////////////////////////////// Expressions ///////////////////////////////////////////

/// How evaluation failures are handled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum FailurePolicyType {
    /// Reject the request.
    Fail,
    /// Let the request through.
    Ignore,
}

/// A named CEL precondition.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MatchCondition {
    /// Identifier of the condition; unique within a policy.
    pub name: String,
    /// CEL expression evaluating to a bool.
    pub expression: String,
}

/// A named CEL expression bound under `variables`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Variable {
    /// Name of the variable.
    pub name: String,
    /// CEL expression computing the value.
    pub expression: String,
}

/// A CEL validation and the message reported when it fails.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// CEL expression evaluating to a bool.
    pub expression: String,
    /// Static message reported on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// CEL expression computing the message reported on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_expression: String,
}

///////////////////////////////// ValidatingAdmissionPolicyBinding /////////////////////////////////

/// Binds a [`ValidatingAdmissionPolicy`] to a parameter object and a scope.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatingAdmissionPolicyBinding {
    /// Always [`API_VERSION`].
    pub api_version: String,
    /// Always `ValidatingAdmissionPolicyBinding`.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// The binding body.
    pub spec: ValidatingAdmissionPolicyBindingSpec,
}

impl ValidatingAdmissionPolicyBinding {
    /// The kind string of this object.
    pub const KIND: &'static str = "ValidatingAdmissionPolicyBinding";

    /// Wrap a spec into a named binding object.
    pub fn new(name: impl Into<String>, spec: ValidatingAdmissionPolicyBindingSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec,
        }
    }
}

/// The body of a [`ValidatingAdmissionPolicyBinding`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatingAdmissionPolicyBindingSpec {
    /// Name of the bound policy.
    pub policy_name: String,
    /// The parameter object handed to the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_ref: Option<ParamRef>,
    /// Further narrows the policy's match constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_resources: Option<MatchResources>,
    /// What happens when a validation fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_actions: Vec<ValidationAction>,
}

/// References the parameter object of a binding.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRef {
    /// Name of the parameter object.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// What to do when the parameter object does not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_not_found_action: Option<ParameterNotFoundActionType>,
}

/// Behavior when a binding's parameter object is missing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum ParameterNotFoundActionType {
    /// Evaluate the policy without parameters.
    Allow,
    /// Treat the missing parameter as a violation.
    Deny,
}

/// Enforcement applied when a validation fails.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum ValidationAction {
    /// Reject the request.
    Deny,
    /// Admit the request and return a warning to the client.
    Warn,
    /// Admit the request and record the failure in the audit log.
    Audit,
}
