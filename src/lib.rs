#![deny(missing_docs)]

//! k8scel: compile K8sNativeValidation constraint templates into native admission policies.
//!
//! A constraint template carries engine-tagged source code.  For the `K8sNativeValidation` engine
//! that source is a declarative set of CEL expressions: validations, match conditions, variables
//! and a failure policy.  This crate validates that source and compiles it, together with the
//! constraints instantiating the template, into the objects the Kubernetes API server evaluates
//! natively.
//!
//! # Core Concepts
//!
//! - **Source**: The user-authored expressions, decoded from a template's code entry
//! - **ConstraintTemplate**: Binds a constraint kind to a source
//! - **Constraint**: Instantiates a template with selectors, parameters and an enforcement action
//! - **ValidatingAdmissionPolicy**: The compiled, template-wide rule set
//! - **ValidatingAdmissionPolicyBinding**: The compiled, constraint-specific scope and enforcement
//!
//! Names starting with [`RESERVED_PREFIX`] belong to the compiler, which appends its own match
//! conditions under that prefix.  The variable name [`PARAMS_NAME`] is reserved as well.
//!
//! # Example
//!
//! ```
//! use k8scel::{constraint_to_binding, template_to_policy_definition};
//! use k8scel::{Code, Constraint, ConstraintTemplate};
//!
//! let template = ConstraintTemplate::new(
//!     "K8sMaxReplicas",
//!     "admission.k8s.gatekeeper.sh",
//!     vec![Code::k8s_native_validation(serde_json::json!({
//!         "validations": [{
//!             "expression": "object.spec.replicas <= variables.params.max",
//!             "message": "too many replicas"
//!         }],
//!         "failurePolicy": "Fail"
//!     }))],
//! );
//! let policy = template_to_policy_definition(&template).unwrap();
//! assert_eq!(policy.metadata.name, "gatekeeper-k8smaxreplicas");
//!
//! let constraint = Constraint::new("K8sMaxReplicas", "max-3");
//! let binding = constraint_to_binding(&constraint).unwrap();
//! assert_eq!(binding.spec.policy_name, policy.metadata.name);
//! ```

/// Uniform access to named and unnamed CEL expressions.
pub mod accessor;

/// Object metadata and label selectors.
pub mod meta;

pub mod v1;
pub mod v1alpha1;

mod constraint;
mod errors;
mod source;
mod template;
mod transform;

pub use constraint::{Constraint, ConstraintSpec, EnforcementAction, Match};
pub use errors::{SchemaError, TransformError};
pub use source::{FailurePolicy, MatchCondition, Source, Validation, Variable};
pub use template::{Code, ConstraintTemplate, ConstraintTemplateSpec, Crd, CrdSpec, Names, Target};
pub use transform::{
    binding_name, constraint_to_binding, is_synthesized, policy_name,
    template_to_policy_definition, MATCH_EXCLUDED_NAMESPACES_GLOB, MATCH_KINDS, MATCH_NAME_GLOB,
    MATCH_NAMESPACES_GLOB, PARAMS_EXPRESSION,
};

/// The engine name of the code entries this crate compiles.
pub const DRIVER_NAME: &str = "K8sNativeValidation";

/// No user-defined match condition or variable may start with this prefix.
///
/// The compiler names the expressions it synthesizes with it, which leaves room to add more of
/// them without breaking existing templates.
pub const RESERVED_PREFIX: &str = "gatekeeper_internal_";

/// The variable constraint parameters are bound to.
pub const PARAMS_NAME: &str = "params";

/// Prefix of every compiled policy and binding name.
pub const OBJECT_PREFIX: &str = "gatekeeper-";

/// The `apiVersion` of constraints, used as the compiled policy's parameter kind.
pub const PARAMS_API_VERSION: &str = "constraints.gatekeeper.sh/v1beta1";
