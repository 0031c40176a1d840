//! Constraints: instances of a template that carry selectors, parameters and an enforcement action.

use crate::meta::{LabelSelector, ObjectMeta};
use crate::v1alpha1::ValidationAction;
use crate::TransformError;

/// A constraint, an instance of the kind a [`crate::ConstraintTemplate`] defines.
///
/// Constraint kinds are generated per template, so every constraint decodes into this one shape.
/// Match criteria the compiler does not read (kinds, namespaces, names) stay in the object that
/// the admission engine receives as `params`.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// `constraints.gatekeeper.sh/<version>`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// The constraint kind, as defined by its template.
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// The constraint body.
    #[serde(default)]
    pub spec: ConstraintSpec,
}

/// The body of a [`Constraint`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    /// Which objects the constraint applies to.
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub r#match: Option<Match>,
    /// `deny` or `warn`; unset means `deny`, anything else is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_action: Option<String>,
    /// Template-specific parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// The selector part of a constraint's match criteria.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Selects on the labels of the object's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
    /// Selects on the labels of the object itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

///////////////////////////////////////// EnforcementAction ////////////////////////////////////////

/// What happens when a constraint is violated.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum EnforcementAction {
    /// Reject the request.
    #[default]
    Deny,
    /// Admit the request with a warning.
    Warn,
}

impl EnforcementAction {
    /// Parse an enforcement action; absent means [`EnforcementAction::Deny`].
    ///
    /// The set is closed: any literal other than `deny` or `warn`, the empty string included, is
    /// rejected.
    pub fn parse(action: Option<&str>) -> Result<Self, TransformError> {
        match action {
            None | Some("deny") => Ok(Self::Deny),
            Some("warn") => Ok(Self::Warn),
            Some(other) => Err(TransformError::BadEnforcementAction {
                action: other.to_string(),
            }),
        }
    }

    /// The validation actions this enforcement action maps to.
    pub fn validation_actions(self) -> Vec<ValidationAction> {
        match self {
            Self::Deny => vec![ValidationAction::Deny],
            Self::Warn => vec![ValidationAction::Warn],
        }
    }
}

impl Constraint {
    /// A constraint of `kind` named `name` with an empty spec.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: "constraints.gatekeeper.sh/v1beta1".to_string(),
            kind: kind.into(),
            metadata: ObjectMeta::named(name),
            spec: ConstraintSpec::default(),
        }
    }

    /// The constraint's name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The parsed enforcement action.
    pub fn enforcement_action(&self) -> Result<EnforcementAction, TransformError> {
        EnforcementAction::parse(self.spec.enforcement_action.as_deref())
    }

    /// The namespace selector, if one is set.
    pub fn namespace_selector(&self) -> Option<&LabelSelector> {
        self.spec
            .r#match
            .as_ref()
            .and_then(|m| m.namespace_selector.as_ref())
    }

    /// The object label selector, if one is set.
    pub fn label_selector(&self) -> Option<&LabelSelector> {
        self.spec
            .r#match
            .as_ref()
            .and_then(|m| m.label_selector.as_ref())
    }
}
