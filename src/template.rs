//! Constraint templates: the named definitions that carry a kind and engine-tagged source code.

use crate::meta::ObjectMeta;
use crate::{Source, TransformError, DRIVER_NAME};

/// A constraint template as stored by the API server.
///
/// Only the fields the compiler reads are modelled; everything else is ignored on decode.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintTemplate {
    /// `templates.gatekeeper.sh/<version>`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// `ConstraintTemplate`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// The template body.
    #[serde(default)]
    pub spec: ConstraintTemplateSpec,
}

/// The body of a [`ConstraintTemplate`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ConstraintTemplateSpec {
    /// The custom resource definition generated for constraints of this template.
    #[serde(default)]
    pub crd: Crd,
    /// The enforcement targets and their code.
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// The custom resource definition section of a template.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Crd {
    /// The definition body.
    #[serde(default)]
    pub spec: CrdSpec,
}

/// The body of a [`Crd`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CrdSpec {
    /// Names of the generated constraint kind.
    #[serde(default)]
    pub names: Names,
}

/// Names of the constraint kind a template defines.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Names {
    /// The constraint kind, e.g. `K8sRequiredLabels`.
    #[serde(default)]
    pub kind: String,
    /// Short names of the constraint kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
}

/// An enforcement target and the code implementing the template for it.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Target {
    /// Name of the target, e.g. `admission.k8s.gatekeeper.sh`.
    #[serde(default)]
    pub target: String,
    /// Engine-tagged source code.
    #[serde(default)]
    pub code: Vec<Code>,
}

/// Source code for a single engine.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Code {
    /// The engine that interprets `source`.
    pub engine: String,
    /// Engine-specific payload.
    pub source: serde_json::Value,
}

impl Code {
    /// A code entry for the K8sNativeValidation engine.
    pub fn k8s_native_validation(source: serde_json::Value) -> Self {
        Self {
            engine: DRIVER_NAME.to_string(),
            source,
        }
    }
}

impl ConstraintTemplate {
    /// A template for `kind` with a single target holding `code`.
    pub fn new(kind: impl Into<String>, target: impl Into<String>, code: Vec<Code>) -> Self {
        let kind = kind.into();
        Self {
            api_version: "templates.gatekeeper.sh/v1".to_string(),
            kind: "ConstraintTemplate".to_string(),
            metadata: ObjectMeta::named(kind.to_lowercase()),
            spec: ConstraintTemplateSpec {
                crd: Crd {
                    spec: CrdSpec {
                        names: Names {
                            kind,
                            short_names: vec![],
                        },
                    },
                },
                targets: vec![Target {
                    target: target.into(),
                    code,
                }],
            },
        }
    }

    /// The constraint kind this template defines.
    pub fn constraint_kind(&self) -> &str {
        &self.spec.crd.spec.names.kind
    }

    /// Extract and validate the K8sNativeValidation source of this template.
    ///
    /// The template must have exactly one target.  Code entries for other engines are skipped and
    /// the first K8sNativeValidation entry is decoded; later ones are never looked at.
    pub fn source(&self) -> Result<Source, TransformError> {
        if self.spec.targets.len() != 1 {
            return Err(TransformError::WrongTargetCount {
                count: self.spec.targets.len(),
            });
        }
        for code in self.spec.targets[0].code.iter() {
            if code.engine != DRIVER_NAME {
                tracing::debug!(
                    template = %self.metadata.name,
                    engine = %code.engine,
                    "skipping code for foreign engine"
                );
                continue;
            }
            return Ok(Source::from_value(&code.source)?);
        }
        Err(TransformError::EngineNotFound {
            engine: DRIVER_NAME.to_string(),
        })
    }
}
