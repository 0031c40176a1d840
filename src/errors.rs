use crate::{PARAMS_NAME, RESERVED_PREFIX};

//////////////////////////////////////////// SchemaError ///////////////////////////////////////////

/// Errors found while decoding or validating a K8sNativeValidation source.
///
/// Every variant describes a policy-authoring mistake.  None of them are retryable: the same
/// source fails the same way every time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SchemaError {
    /// The code payload is not a JSON object.
    BadType {
        /// The JSON type that was found instead.
        actual_type: String,
    },
    /// A required field of the payload is absent.
    MissingField {
        /// Path of the missing field, e.g. `matchCondition[0].name`.
        field: String,
    },
    /// The payload is an object but its fields do not have the expected shape.
    Decode {
        /// The decoder's description of the problem.
        message: String,
    },
    /// A match condition uses the reserved prefix.
    BadMatchCondition {
        /// Name of the offending match condition.
        name: String,
    },
    /// A variable uses the reserved prefix or the reserved parameter name.
    BadVariable {
        /// Name of the offending variable.
        name: String,
    },
    /// The failure policy is neither `Fail` nor `Ignore`.
    BadFailurePolicy {
        /// The unrecognized value.
        value: String,
    },
}

impl SchemaError {
    /// Create a BadType error describing the JSON type of `actual_value`.
    pub fn bad_type(actual_value: &serde_json::Value) -> Self {
        let actual_type = match actual_value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        };
        Self::BadType {
            actual_type: actual_type.to_string(),
        }
    }

    /// Create a MissingField error for `field`.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::BadType { actual_type } => {
                write!(f, "could not recognize the type: expected an object but got {actual_type}")
            }
            SchemaError::MissingField { field } => {
                write!(f, "K8sNativeValidation source missing required field: {field}")
            }
            SchemaError::Decode { message } => {
                write!(f, "could not decode K8sNativeValidation source: {message}")
            }
            SchemaError::BadMatchCondition { name } => {
                write!(
                    f,
                    "invalid match condition: {name} is not a valid match condition; cannot have {RESERVED_PREFIX:?} as a prefix"
                )
            }
            SchemaError::BadVariable { name } if name == PARAMS_NAME => {
                write!(
                    f,
                    "invalid variable: {name} is an invalid variable name, {PARAMS_NAME:?} is a reserved keyword"
                )
            }
            SchemaError::BadVariable { name } => {
                write!(
                    f,
                    "invalid variable: {name} is not a valid variable; cannot have {RESERVED_PREFIX:?} as a prefix"
                )
            }
            SchemaError::BadFailurePolicy { value } => {
                write!(
                    f,
                    "invalid failure policy: unrecognized failure policy: {value}; must be \"Fail\" or \"Ignore\""
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

////////////////////////////////////////// TransformError //////////////////////////////////////////

/// Errors produced while compiling templates and constraints into admission objects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransformError {
    /// The template's source failed to decode or validate.
    Schema(SchemaError),
    /// The constraint's enforcement action is neither `deny` nor `warn`.
    BadEnforcementAction {
        /// The unrecognized action.
        action: String,
    },
    /// The template does not define exactly one target.
    WrongTargetCount {
        /// How many targets the template defines.
        count: usize,
    },
    /// The template's target has no code entry for the engine.
    EngineNotFound {
        /// The engine that was looked for.
        engine: String,
    },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::Schema(err) => write!(f, "{err}"),
            TransformError::BadEnforcementAction { action } => {
                write!(
                    f,
                    "invalid enforcement action: unrecognized enforcement action {action}, must be `warn` or `deny`"
                )
            }
            TransformError::WrongTargetCount { count } => {
                write!(
                    f,
                    "wrong number of targets defined, only 1 target allowed (found {count})"
                )
            }
            TransformError::EngineNotFound { engine } => {
                write!(f, "{engine} code not defined")
            }
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for TransformError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}
