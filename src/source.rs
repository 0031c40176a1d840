//! The K8sNativeValidation source: the engine-agnostic policy body embedded in a template.
//!
//! A [`Source`] is decoded from the untyped payload of a template's code entry, validated against
//! the reserved-name rules, and projected into either target API flavor.  Every projection
//! re-validates, so no path converts an invalid source.

use crate::accessor::{
    first_reserved, first_reserved_or_params, ExpressionAccessor, MessageExpressionCondition,
    NamedExpressionAccessor,
};
use crate::{v1, v1alpha1, SchemaError};

//////////////////////////////////////////// Expressions ///////////////////////////////////////////

/// A CEL validation.  Maps to a policy's `spec.validations`.
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

/// A named CEL precondition.  Maps to a policy's `spec.matchConditions`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MatchCondition {
    /// Identifier of the condition.
    pub name: String,
    /// CEL expression evaluating to a bool.
    pub expression: String,
}

/// A named CEL variable.  Maps to a policy's `spec.variables`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Variable {
    /// Name the value is bound to.
    pub name: String,
    /// CEL expression computing the value.
    pub expression: String,
}

impl ExpressionAccessor for Validation {
    fn expression(&self) -> &str {
        &self.expression
    }
}

impl ExpressionAccessor for MatchCondition {
    fn expression(&self) -> &str {
        &self.expression
    }
}

impl NamedExpressionAccessor for MatchCondition {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ExpressionAccessor for Variable {
    fn expression(&self) -> &str {
        &self.expression
    }
}

impl NamedExpressionAccessor for Variable {
    fn name(&self) -> &str {
        &self.name
    }
}

/////////////////////////////////////////// FailurePolicy //////////////////////////////////////////

/// The parsed failure policy of a source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FailurePolicy {
    /// Reject the request when evaluation fails.
    Fail,
    /// Admit the request when evaluation fails.
    Ignore,
}

impl FailurePolicy {
    /// Parse the canonical, case-sensitive spelling of a failure policy.
    pub fn parse(value: &str) -> Result<Self, SchemaError> {
        match value {
            "Fail" => Ok(Self::Fail),
            "Ignore" => Ok(Self::Ignore),
            _ => Err(SchemaError::BadFailurePolicy {
                value: value.to_string(),
            }),
        }
    }
}

impl From<FailurePolicy> for v1::FailurePolicyType {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Fail => v1::FailurePolicyType::Fail,
            FailurePolicy::Ignore => v1::FailurePolicyType::Ignore,
        }
    }
}

impl From<FailurePolicy> for v1alpha1::FailurePolicyType {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Fail => v1alpha1::FailurePolicyType::Fail,
            FailurePolicy::Ignore => v1alpha1::FailurePolicyType::Ignore,
        }
    }
}

////////////////////////////////////////////// Source //////////////////////////////////////////////

/// The user-authored body of a K8sNativeValidation policy.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct Source {
    /// Validations, in evaluation order.
    #[serde(rename = "validations", skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
    /// `Fail` or `Ignore`; unset defers to the API server default.
    #[serde(rename = "failurePolicy", skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<String>,
    /// Match conditions, in evaluation order.
    #[serde(rename = "matchCondition", skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<MatchCondition>,
    /// Variables, in declaration order.
    #[serde(rename = "variables", skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
}

impl Source {
    /// Decode and validate a source from the untyped payload of a code entry.
    ///
    /// Stricter than a zero-filling decode: a validation without `expression`, or a match
    /// condition or variable without `name` or `expression`, is [`SchemaError::MissingField`].
    ///
    /// # Example
    ///
    /// ```
    /// use k8scel::Source;
    ///
    /// let source = Source::from_value(&serde_json::json!({
    ///     "validations": [{"expression": "object.spec.replicas < 5", "message": "too many"}],
    ///     "failurePolicy": "Fail"
    /// }))
    /// .unwrap();
    /// assert_eq!(source.validations.len(), 1);
    /// ```
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SchemaError> {
        if !value.is_object() {
            return Err(SchemaError::bad_type(value));
        }
        let raw: RawSource = serde_json::from_value(value.clone())?;
        let source = raw.into_source()?;
        source.validate()?;
        Ok(source)
    }

    /// Convert this source into the untyped payload a template embeds.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Run every check on this source, returning the first failure.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_match_conditions()?;
        self.validate_variables()?;
        self.parsed_failure_policy()?;
        Ok(())
    }

    /// Check that no match condition uses the reserved prefix.
    pub fn validate_match_conditions(&self) -> Result<(), SchemaError> {
        match first_reserved(&self.match_conditions) {
            Some(condition) => Err(SchemaError::BadMatchCondition {
                name: condition.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Check that no variable uses the reserved prefix or the reserved parameter name.
    pub fn validate_variables(&self) -> Result<(), SchemaError> {
        match first_reserved_or_params(&self.variables) {
            Some(variable) => Err(SchemaError::BadVariable {
                name: variable.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Parse the failure policy, if one is set.
    pub fn parsed_failure_policy(&self) -> Result<Option<FailurePolicy>, SchemaError> {
        self.failure_policy
            .as_deref()
            .map(FailurePolicy::parse)
            .transpose()
    }

    /// Project the match conditions into the stable flavor.
    pub fn match_conditions(&self) -> Result<Vec<v1::MatchCondition>, SchemaError> {
        self.validate_match_conditions()?;
        Ok(self
            .match_conditions
            .iter()
            .map(|mc| v1::MatchCondition {
                name: mc.name.clone(),
                expression: mc.expression.clone(),
            })
            .collect())
    }

    /// Project the match conditions into the v1alpha1 flavor.
    pub fn v1alpha1_match_conditions(
        &self,
    ) -> Result<Vec<v1alpha1::MatchCondition>, SchemaError> {
        self.validate_match_conditions()?;
        Ok(self
            .match_conditions
            .iter()
            .map(|mc| v1alpha1::MatchCondition {
                name: mc.name.clone(),
                expression: mc.expression.clone(),
            })
            .collect())
    }

    /// Project the variables into the stable flavor.
    pub fn variables(&self) -> Result<Vec<v1::Variable>, SchemaError> {
        self.validate_variables()?;
        Ok(self
            .variables
            .iter()
            .map(|v| v1::Variable {
                name: v.name.clone(),
                expression: v.expression.clone(),
            })
            .collect())
    }

    /// Project the variables into the v1alpha1 flavor.
    pub fn v1alpha1_variables(&self) -> Result<Vec<v1alpha1::Variable>, SchemaError> {
        self.validate_variables()?;
        Ok(self
            .variables
            .iter()
            .map(|v| v1alpha1::Variable {
                name: v.name.clone(),
                expression: v.expression.clone(),
            })
            .collect())
    }

    /// Project the validations into the stable flavor.
    pub fn validations(&self) -> Vec<v1::Validation> {
        self.validations
            .iter()
            .map(|v| v1::Validation {
                expression: v.expression.clone(),
                message: v.message.clone(),
                message_expression: v.message_expression.clone(),
            })
            .collect()
    }

    /// Project the validations into the v1alpha1 flavor.
    pub fn v1alpha1_validations(&self) -> Vec<v1alpha1::Validation> {
        self.validations
            .iter()
            .map(|v| v1alpha1::Validation {
                expression: v.expression.clone(),
                message: v.message.clone(),
                message_expression: v.message_expression.clone(),
            })
            .collect()
    }

    /// The message expression of each validation, index-aligned with [`Source::validations`].
    pub fn message_expressions(&self) -> Vec<Option<MessageExpressionCondition>> {
        self.validations
            .iter()
            .map(|v| {
                if v.message_expression.is_empty() {
                    None
                } else {
                    Some(MessageExpressionCondition {
                        message_expression: v.message_expression.clone(),
                    })
                }
            })
            .collect()
    }

    /// Project the failure policy into the stable flavor.
    pub fn failure_policy(&self) -> Result<Option<v1::FailurePolicyType>, SchemaError> {
        Ok(self.parsed_failure_policy()?.map(Into::into))
    }

    /// Project the failure policy into the v1alpha1 flavor.
    pub fn v1alpha1_failure_policy(
        &self,
    ) -> Result<Option<v1alpha1::FailurePolicyType>, SchemaError> {
        Ok(self.parsed_failure_policy()?.map(Into::into))
    }
}

///////////////////////////////////////////// RawSource ////////////////////////////////////////////

// The payload as written, before required fields are checked.
#[derive(serde::Deserialize)]
struct RawSource {
    #[serde(default)]
    validations: Vec<RawValidation>,
    #[serde(default, rename = "failurePolicy")]
    failure_policy: Option<String>,
    #[serde(default, rename = "matchCondition")]
    match_conditions: Vec<RawNamedExpression>,
    #[serde(default)]
    variables: Vec<RawNamedExpression>,
}

#[derive(serde::Deserialize)]
struct RawValidation {
    expression: Option<String>,
    message: Option<String>,
    #[serde(rename = "messageExpression")]
    message_expression: Option<String>,
}

#[derive(serde::Deserialize)]
struct RawNamedExpression {
    name: Option<String>,
    expression: Option<String>,
}

fn require(value: Option<String>, field: impl FnOnce() -> String) -> Result<String, SchemaError> {
    value.ok_or_else(|| SchemaError::missing_field(field()))
}

impl RawSource {
    fn into_source(self) -> Result<Source, SchemaError> {
        let mut validations = Vec::with_capacity(self.validations.len());
        for (i, v) in self.validations.into_iter().enumerate() {
            validations.push(Validation {
                expression: require(v.expression, || format!("validations[{i}].expression"))?,
                message: v.message.unwrap_or_default(),
                message_expression: v.message_expression.unwrap_or_default(),
            });
        }
        let mut match_conditions = Vec::with_capacity(self.match_conditions.len());
        for (i, mc) in self.match_conditions.into_iter().enumerate() {
            match_conditions.push(MatchCondition {
                name: require(mc.name, || format!("matchCondition[{i}].name"))?,
                expression: require(mc.expression, || format!("matchCondition[{i}].expression"))?,
            });
        }
        let mut variables = Vec::with_capacity(self.variables.len());
        for (i, v) in self.variables.into_iter().enumerate() {
            variables.push(Variable {
                name: require(v.name, || format!("variables[{i}].name"))?,
                expression: require(v.expression, || format!("variables[{i}].expression"))?,
            });
        }
        Ok(Source {
            validations,
            failure_policy: self.failure_policy,
            match_conditions,
            variables,
        })
    }
}
