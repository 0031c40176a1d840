//! Compilation of templates and constraints into ValidatingAdmissionPolicy objects.
//!
//! A template compiles to a [`ValidatingAdmissionPolicy`] whose shape is template-wide: it matches
//! every resource and defers scoping to four synthesized match conditions that read the
//! constraint's `spec.match` through `params`.  A constraint compiles to a
//! [`ValidatingAdmissionPolicyBinding`] that narrows the policy with the constraint's selectors
//! and sets the enforcement action.

use crate::accessor::{names, ExpressionAccessor, NamedExpressionAccessor};
use crate::v1alpha1::{
    MatchCondition, MatchResources, NamedRuleWithOperations, OperationType, ParamKind, ParamRef,
    ParameterNotFoundActionType, Rule, RuleWithOperations, ValidatingAdmissionPolicy,
    ValidatingAdmissionPolicyBinding, ValidatingAdmissionPolicyBindingSpec,
    ValidatingAdmissionPolicySpec, Variable,
};
use crate::{
    Constraint, ConstraintTemplate, TransformError, OBJECT_PREFIX, PARAMS_API_VERSION,
    PARAMS_NAME, RESERVED_PREFIX,
};

///////////////////////////////////////////// CEL snippets /////////////////////////////////////////

/// Admits requests whose namespace matches none of `spec.match.excludedNamespaces`.
///
/// Cluster-scoped requests always match.
pub const MATCH_EXCLUDED_NAMESPACES_GLOB: &str = r#"!has(params.spec) ? true: !has(params.spec.match) ? true: !has(params.spec.match.excludedNamespaces) ? true :
!has(request.namespace) || request.namespace == "" ? true :
!params.spec.match.excludedNamespaces.exists(nsMatcher,
  (string(request.namespace).matches("^" + string(nsMatcher).replace("*", ".*") + "$"))
)"#;

/// Admits requests whose namespace matches one of `spec.match.namespaces`.
///
/// Cluster-scoped requests always match.
pub const MATCH_NAMESPACES_GLOB: &str = r#"!has(params.spec) ? true: !has(params.spec.match) ? true: !has(params.spec.match.namespaces) ? true :
!has(request.namespace) || request.namespace == "" ? true :
params.spec.match.namespaces.exists(nsMatcher,
  (string(request.namespace).matches("^" + string(nsMatcher).replace("*", ".*") + "$"))
)"#;

/// Admits requests whose new or old object's name (or generate-name prefix) matches
/// `spec.match.name`.
pub const MATCH_NAME_GLOB: &str = r#"!has(params.spec) ? true: !has(params.spec.match) ? true: !has(params.spec.match.name) ? true :
[object, oldObject].exists(obj,
  obj != null && (
    (has(obj.metadata.generateName) && obj.metadata.generateName != "" && params.spec.match.name.endsWith("*") && string(obj.metadata.generateName).matches("^" + string(params.spec.match.name).replace("*", ".*") + "$")) ||
    (has(obj.metadata.name) && string(obj.metadata.name).matches("^" + string(params.spec.match.name).replace("*", ".*") + "$"))
  )
)"#;

/// Admits requests whose group and kind appear in `spec.match.kinds`.  `*` or an empty list
/// matches everything.
pub const MATCH_KINDS: &str = r#"!has(params.spec) ? true: !has(params.spec.match) ? true: !has(params.spec.match.kinds) ? true :
params.spec.match.kinds.exists(groupskinds,
  (!has(groupskinds.kinds) || size(groupskinds.kinds) == 0 || "*" in groupskinds.kinds || request.kind.kind in groupskinds.kinds) &&
  (!has(groupskinds.apiGroups) || size(groupskinds.apiGroups) == 0 || "*" in groupskinds.apiGroups || request.kind.group in groupskinds.apiGroups)
)"#;

/// Binds the constraint's `spec.parameters` to `variables.params`, or null when unset.
pub const PARAMS_EXPRESSION: &str =
    "!has(params.spec) ? null : !has(params.spec.parameters) ? null: params.spec.parameters";

// Suffixes of the synthesized match conditions, in the order they are appended.
static SYNTHESIZED_MATCH_CONDITIONS: [(&str, &str); 4] = [
    ("match_excluded_namespaces", MATCH_EXCLUDED_NAMESPACES_GLOB),
    ("match_namespaces", MATCH_NAMESPACES_GLOB),
    ("match_name", MATCH_NAME_GLOB),
    ("match_kinds", MATCH_KINDS),
];

/////////////////////////////////////////////// Naming /////////////////////////////////////////////

/// The name of the policy compiled from the template defining `kind`.
///
/// Kinds differing only by case share a policy name.
pub fn policy_name(kind: &str) -> String {
    format!("{OBJECT_PREFIX}{}", kind.to_lowercase())
}

/// The name of the binding compiled from the constraint named `constraint_name`.
pub fn binding_name(constraint_name: &str) -> String {
    format!("{OBJECT_PREFIX}{constraint_name}")
}

/////////////////////////////////////////////// Policy /////////////////////////////////////////////

/// Compile a template into a [`ValidatingAdmissionPolicy`].
///
/// The policy's match conditions are the source's, followed by the synthesized
/// `gatekeeper_internal_` conditions; its variables are the source's, followed by `params`.
///
/// # Example
///
/// ```
/// use k8scel::{template_to_policy_definition, Code, ConstraintTemplate};
///
/// let template = ConstraintTemplate::new(
///     "K8sRequiredLabels",
///     "admission.k8s.gatekeeper.sh",
///     vec![Code::k8s_native_validation(serde_json::json!({
///         "validations": [{"expression": "has(object.metadata.labels)"}]
///     }))],
/// );
/// let policy = template_to_policy_definition(&template).unwrap();
/// assert_eq!(policy.metadata.name, "gatekeeper-k8srequiredlabels");
/// assert_eq!(policy.spec.match_conditions.len(), 4);
/// ```
pub fn template_to_policy_definition(
    template: &ConstraintTemplate,
) -> Result<ValidatingAdmissionPolicy, TransformError> {
    let source = template.source()?;
    let kind = template.constraint_kind();

    let mut match_conditions = source.v1alpha1_match_conditions()?;
    match_conditions.extend(synthesized_match_conditions());

    let mut variables = source.v1alpha1_variables()?;
    variables.push(Variable {
        name: PARAMS_NAME.to_string(),
        expression: PARAMS_EXPRESSION.to_string(),
    });

    let failure_policy = source.v1alpha1_failure_policy()?;
    let validations = source.v1alpha1_validations();
    tracing::debug!(
        kind,
        validations = validations.len(),
        synthesized = match_conditions.iter().filter(|c| is_synthesized(*c)).count(),
        match_conditions = ?names(&match_conditions),
        variables = ?names(&variables),
        "compiled template"
    );

    Ok(ValidatingAdmissionPolicy::new(
        policy_name(kind),
        ValidatingAdmissionPolicySpec {
            param_kind: Some(ParamKind {
                api_version: PARAMS_API_VERSION.to_string(),
                kind: kind.to_string(),
            }),
            match_constraints: Some(match_everything()),
            validations,
            failure_policy,
            match_conditions,
            variables,
        },
    ))
}

fn synthesized_match_conditions() -> impl Iterator<Item = MatchCondition> {
    SYNTHESIZED_MATCH_CONDITIONS
        .iter()
        .map(|(suffix, expression)| MatchCondition {
            name: format!("{RESERVED_PREFIX}{suffix}"),
            expression: expression.to_string(),
        })
}

/// Returns true if `condition` is one this module synthesizes rather than one a user wrote.
pub fn is_synthesized<T: NamedExpressionAccessor>(condition: &T) -> bool {
    SYNTHESIZED_MATCH_CONDITIONS.iter().any(|(suffix, expression)| {
        condition
            .name()
            .strip_prefix(RESERVED_PREFIX)
            .is_some_and(|s| s == *suffix)
            && condition.expression() == *expression
    })
}

fn match_everything() -> MatchResources {
    MatchResources {
        resource_rules: vec![NamedRuleWithOperations {
            resource_names: vec![],
            rule_with_operations: RuleWithOperations {
                operations: vec![OperationType::All],
                rule: Rule {
                    api_groups: vec!["*".to_string()],
                    api_versions: vec!["*".to_string()],
                    resources: vec!["*".to_string()],
                },
            },
        }],
        ..MatchResources::default()
    }
}

////////////////////////////////////////////// Binding /////////////////////////////////////////////

/// Compile a constraint into a [`ValidatingAdmissionPolicyBinding`] for its template's policy.
pub fn constraint_to_binding(
    constraint: &Constraint,
) -> Result<ValidatingAdmissionPolicyBinding, TransformError> {
    let validation_actions = constraint.enforcement_action()?.validation_actions();
    let match_resources = MatchResources {
        namespace_selector: constraint.namespace_selector().cloned(),
        object_selector: constraint.label_selector().cloned(),
        ..MatchResources::default()
    };
    tracing::debug!(
        kind = %constraint.kind,
        name = %constraint.name(),
        ?validation_actions,
        "compiled constraint"
    );
    Ok(ValidatingAdmissionPolicyBinding::new(
        binding_name(constraint.name()),
        ValidatingAdmissionPolicyBindingSpec {
            policy_name: policy_name(&constraint.kind),
            param_ref: Some(ParamRef {
                name: constraint.name().to_string(),
                parameter_not_found_action: Some(ParameterNotFoundActionType::Allow),
            }),
            match_resources: Some(match_resources),
            validation_actions,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{LabelSelector, ObjectMeta};
    use crate::source::{
        MatchCondition as SourceMatchCondition, Validation, Variable as SourceVariable,
    };
    use crate::v1alpha1::{self, FailurePolicyType, ValidationAction};
    use crate::{Code, SchemaError, Source};

    fn some_policy_source() -> Source {
        Source {
            failure_policy: Some("Fail".to_string()),
            match_conditions: vec![SourceMatchCondition {
                name: "must_match_something".to_string(),
                expression: "true == true".to_string(),
            }],
            variables: vec![SourceVariable {
                name: "my_variable".to_string(),
                expression: "true".to_string(),
            }],
            validations: vec![Validation {
                expression: "1 == 1".to_string(),
                message: "some fallback message".to_string(),
                message_expression: r#""some CEL string""#.to_string(),
            }],
        }
    }

    fn template_for(kind: &str, source: &Source) -> ConstraintTemplate {
        ConstraintTemplate::new(
            kind,
            "admission.k8s.gatekeeper.sh",
            vec![Code::k8s_native_validation(source.to_value().unwrap())],
        )
    }

    fn condition(name: &str, expression: &str) -> MatchCondition {
        MatchCondition {
            name: name.to_string(),
            expression: expression.to_string(),
        }
    }

    #[test]
    fn valid_template() {
        let template = template_for("SomePolicy", &some_policy_source());
        let policy = template_to_policy_definition(&template).unwrap();
        let expected = ValidatingAdmissionPolicy {
            api_version: "admissionregistration.k8s.io/v1alpha1".to_string(),
            kind: "ValidatingAdmissionPolicy".to_string(),
            metadata: ObjectMeta::named("gatekeeper-somepolicy"),
            spec: ValidatingAdmissionPolicySpec {
                param_kind: Some(ParamKind {
                    api_version: "constraints.gatekeeper.sh/v1beta1".to_string(),
                    kind: "SomePolicy".to_string(),
                }),
                match_constraints: Some(MatchResources {
                    resource_rules: vec![NamedRuleWithOperations {
                        resource_names: vec![],
                        rule_with_operations: RuleWithOperations {
                            operations: vec![OperationType::All],
                            rule: Rule {
                                api_groups: vec!["*".to_string()],
                                api_versions: vec!["*".to_string()],
                                resources: vec!["*".to_string()],
                            },
                        },
                    }],
                    ..MatchResources::default()
                }),
                match_conditions: vec![
                    condition("must_match_something", "true == true"),
                    condition(
                        "gatekeeper_internal_match_excluded_namespaces",
                        MATCH_EXCLUDED_NAMESPACES_GLOB,
                    ),
                    condition("gatekeeper_internal_match_namespaces", MATCH_NAMESPACES_GLOB),
                    condition("gatekeeper_internal_match_name", MATCH_NAME_GLOB),
                    condition("gatekeeper_internal_match_kinds", MATCH_KINDS),
                ],
                validations: vec![v1alpha1::Validation {
                    expression: "1 == 1".to_string(),
                    message: "some fallback message".to_string(),
                    message_expression: r#""some CEL string""#.to_string(),
                }],
                failure_policy: Some(FailurePolicyType::Fail),
                variables: vec![
                    Variable {
                        name: "my_variable".to_string(),
                        expression: "true".to_string(),
                    },
                    Variable {
                        name: "params".to_string(),
                        expression: "!has(params.spec) ? null : !has(params.spec.parameters) ? null: params.spec.parameters".to_string(),
                    },
                ],
            },
        };
        assert_eq!(policy, expected);
    }

    #[test]
    fn synthesized_conditions_are_recognized() {
        let policy =
            template_to_policy_definition(&template_for("SomePolicy", &some_policy_source()))
                .unwrap();
        let synthesized: Vec<bool> = policy
            .spec
            .match_conditions
            .iter()
            .map(is_synthesized)
            .collect();
        assert_eq!(synthesized, vec![false, true, true, true, true]);
        assert!(!is_synthesized(&condition(
            "gatekeeper_internal_match_kinds",
            "true"
        )));
    }

    #[test]
    fn empty_source_still_gets_synthesized_entries() {
        let policy =
            template_to_policy_definition(&template_for("Empty", &Source::default())).unwrap();
        assert_eq!(
            names(&policy.spec.match_conditions),
            vec![
                "gatekeeper_internal_match_excluded_namespaces",
                "gatekeeper_internal_match_namespaces",
                "gatekeeper_internal_match_name",
                "gatekeeper_internal_match_kinds",
            ]
        );
        assert_eq!(names(&policy.spec.variables), vec!["params"]);
        assert!(policy.spec.validations.is_empty());
        assert!(policy.spec.failure_policy.is_none());
    }

    #[test]
    fn user_order_is_preserved() {
        let mut source = some_policy_source();
        source.match_conditions.insert(
            0,
            SourceMatchCondition {
                name: "zzz".to_string(),
                expression: "false".to_string(),
            },
        );
        source.variables.push(SourceVariable {
            name: "aaa".to_string(),
            expression: "variables.my_variable".to_string(),
        });
        let policy = template_to_policy_definition(&template_for("SomePolicy", &source)).unwrap();
        assert_eq!(&names(&policy.spec.match_conditions)[..2], &["zzz", "must_match_something"]);
        assert_eq!(
            names(&policy.spec.variables),
            vec!["my_variable", "aaa", "params"]
        );
    }

    #[test]
    fn invalid_match_condition() {
        let mut source = some_policy_source();
        source.match_conditions[0].name = "gatekeeper_internal_match_something".to_string();
        assert_eq!(
            template_to_policy_definition(&template_for("SomePolicy", &source)),
            Err(TransformError::Schema(SchemaError::BadMatchCondition {
                name: "gatekeeper_internal_match_something".to_string()
            }))
        );
    }

    #[test]
    fn invalid_variable() {
        let mut source = some_policy_source();
        source.variables[0].name = "gatekeeper_internal_my_variable".to_string();
        assert!(matches!(
            template_to_policy_definition(&template_for("SomePolicy", &source)),
            Err(TransformError::Schema(SchemaError::BadVariable { .. }))
        ));
    }

    #[test]
    fn no_clobbering_params() {
        let mut source = some_policy_source();
        source.variables[0].name = "params".to_string();
        assert_eq!(
            template_to_policy_definition(&template_for("SomePolicy", &source)),
            Err(TransformError::Schema(SchemaError::BadVariable {
                name: "params".to_string()
            }))
        );
    }

    #[test]
    fn bad_failure_policy() {
        let mut source = some_policy_source();
        source.failure_policy = Some("Sometimes".to_string());
        assert_eq!(
            template_to_policy_definition(&template_for("SomePolicy", &source)),
            Err(TransformError::Schema(SchemaError::BadFailurePolicy {
                value: "Sometimes".to_string()
            }))
        );
    }

    #[test]
    fn structural_template_errors() {
        let mut template = template_for("SomePolicy", &some_policy_source());
        template.spec.targets[0].code[0].engine = "Rego".to_string();
        assert!(matches!(
            template_to_policy_definition(&template),
            Err(TransformError::EngineNotFound { .. })
        ));
        template.spec.targets.clear();
        assert_eq!(
            template_to_policy_definition(&template),
            Err(TransformError::WrongTargetCount { count: 0 })
        );
    }

    #[test]
    fn policy_serializes_as_manifest() {
        let policy =
            template_to_policy_definition(&template_for("SomePolicy", &some_policy_source()))
                .unwrap();
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["apiVersion"], "admissionregistration.k8s.io/v1alpha1");
        assert_eq!(value["kind"], "ValidatingAdmissionPolicy");
        assert_eq!(value["metadata"]["name"], "gatekeeper-somepolicy");
        assert_eq!(value["spec"]["failurePolicy"], "Fail");
        assert_eq!(value["spec"]["paramKind"]["kind"], "SomePolicy");
        assert_eq!(
            value["spec"]["matchConstraints"]["resourceRules"][0],
            serde_json::json!({
                "operations": ["*"],
                "apiGroups": ["*"],
                "apiVersions": ["*"],
                "resources": ["*"]
            })
        );
        assert_eq!(value["spec"]["variables"][1]["name"], "params");
        let decoded: ValidatingAdmissionPolicy = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, policy);
    }

    #[test]
    fn policy_name_lowercases_kind() {
        assert_eq!(policy_name("SomePolicy"), "gatekeeper-somepolicy");
        assert_eq!(policy_name("FooTemplate"), "gatekeeper-footemplate");
        assert_eq!(policy_name("FOOTEMPLATE"), policy_name("footemplate"));
        assert_eq!(binding_name("Foo-Name"), "gatekeeper-Foo-Name");
    }

    fn constraint(
        enforcement_action: Option<&str>,
        namespace_selector: Option<LabelSelector>,
        label_selector: Option<LabelSelector>,
    ) -> Constraint {
        let mut constraint = Constraint::new("FooTemplate", "foo-name");
        constraint.spec.enforcement_action = enforcement_action.map(str::to_string);
        if namespace_selector.is_some() || label_selector.is_some() {
            constraint.spec.r#match = Some(crate::Match {
                namespace_selector,
                label_selector,
            });
        }
        constraint
    }

    fn expected_binding(
        match_resources: MatchResources,
        action: ValidationAction,
    ) -> ValidatingAdmissionPolicyBinding {
        ValidatingAdmissionPolicyBinding {
            api_version: "admissionregistration.k8s.io/v1alpha1".to_string(),
            kind: "ValidatingAdmissionPolicyBinding".to_string(),
            metadata: ObjectMeta::named("gatekeeper-foo-name"),
            spec: ValidatingAdmissionPolicyBindingSpec {
                policy_name: "gatekeeper-footemplate".to_string(),
                param_ref: Some(ParamRef {
                    name: "foo-name".to_string(),
                    parameter_not_found_action: Some(ParameterNotFoundActionType::Allow),
                }),
                match_resources: Some(match_resources),
                validation_actions: vec![action],
            },
        }
    }

    #[test]
    fn empty_constraint() {
        assert_eq!(
            constraint_to_binding(&constraint(None, None, None)),
            Ok(expected_binding(
                MatchResources::default(),
                ValidationAction::Deny
            ))
        );
    }

    #[test]
    fn with_object_selector() {
        let selector = LabelSelector::from_labels([("match", "yes")]);
        assert_eq!(
            constraint_to_binding(&constraint(None, None, Some(selector.clone()))),
            Ok(expected_binding(
                MatchResources {
                    object_selector: Some(selector),
                    ..MatchResources::default()
                },
                ValidationAction::Deny
            ))
        );
    }

    #[test]
    fn with_namespace_selector() {
        let selector = LabelSelector::from_labels([("match", "yes")]);
        assert_eq!(
            constraint_to_binding(&constraint(None, Some(selector.clone()), None)),
            Ok(expected_binding(
                MatchResources {
                    namespace_selector: Some(selector),
                    ..MatchResources::default()
                },
                ValidationAction::Deny
            ))
        );
    }

    #[test]
    fn with_both_selectors() {
        let ns = LabelSelector::from_labels([("matchNS", "yes")]);
        let obj = LabelSelector::from_labels([("match", "yes")]);
        assert_eq!(
            constraint_to_binding(&constraint(None, Some(ns.clone()), Some(obj.clone()))),
            Ok(expected_binding(
                MatchResources {
                    namespace_selector: Some(ns),
                    object_selector: Some(obj),
                    ..MatchResources::default()
                },
                ValidationAction::Deny
            ))
        );
    }

    #[test]
    fn with_explicit_deny() {
        assert_eq!(
            constraint_to_binding(&constraint(Some("deny"), None, None)),
            Ok(expected_binding(
                MatchResources::default(),
                ValidationAction::Deny
            ))
        );
    }

    #[test]
    fn with_warn() {
        assert_eq!(
            constraint_to_binding(&constraint(Some("warn"), None, None)),
            Ok(expected_binding(
                MatchResources::default(),
                ValidationAction::Warn
            ))
        );
    }

    #[test]
    fn unrecognized_enforcement_action() {
        assert_eq!(
            constraint_to_binding(&constraint(Some("magicunicorns"), None, None)),
            Err(TransformError::BadEnforcementAction {
                action: "magicunicorns".to_string()
            })
        );
    }

    #[test]
    fn empty_enforcement_action_is_not_deny() {
        assert_eq!(
            constraint_to_binding(&constraint(Some(""), None, None)),
            Err(TransformError::BadEnforcementAction {
                action: String::new()
            })
        );
    }

    #[test]
    fn binding_references_compiled_policy() {
        let template = template_for("FooTemplate", &some_policy_source());
        let policy = template_to_policy_definition(&template).unwrap();
        let binding = constraint_to_binding(&constraint(None, None, None)).unwrap();
        assert_eq!(binding.spec.policy_name, policy.metadata.name);
        assert_eq!(
            binding.spec.param_ref.as_ref().map(|p| p.name.as_str()),
            Some("foo-name")
        );
    }

    #[test]
    fn binding_serializes_empty_match_resources() {
        let binding = constraint_to_binding(&constraint(None, None, None)).unwrap();
        let value = serde_json::to_value(&binding).unwrap();
        assert_eq!(
            value["spec"],
            serde_json::json!({
                "policyName": "gatekeeper-footemplate",
                "paramRef": {"name": "foo-name", "parameterNotFoundAction": "Allow"},
                "matchResources": {},
                "validationActions": ["Deny"]
            })
        );
    }
}
