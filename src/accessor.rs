//! Uniform access to the expressions of every expression category and target flavor.
//!
//! Sources, the stable [`crate::v1`] types and the experimental [`crate::v1alpha1`] types all
//! carry CEL expressions, some of them named.  The traits here let the compiler treat them alike.

use crate::{v1, v1alpha1, PARAMS_NAME, RESERVED_PREFIX};

/// Anything that carries a single CEL expression.
pub trait ExpressionAccessor {
    /// The CEL expression.
    fn expression(&self) -> &str;
}

/// A CEL expression with an identifier that must be unique among its siblings.
pub trait NamedExpressionAccessor: ExpressionAccessor {
    /// The identifier of the expression.
    fn name(&self) -> &str;
}

/// Returns true if `name` is one the compiler reserves for the expressions it synthesizes.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Returns the first expression whose name carries the reserved prefix.
pub fn first_reserved<T: NamedExpressionAccessor>(exprs: &[T]) -> Option<&T> {
    exprs.iter().find(|e| is_reserved_name(e.name()))
}

/// Returns the first expression whose name is reserved or equal to [`PARAMS_NAME`].
pub fn first_reserved_or_params<T: NamedExpressionAccessor>(exprs: &[T]) -> Option<&T> {
    exprs
        .iter()
        .find(|e| is_reserved_name(e.name()) || e.name() == PARAMS_NAME)
}

/// Returns the names of `exprs` in order.
pub fn names<T: NamedExpressionAccessor>(exprs: &[T]) -> Vec<&str> {
    exprs.iter().map(|e| e.name()).collect()
}

//////////////////////////////////// MessageExpressionCondition ////////////////////////////////////

/// The message expression of a validation, compiled separately from its validation expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageExpressionCondition {
    /// CEL expression computing the message reported on violation.
    pub message_expression: String,
}

impl ExpressionAccessor for MessageExpressionCondition {
    fn expression(&self) -> &str {
        &self.message_expression
    }
}

////////////////////////////////////////// Target flavors //////////////////////////////////////////

macro_rules! named_expression {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ExpressionAccessor for $ty {
                fn expression(&self) -> &str {
                    &self.expression
                }
            }

            impl NamedExpressionAccessor for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

named_expression!(
    v1::MatchCondition,
    v1::Variable,
    v1alpha1::MatchCondition,
    v1alpha1::Variable,
);

impl ExpressionAccessor for v1::Validation {
    fn expression(&self) -> &str {
        &self.expression
    }
}

impl ExpressionAccessor for v1alpha1::Validation {
    fn expression(&self) -> &str {
        &self.expression
    }
}
