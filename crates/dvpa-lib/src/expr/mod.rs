//! Condition expression engine
//!
//! Policy conditions are boolean expressions over the `target`, `vpa` and
//! `obj` bindings of an [`Environment`]. The engine is a narrow
//! compile/evaluate interface so the dialect can be swapped without touching
//! the reconciler.
//!
//! The default dialect supports literals (`null`, booleans, numbers,
//! strings), field access (`target.spec.replicas`), indexing
//! (`obj.spec.policies[0]`), `!`, arithmetic, comparisons, equality and
//! short-circuit `&&`/`||`. Missing fields read as `null`; boolean operators
//! and comparisons never coerce.

mod eval;
mod parser;

use thiserror::Error;

use crate::env::Environment;

/// Failure modes of condition handling, all fatal for the pass
#[derive(Debug, Error)]
pub enum ExprError {
    /// The condition text does not parse.
    #[error("compile error at offset {offset}: {message}")]
    Compile { offset: usize, message: String },

    /// The condition parsed but raised a fault while evaluating.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// The condition evaluated to something other than a boolean. There is
    /// no truthiness coercion.
    #[error("condition evaluated to {actual}, expected a boolean")]
    NonBoolean { actual: &'static str },
}

/// Two-operation interface between the policy matcher and the dialect
pub trait ExpressionEngine {
    type Program;

    /// Compile condition text into a reusable program.
    fn compile(&self, source: &str) -> Result<Self::Program, ExprError>;

    /// Evaluate a compiled program against an environment, checking that the
    /// result is a boolean.
    fn evaluate(&self, program: &Self::Program, env: &Environment) -> Result<bool, ExprError>;
}

/// A compiled condition
#[derive(Debug, Clone)]
pub struct Program {
    expr: parser::Expr,
}

/// Default engine for the built-in dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateEngine;

impl ExpressionEngine for PredicateEngine {
    type Program = Program;

    fn compile(&self, source: &str) -> Result<Program, ExprError> {
        Ok(Program {
            expr: parser::parse(source)?,
        })
    }

    fn evaluate(&self, program: &Program, env: &Environment) -> Result<bool, ExprError> {
        match eval::eval(&program.expr, env)? {
            serde_json::Value::Bool(b) => Ok(b),
            other => Err(ExprError::NonBoolean {
                actual: eval::value_kind(&other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> Environment {
        Environment::empty().bind("target", json!({"spec": {"replicas": 2}}))
    }

    #[test]
    fn test_compile_and_evaluate() {
        let engine = PredicateEngine;
        let program = engine.compile("target.spec.replicas == 2").unwrap();
        assert!(engine.evaluate(&program, &env()).unwrap());

        let program = engine.compile("target.spec.replicas > 2").unwrap();
        assert!(!engine.evaluate(&program, &env()).unwrap());
    }

    #[test]
    fn test_compile_error() {
        let err = PredicateEngine.compile("replicas >").unwrap_err();
        assert!(matches!(err, ExprError::Compile { .. }));
    }

    #[test]
    fn test_non_boolean_result_is_checked() {
        let engine = PredicateEngine;
        let program = engine.compile("target.spec.replicas").unwrap();
        match engine.evaluate(&program, &env()) {
            Err(ExprError::NonBoolean { actual }) => assert_eq!(actual, "number"),
            other => panic!("expected NonBoolean, got {other:?}"),
        }
    }

    #[test]
    fn test_program_is_reusable() {
        let engine = PredicateEngine;
        let program = engine.compile("target.spec.replicas >= 1").unwrap();
        for _ in 0..3 {
            assert!(engine.evaluate(&program, &env()).unwrap());
        }
    }
}
