//! First-match-wins policy selection

use tracing::debug;

use crate::api::AutoscalingPolicy;
use crate::env::Environment;
use crate::error::Error;
use crate::expr::ExpressionEngine;

/// The policy selected for this pass, with its position in the list
#[derive(Debug, Clone, Copy)]
pub struct MatchedPolicy<'a> {
    pub index: usize,
    pub policy: &'a AutoscalingPolicy,
}

/// Scan the ordered policy list and return the first policy whose condition
/// is absent/empty (literal true) or evaluates to `true`.
///
/// The scan is strictly sequential and stops at the first match: later
/// conditions are never compiled or evaluated, even if they would fail.
/// Compile faults, runtime faults and non-boolean results are fatal; an
/// exhausted list is [`Error::NoMatch`], which is distinct from matching a
/// policy whose `skip` flag is set.
pub fn first_match<'a, E: ExpressionEngine>(
    engine: &E,
    policies: &'a [AutoscalingPolicy],
    env: &Environment,
) -> Result<MatchedPolicy<'a>, Error> {
    for (index, policy) in policies.iter().enumerate() {
        let condition = policy.condition.as_deref().unwrap_or("");
        debug!(index, condition, "checking policy");

        if condition.is_empty() {
            return Ok(MatchedPolicy { index, policy });
        }

        let program = engine
            .compile(condition)
            .map_err(|source| Error::Policy { index, source })?;
        if engine
            .evaluate(&program, env)
            .map_err(|source| Error::Policy { index, source })?
        {
            return Ok(MatchedPolicy { index, policy });
        }
    }

    Err(Error::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprError, PredicateEngine};
    use serde_json::json;

    fn policy(condition: Option<&str>) -> AutoscalingPolicy {
        AutoscalingPolicy {
            condition: condition.map(Into::into),
            ..Default::default()
        }
    }

    fn env() -> Environment {
        Environment::empty().bind("target", json!({"spec": {"replicas": 2}}))
    }

    #[test]
    fn test_empty_condition_is_literal_true() {
        let policies = vec![policy(None)];
        let matched = first_match(&PredicateEngine, &policies, &env()).unwrap();
        assert_eq!(matched.index, 0);

        let policies = vec![policy(Some(""))];
        let matched = first_match(&PredicateEngine, &policies, &env()).unwrap();
        assert_eq!(matched.index, 0);
    }

    #[test]
    fn test_first_match_wins() {
        let policies = vec![
            policy(Some("false")),
            policy(Some("target.spec.replicas == 2")),
            policy(Some("true")),
        ];
        let matched = first_match(&PredicateEngine, &policies, &env()).unwrap();
        assert_eq!(matched.index, 1);
    }

    #[test]
    fn test_later_conditions_never_evaluated() {
        // The third condition cannot even compile; matching must stop at the
        // second policy before reaching it.
        let policies = vec![
            policy(Some("false")),
            policy(Some("true")),
            policy(Some("this is not ( an expression")),
        ];
        let matched = first_match(&PredicateEngine, &policies, &env()).unwrap();
        assert_eq!(matched.index, 1);
    }

    #[test]
    fn test_no_match_is_distinct_error() {
        let policies = vec![policy(Some("false")), policy(Some("1 == 2"))];
        let err = first_match(&PredicateEngine, &policies, &env()).unwrap_err();
        assert!(matches!(err, Error::NoMatch));
    }

    #[test]
    fn test_compile_fault_is_fatal_with_index() {
        let policies = vec![policy(Some("false")), policy(Some("1 +"))];
        match first_match(&PredicateEngine, &policies, &env()) {
            Err(Error::Policy {
                index,
                source: ExprError::Compile { .. },
            }) => assert_eq!(index, 1),
            other => panic!("expected compile fault, got {other:?}"),
        }
    }

    #[test]
    fn test_non_boolean_condition_is_fatal() {
        let policies = vec![policy(Some("target.spec.replicas"))];
        match first_match(&PredicateEngine, &policies, &env()) {
            Err(Error::Policy {
                index: 0,
                source: ExprError::NonBoolean { actual },
            }) => assert_eq!(actual, "number"),
            other => panic!("expected NonBoolean fault, got {other:?}"),
        }
    }

    #[test]
    fn test_runtime_fault_is_fatal() {
        let policies = vec![policy(Some("unknown.field == 1"))];
        match first_match(&PredicateEngine, &policies, &env()) {
            Err(Error::Policy {
                index: 0,
                source: ExprError::Eval(_),
            }) => {}
            other => panic!("expected eval fault, got {other:?}"),
        }
    }
}
