//! The expression language custom node bodies are written in.
//!
//! A body is a sequence of statements separated by `;` or newlines:
//!
//! ```text
//! // doubled, then kept in range
//! scaled = input * 2
//! result = clamp(scaled, 0, 10)
//! ```
//!
//! Statements assign `name = expression`; a bare expression carries no
//! target and is assigned to the node's first output by the caller. All
//! values are numeric. Comparisons yield 0 or 1, `&&`/`||` short-circuit
//! to the deciding operand, `cond ? a : b` picks a branch, and `//` starts
//! a line comment. Identifiers resolve at run time: earlier assignments
//! first, then the caller's scope, then the constants `pi`, `tau`, `e`.
//! A name that resolves nowhere is an evaluation error, not a compile
//! error.

mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

use crate::error::GraphError;

use parser::Statement;

/// Lexer or parser failure, pointing at the offending token.
#[derive(Debug, Clone)]
pub(crate) struct CompileError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl CompileError {
    fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// A compiled custom node body, ready to run against a scope.
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Compile source text into a runnable program.
    pub fn compile(source: &str) -> Result<Self, GraphError> {
        let tokens = lexer::tokenize(source).map_err(|e| GraphError::compilation(e.to_string()))?;
        let statements = parser::parse(tokens).map_err(|e| GraphError::compilation(e.to_string()))?;
        Ok(Self { statements })
    }

    /// Run every statement in order against the scope. Returns each
    /// statement's target name and value; callers decide which targets
    /// correspond to outputs.
    pub fn run(&self, scope: &HashMap<String, f64>) -> Result<Vec<(Option<String>, f64)>, GraphError> {
        eval::run_statements(&self.statements, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_single(source: &str, scope: &[(&str, f64)]) -> f64 {
        let program = Program::compile(source).expect("compile");
        let scope: HashMap<String, f64> =
            scope.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let results = program.run(&scope).expect("run");
        results.last().expect("at least one statement").1
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run_single("1 + 2 * 3", &[]), 7.0);
        assert_eq!(run_single("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(run_single("10 % 4", &[]), 2.0);
        assert_eq!(run_single("-2 * 3", &[]), -6.0);
    }

    #[test]
    fn test_comparisons_and_ternary() {
        assert_eq!(run_single("3 > 2 ? 10 : 20", &[]), 10.0);
        assert_eq!(run_single("3 < 2 ? 10 : 20", &[]), 20.0);
        assert_eq!(run_single("1 == 1", &[]), 1.0);
        assert_eq!(run_single("1 != 1", &[]), 0.0);
        assert_eq!(run_single("!0", &[]), 1.0);
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        // The right side names nothing resolvable, so it must not run.
        assert_eq!(run_single("0 && missing", &[]), 0.0);
        assert_eq!(run_single("5 || missing", &[]), 5.0);
        assert_eq!(run_single("2 && 3", &[]), 3.0);
        assert_eq!(run_single("0 || 7", &[]), 7.0);
    }

    #[test]
    fn test_scope_and_locals() {
        assert_eq!(run_single("input * 2", &[("input", 5.0)]), 10.0);
        assert_eq!(run_single("t = input + 1; t * t", &[("input", 2.0)]), 9.0);
    }

    #[test]
    fn test_constants() {
        assert_eq!(run_single("tau / 2", &[]), std::f64::consts::PI);
        assert!((run_single("log(e)", &[]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_functions() {
        assert_eq!(run_single("abs(-4)", &[]), 4.0);
        assert_eq!(run_single("min(3, 1, 2)", &[]), 1.0);
        assert_eq!(run_single("max(3, 1, 2)", &[]), 3.0);
        assert_eq!(run_single("clamp(5, 0, 1)", &[]), 1.0);
        assert_eq!(run_single("pow(2, 10)", &[]), 1024.0);
        assert_eq!(run_single("sign(-3)", &[]), -1.0);
        assert_eq!(run_single("sign(0)", &[]), 0.0);
    }

    #[test]
    fn test_statement_targets_are_reported() {
        let program = Program::compile("a = 1\nb = a + 1\nb * 10").expect("compile");
        let results = program.run(&HashMap::new()).expect("run");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], (Some("a".to_string()), 1.0));
        assert_eq!(results[1], (Some("b".to_string()), 2.0));
        assert_eq!(results[2], (None, 20.0));
    }

    #[test]
    fn test_unknown_identifier_is_an_evaluation_error() {
        let program = Program::compile("nope + 1").expect("compile");
        let err = program.run(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("Unknown identifier 'nope'"));
    }

    #[test]
    fn test_unknown_function_and_arity_errors() {
        let program = Program::compile("frobnicate(1)").expect("compile");
        let err = program.run(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("Unknown function 'frobnicate'"));

        let program = Program::compile("pow(2)").expect("compile");
        let err = program.run(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("expects 2 argument(s), got 1"));
    }

    #[test]
    fn test_compile_error_reports_position() {
        let err = Program::compile("a = 1\nb = = 2").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 2"), "got: {}", message);
    }
}
