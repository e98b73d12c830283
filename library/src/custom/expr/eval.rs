//! Execution of compiled statements over a numeric scope.

use std::collections::HashMap;

use crate::error::GraphError;

use super::parser::{BinaryOp, Expr, Statement, UnaryOp};

pub(super) fn run_statements(
    statements: &[Statement],
    scope: &HashMap<String, f64>,
) -> Result<Vec<(Option<String>, f64)>, GraphError> {
    let mut locals: HashMap<String, f64> = HashMap::new();
    let mut results = Vec::with_capacity(statements.len());

    for statement in statements {
        let value = eval_expr(&statement.expr, scope, &locals)?;
        if let Some(name) = &statement.target {
            locals.insert(name.clone(), value);
        }
        results.push((statement.target.clone(), value));
    }

    Ok(results)
}

fn eval_expr(
    expr: &Expr,
    scope: &HashMap<String, f64>,
    locals: &HashMap<String, f64>,
) -> Result<f64, GraphError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(name) => lookup(name, scope, locals),
        Expr::Unary(op, operand) => {
            let value = eval_expr(operand, scope, locals)?;
            Ok(match op {
                UnaryOp::Negate => -value,
                UnaryOp::Not => bool_value(value == 0.0),
            })
        }
        // Logical operators short-circuit, so names on the untaken side
        // are never resolved.
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = eval_expr(left, scope, locals)?;
            if left == 0.0 {
                Ok(left)
            } else {
                eval_expr(right, scope, locals)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = eval_expr(left, scope, locals)?;
            if left != 0.0 {
                Ok(left)
            } else {
                eval_expr(right, scope, locals)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval_expr(left, scope, locals)?;
            let right = eval_expr(right, scope, locals)?;
            Ok(apply_binary(*op, left, right))
        }
        Expr::Ternary(condition, then_branch, else_branch) => {
            if eval_expr(condition, scope, locals)? != 0.0 {
                eval_expr(then_branch, scope, locals)
            } else {
                eval_expr(else_branch, scope, locals)
            }
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, scope, locals)?);
            }
            call_function(name, &values)
        }
    }
}

fn apply_binary(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Subtract => left - right,
        BinaryOp::Multiply => left * right,
        BinaryOp::Divide => left / right,
        BinaryOp::Modulo => left % right,
        BinaryOp::Equal => bool_value(left == right),
        BinaryOp::NotEqual => bool_value(left != right),
        BinaryOp::Less => bool_value(left < right),
        BinaryOp::LessEqual => bool_value(left <= right),
        BinaryOp::Greater => bool_value(left > right),
        BinaryOp::GreaterEqual => bool_value(left >= right),
        BinaryOp::And => {
            if left == 0.0 {
                left
            } else {
                right
            }
        }
        BinaryOp::Or => {
            if left != 0.0 {
                left
            } else {
                right
            }
        }
    }
}

fn bool_value(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn lookup(
    name: &str,
    scope: &HashMap<String, f64>,
    locals: &HashMap<String, f64>,
) -> Result<f64, GraphError> {
    if let Some(value) = locals.get(name) {
        return Ok(*value);
    }
    if let Some(value) = scope.get(name) {
        return Ok(*value);
    }
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "tau" => Ok(std::f64::consts::TAU),
        "e" => Ok(std::f64::consts::E),
        _ => Err(GraphError::evaluation(format!(
            "Unknown identifier '{}'",
            name
        ))),
    }
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, GraphError> {
    let expect = |count: usize| -> Result<(), GraphError> {
        if args.len() == count {
            Ok(())
        } else {
            Err(GraphError::evaluation(format!(
                "Function '{}' expects {} argument(s), got {}",
                name,
                count,
                args.len()
            )))
        }
    };

    match name {
        "abs" => {
            expect(1)?;
            Ok(args[0].abs())
        }
        "floor" => {
            expect(1)?;
            Ok(args[0].floor())
        }
        "ceil" => {
            expect(1)?;
            Ok(args[0].ceil())
        }
        "round" => {
            expect(1)?;
            Ok(args[0].round())
        }
        "sqrt" => {
            expect(1)?;
            Ok(args[0].sqrt())
        }
        "exp" => {
            expect(1)?;
            Ok(args[0].exp())
        }
        "log" => {
            expect(1)?;
            Ok(args[0].ln())
        }
        "sin" => {
            expect(1)?;
            Ok(args[0].sin())
        }
        "cos" => {
            expect(1)?;
            Ok(args[0].cos())
        }
        "tan" => {
            expect(1)?;
            Ok(args[0].tan())
        }
        "sign" => {
            expect(1)?;
            // signum(0.0) is 1.0; zero must stay zero here.
            Ok(if args[0] == 0.0 { 0.0 } else { args[0].signum() })
        }
        "atan2" => {
            expect(2)?;
            Ok(args[0].atan2(args[1]))
        }
        "pow" => {
            expect(2)?;
            Ok(args[0].powf(args[1]))
        }
        "min" => {
            if args.is_empty() {
                return Err(GraphError::evaluation(
                    "Function 'min' expects at least 1 argument, got 0",
                ));
            }
            Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
        }
        "max" => {
            if args.is_empty() {
                return Err(GraphError::evaluation(
                    "Function 'max' expects at least 1 argument, got 0",
                ));
            }
            Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        }
        "clamp" => {
            expect(3)?;
            Ok(args[0].max(args[1]).min(args[2]))
        }
        _ => Err(GraphError::evaluation(format!(
            "Unknown function '{}'",
            name
        ))),
    }
}
