use std::io::Write;

use regex::Regex;

use crate::{
    ast::{BinOp, Expr, UnOp},
    error::EvalError,
    interpreter::{
        env::Environment,
        evaluator::{EvalResult, Interpreter},
        value::Object,
    },
    source::Pos,
};

impl<Out: Write, ErrOut: Write> Interpreter<Out, ErrOut> {
    /// Evaluates a binary operation.
    ///
    /// `==`/`!=` compare the primitive projections of both sides. `~~`
    /// compiles the right operand's rendered string as a regex and matches
    /// it against the left operand's rendered string; `!~` is its
    /// negation. The arithmetic and ordering operators work on numbers,
    /// promoting integers to floats when the sides are mixed.
    pub(crate) fn eval_binary(&mut self,
                              op: BinOp,
                              x: &Expr,
                              y: &Expr,
                              env: &Environment,
                              pos: Pos)
                              -> EvalResult<Object> {
        let lhs = self.expect_value(x, env)?;
        let rhs = self.expect_value(y, env)?;

        match op {
            BinOp::Eql => Ok(Object::Boolean(lhs.loosely_equals(&rhs))),
            BinOp::Neq => Ok(Object::Boolean(!lhs.loosely_equals(&rhs))),
            BinOp::Reg => self.eval_regex_match(&lhs, &rhs, x, y).map(Object::Boolean),
            BinOp::Nreg => {
                self.eval_regex_match(&lhs, &rhs, x, y)
                    .map(|matched| Object::Boolean(!matched))
            },
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Quo | BinOp::Rem => {
                arithmetic(op, &lhs, &rhs, pos)
            },
            BinOp::Lss | BinOp::Gtr | BinOp::Leq | BinOp::Geq => {
                let (a, b) = numeric_pair(&lhs, &rhs, pos)?;
                let result = match op {
                    BinOp::Lss => a < b,
                    BinOp::Gtr => a > b,
                    BinOp::Leq => a <= b,
                    _ => a >= b,
                };
                Ok(Object::Boolean(result))
            },
        }
    }

    fn eval_regex_match(&self,
                        lhs: &Object,
                        rhs: &Object,
                        x: &Expr,
                        y: &Expr)
                        -> EvalResult<bool> {
        let text = rendered_of(lhs).ok_or_else(|| EvalError::TypeMismatch {
                           details: format!("left side of a regex match must be a string, got {}",
                                            lhs.type_name()),
                           pos:     x.pos(),
                       })?;
        let pattern = rendered_of(rhs).ok_or_else(|| EvalError::TypeMismatch {
                              details: format!("regex pattern must be a string, got {}",
                                               rhs.type_name()),
                              pos:     y.pos(),
                          })?;
        let re = Regex::new(pattern).map_err(|_| EvalError::BadRegex { pattern:
                                                                           pattern.to_string(),
                                                                       pos: y.pos(), })?;
        Ok(re.is_match(text))
    }

    /// Evaluates a unary operation: numeric sign or boolean negation.
    pub(crate) fn eval_unary(&mut self,
                             op: UnOp,
                             x: &Expr,
                             env: &Environment,
                             pos: Pos)
                             -> EvalResult<Object> {
        let value = self.expect_value(x, env)?;
        match (op, &value) {
            (UnOp::Pos, Object::Integer(_) | Object::Float(_)) => Ok(value),
            (UnOp::Neg, Object::Integer(v)) => Ok(Object::Integer(-v)),
            (UnOp::Neg, Object::Float(v)) => Ok(Object::Float(-v)),
            (UnOp::Not, Object::Boolean(v)) => Ok(Object::Boolean(!v)),
            _ => Err(EvalError::TypeMismatch { details: format!("cannot apply {op} to {}",
                                                                value.type_name()),
                                               pos }),
        }
    }

    pub(crate) fn expect_value(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Object> {
        let value = self.eval_expr(expr, env)?;
        value.ok_or_else(|| EvalError::TypeMismatch { details: "expression has no value"
                                                                   .to_string(),
                                                      pos:     expr.pos(), })
    }
}

fn rendered_of(obj: &Object) -> Option<&str> {
    match obj {
        Object::Str { rendered, .. } => Some(rendered),
        _ => None,
    }
}

fn arithmetic(op: BinOp, lhs: &Object, rhs: &Object, pos: Pos) -> EvalResult<Object> {
    match (lhs, rhs) {
        (Object::Integer(a), Object::Integer(b)) => int_arithmetic(op, *a, *b, pos),
        (Object::Float(_) | Object::Integer(_), Object::Float(_) | Object::Integer(_)) => {
            let (a, b) = numeric_pair(lhs, rhs, pos)?;
            float_arithmetic(op, a, b, pos)
        },
        _ => Err(EvalError::TypeMismatch { details: format!("cannot apply {op} to {} and {}",
                                                            lhs.type_name(),
                                                            rhs.type_name()),
                                           pos }),
    }
}

fn int_arithmetic(op: BinOp, a: i64, b: i64, pos: Pos) -> EvalResult<Object> {
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Quo | BinOp::Rem => {
            if b == 0 {
                return Err(EvalError::DivisionByZero { pos });
            }
            if op == BinOp::Quo {
                a.wrapping_div(b)
            } else {
                a.wrapping_rem(b)
            }
        },
        _ => unreachable!("not an arithmetic operator"),
    };
    Ok(Object::Integer(result))
}

fn float_arithmetic(op: BinOp, a: f64, b: f64, pos: Pos) -> EvalResult<Object> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Quo => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero { pos });
            }
            a / b
        },
        BinOp::Rem => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero { pos });
            }
            a % b
        },
        _ => unreachable!("not an arithmetic operator"),
    };
    Ok(Object::Float(result))
}

fn numeric_pair(lhs: &Object, rhs: &Object, pos: Pos) -> EvalResult<(f64, f64)> {
    let to_f64 = |obj: &Object| match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Float(v) => Some(*v),
        _ => None,
    };
    match (to_f64(lhs), to_f64(rhs)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::TypeMismatch { details: format!("expected numbers, got {} and {}",
                                                            lhs.type_name(),
                                                            rhs.type_name()),
                                           pos }),
    }
}
