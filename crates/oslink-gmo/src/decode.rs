//! Instruction tape decoder.
//!
//! Replays a postfix tape against an expression stack and returns the single
//! tree the tape reduces to. Opcodes and functions outside the supported set
//! fail with their code and tape position; a tape that underflows the stack
//! or leaves more than one expression on it is malformed.
//!
//! Address fields are stored one-based and shifted here. The one exception
//! is the function code on a call instruction, which already rides the field
//! without the address bias.

use crate::instr::{FuncCode, Instr, OpCode, Tape};
use oslink_core::{Expr, OslinkError, OslinkResult};

/// Decodes one row's tape into an expression tree.
///
/// `constants` is the model's constant pool; `num_vars` bounds the variable
/// indexes a push may reference.
pub fn decode(tape: &Tape, constants: &[f64], num_vars: usize) -> OslinkResult<Expr> {
    let mut stack: Vec<Expr> = Vec::new();
    let mut pending_args: Option<usize> = None;

    for (pos, &instr) in tape.instrs().iter().enumerate() {
        let op = OpCode::from_code(instr.opcode).ok_or(OslinkError::UnsupportedOpcode {
            opcode: instr.opcode,
            position: pos,
        })?;
        match op {
            OpCode::NoOp | OpCode::Store | OpCode::Header => {}
            OpCode::PushV => {
                stack.push(Expr::var(var_index(instr, op, pos, num_vars)?));
            }
            OpCode::PushI => {
                stack.push(Expr::Number(constant(instr, op, pos, constants)?));
            }
            OpCode::PushZero => {
                stack.push(Expr::Number(0.0));
            }
            OpCode::Add => {
                let right = pop(&mut stack, op, pos)?;
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::plus(left, right));
            }
            OpCode::Sub => {
                let right = pop(&mut stack, op, pos)?;
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::minus(left, right));
            }
            OpCode::Mul => {
                let right = pop(&mut stack, op, pos)?;
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::times(left, right));
            }
            OpCode::Div => {
                let right = pop(&mut stack, op, pos)?;
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::divide(left, right));
            }
            OpCode::AddV => {
                let var = Expr::var(var_index(instr, op, pos, num_vars)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::plus(left, var));
            }
            OpCode::SubV => {
                let var = Expr::var(var_index(instr, op, pos, num_vars)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::minus(left, var));
            }
            OpCode::MulV => {
                let var = Expr::var(var_index(instr, op, pos, num_vars)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::times(left, var));
            }
            OpCode::DivV => {
                let var = Expr::var(var_index(instr, op, pos, num_vars)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::divide(left, var));
            }
            OpCode::AddI => {
                let number = Expr::Number(constant(instr, op, pos, constants)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::plus(left, number));
            }
            OpCode::SubI => {
                let number = Expr::Number(constant(instr, op, pos, constants)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::minus(left, number));
            }
            OpCode::MulI => {
                let number = Expr::Number(constant(instr, op, pos, constants)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::times(left, number));
            }
            OpCode::DivI => {
                let number = Expr::Number(constant(instr, op, pos, constants)?);
                let left = pop(&mut stack, op, pos)?;
                stack.push(Expr::divide(left, number));
            }
            OpCode::UMin => {
                let inner = pop(&mut stack, op, pos)?;
                stack.push(Expr::negate(inner));
            }
            OpCode::UMinV => {
                let idx = var_index(instr, op, pos, num_vars)?;
                stack.push(Expr::Variable { idx, coef: -1.0 });
            }
            OpCode::MulIAdd => {
                let factor = constant(instr, op, pos, constants)?;
                let scaled = pop(&mut stack, op, pos)?;
                let acc = pop(&mut stack, op, pos)?;
                stack.push(Expr::plus(acc, Expr::times(scaled, Expr::Number(factor))));
            }
            OpCode::FuncArgN => {
                pending_args = Some(address(instr, op, pos)?);
            }
            OpCode::CallArg1 | OpCode::CallArg2 | OpCode::CallArgN => {
                // the field carries the function code itself, not an address
                let func =
                    FuncCode::from_code(instr.field).ok_or(OslinkError::UnsupportedFunction {
                        func: instr.field,
                        position: pos,
                    })?;
                let argc = match op {
                    OpCode::CallArg1 => 1,
                    OpCode::CallArg2 => 2,
                    _ => pending_args.take().ok_or_else(|| {
                        OslinkError::MalformedTape(format!(
                            "nlCallArgN at instruction {pos} without a preceding nlFuncArgN"
                        ))
                    })?,
                };
                apply(func, argc, &mut stack, op, pos)?;
            }
            OpCode::Swap
            | OpCode::StoreS
            | OpCode::EquScale
            | OpCode::End
            | OpCode::PushS
            | OpCode::Popup
            | OpCode::Arg => {
                return Err(OslinkError::UnsupportedOpcode {
                    opcode: instr.opcode,
                    position: pos,
                });
            }
        }
    }

    let root = stack.pop().ok_or_else(|| {
        OslinkError::MalformedTape("tape leaves no expression on the stack".to_string())
    })?;
    if !stack.is_empty() {
        return Err(OslinkError::MalformedTape(format!(
            "tape leaves {} expressions on the stack, expected one",
            stack.len() + 1
        )));
    }
    Ok(root)
}

/// Applies an intrinsic function to the top `argc` stack entries.
fn apply(
    func: FuncCode,
    argc: usize,
    stack: &mut Vec<Expr>,
    op: OpCode,
    pos: usize,
) -> OslinkResult<()> {
    match func {
        FuncCode::Min | FuncCode::Max => {
            let mut children = Vec::with_capacity(argc);
            for _ in 0..argc {
                children.push(pop(stack, op, pos)?);
            }
            children.reverse();
            let node = match func {
                FuncCode::Min => Expr::min(children)?,
                _ => Expr::max(children)?,
            };
            stack.push(node);
        }
        FuncCode::Sqr => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Square(Box::new(inner)));
        }
        FuncCode::Exp | FuncCode::SlExp | FuncCode::SqExp => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Exp(Box::new(inner)));
        }
        FuncCode::Log => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Ln(Box::new(inner)));
        }
        FuncCode::Log10 | FuncCode::SlLog10 | FuncCode::SqLog10 => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::times(
                Expr::Ln(Box::new(inner)),
                Expr::Number(1.0 / std::f64::consts::LN_10),
            ));
        }
        FuncCode::Log2 => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::times(
                Expr::Ln(Box::new(inner)),
                Expr::Number(1.0 / std::f64::consts::LN_2),
            ));
        }
        FuncCode::Sqrt => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Sqrt(Box::new(inner)));
        }
        FuncCode::Abs => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Abs(Box::new(inner)));
        }
        FuncCode::Cos => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Cos(Box::new(inner)));
        }
        FuncCode::Sin => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::Sin(Box::new(inner)));
        }
        FuncCode::Power | FuncCode::RPower | FuncCode::CvPower | FuncCode::VcPower => {
            expect_args(func, argc, 2, pos)?;
            let exponent = pop(stack, op, pos)?;
            let base = pop(stack, op, pos)?;
            stack.push(Expr::power(base, exponent));
        }
        FuncCode::Pi => {
            // a leaf: consumes nothing regardless of the call form
            stack.push(Expr::Pi);
        }
        FuncCode::Div | FuncCode::Div0 => {
            expect_args(func, argc, 2, pos)?;
            let right = pop(stack, op, pos)?;
            let left = pop(stack, op, pos)?;
            stack.push(Expr::divide(left, right));
        }
        FuncCode::SlRec | FuncCode::SqRec => {
            expect_args(func, argc, 1, pos)?;
            let inner = pop(stack, op, pos)?;
            stack.push(Expr::divide(Expr::Number(1.0), inner));
        }
        FuncCode::Poly => {
            // the stack holds the variable, then `argc` coefficients in
            // ascending degree order
            match argc {
                0 => {
                    let _variable = pop(stack, op, pos)?;
                    stack.push(Expr::Number(0.0));
                }
                1 => {
                    let constant = pop(stack, op, pos)?;
                    let _variable = pop(stack, op, pos)?;
                    stack.push(constant);
                }
                n => {
                    let mut coefs = Vec::with_capacity(n);
                    for _ in 0..n {
                        coefs.push(pop(stack, op, pos)?);
                    }
                    coefs.reverse();
                    let variable = pop(stack, op, pos)?;
                    // n >= 2 in this arm, so the constant term exists
                    let mut acc = coefs.remove(0);
                    for (degree, coef) in coefs.into_iter().enumerate() {
                        let term = match degree {
                            0 => Expr::times(coef, variable.clone()),
                            1 => Expr::times(coef, Expr::Square(Box::new(variable.clone()))),
                            d => Expr::times(
                                coef,
                                Expr::power(variable.clone(), Expr::Number((d + 1) as f64)),
                            ),
                        };
                        acc = Expr::plus(acc, term);
                    }
                    stack.push(acc);
                }
            }
        }
    }
    Ok(())
}

fn pop(stack: &mut Vec<Expr>, op: OpCode, pos: usize) -> OslinkResult<Expr> {
    stack.pop().ok_or_else(|| {
        OslinkError::MalformedTape(format!(
            "stack underflow at {} (instruction {pos})",
            op.name()
        ))
    })
}

fn address(instr: Instr, op: OpCode, pos: usize) -> OslinkResult<usize> {
    if instr.field < 1 {
        return Err(OslinkError::MalformedTape(format!(
            "{} at instruction {pos} has field {}, expected a one-based address",
            op.name(),
            instr.field
        )));
    }
    Ok((instr.field - 1) as usize)
}

fn var_index(instr: Instr, op: OpCode, pos: usize, num_vars: usize) -> OslinkResult<usize> {
    let idx = address(instr, op, pos)?;
    if idx >= num_vars {
        return Err(OslinkError::MalformedTape(format!(
            "{} at instruction {pos} references variable {idx} of {num_vars}",
            op.name()
        )));
    }
    Ok(idx)
}

fn constant(instr: Instr, op: OpCode, pos: usize, pool: &[f64]) -> OslinkResult<f64> {
    let idx = address(instr, op, pos)?;
    pool.get(idx).copied().ok_or_else(|| {
        OslinkError::MalformedTape(format!(
            "{} at instruction {pos} references constant {idx} of a pool of {}",
            op.name(),
            pool.len()
        ))
    })
}

fn expect_args(func: FuncCode, argc: usize, expected: usize, pos: usize) -> OslinkResult<()> {
    if argc != expected {
        return Err(OslinkError::MalformedTape(format!(
            "{func:?} at instruction {pos} takes {expected} arguments, tape supplied {argc}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // opcode numbers, for readable tapes
    const PUSHV: i32 = 1;
    const PUSHI: i32 = 2;
    const STORE: i32 = 3;
    const ADD: i32 = 4;
    const SUB: i32 = 7;
    const MULI: i32 = 12;
    const UMIN: i32 = 16;
    const UMINV: i32 = 17;
    const SWAP: i32 = 18;
    const HEADER: i32 = 19;
    const CALLARG1: i32 = 23;
    const CALLARG2: i32 = 24;
    const CALLARGN: i32 = 25;
    const FUNCARGN: i32 = 26;
    const MULIADD: i32 = 30;
    const PUSHZERO: i32 = 31;

    const FNMIN: i32 = 7;
    const FNSQR: i32 = 9;
    const FNLOG10: i32 = 12;
    const FNSIN: i32 = 16;
    const FNPOWER: i32 = 21;
    const FNPI: i32 = 45;
    const FNSLREC: i32 = 72;
    const FNPOLY: i32 = 108;

    #[test]
    fn test_decode_scaled_sum_with_sin() {
        // 3*x0 + sin(x1)
        let tape = Tape::from_pairs(&[
            (HEADER, 1),
            (PUSHV, 1),
            (MULI, 1),
            (PUSHV, 2),
            (CALLARG1, FNSIN),
            (ADD, 0),
            (STORE, 1),
        ]);
        let expr = decode(&tape, &[3.0], 2).unwrap();
        assert_eq!(
            expr,
            Expr::plus(
                Expr::times(Expr::var(0), Expr::Number(3.0)),
                Expr::Sin(Box::new(Expr::var(1))),
            )
        );
    }

    #[test]
    fn test_decode_binary_and_unary_minus() {
        // -(x0 - x1)
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (SUB, 0), (UMIN, 0)]);
        let expr = decode(&tape, &[], 2).unwrap();
        assert_eq!(
            expr,
            Expr::negate(Expr::minus(Expr::var(0), Expr::var(1)))
        );
    }

    #[test]
    fn test_decode_negated_variable_leaf() {
        let tape = Tape::from_pairs(&[(UMINV, 3)]);
        let expr = decode(&tape, &[], 4).unwrap();
        assert_eq!(expr, Expr::Variable { idx: 2, coef: -1.0 });
    }

    #[test]
    fn test_decode_multiply_constant_and_add() {
        // x0 + 2.5*x1
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (MULIADD, 1)]);
        let expr = decode(&tape, &[2.5], 2).unwrap();
        assert_eq!(
            expr,
            Expr::plus(
                Expr::var(0),
                Expr::times(Expr::var(1), Expr::Number(2.5)),
            )
        );
    }

    #[test]
    fn test_decode_power_call() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHI, 1), (CALLARG2, FNPOWER)]);
        let expr = decode(&tape, &[2.0], 1).unwrap();
        assert_eq!(expr, Expr::power(Expr::var(0), Expr::Number(2.0)));
    }

    #[test]
    fn test_decode_log10_scales_natural_log() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (CALLARG1, FNLOG10)]);
        let expr = decode(&tape, &[], 1).unwrap();
        assert_eq!(
            expr,
            Expr::times(
                Expr::Ln(Box::new(Expr::var(0))),
                Expr::Number(1.0 / std::f64::consts::LN_10),
            )
        );
    }

    #[test]
    fn test_decode_reciprocal() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (CALLARG1, FNSLREC)]);
        let expr = decode(&tape, &[], 1).unwrap();
        assert_eq!(expr, Expr::divide(Expr::Number(1.0), Expr::var(0)));
    }

    #[test]
    fn test_decode_pi_is_a_leaf() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (CALLARG1, FNPI), (ADD, 0)]);
        let expr = decode(&tape, &[], 1).unwrap();
        assert_eq!(expr, Expr::plus(Expr::var(0), Expr::Pi));
    }

    #[test]
    fn test_decode_nary_min() {
        let tape = Tape::from_pairs(&[
            (PUSHV, 1),
            (PUSHV, 2),
            (PUSHZERO, 0),
            (FUNCARGN, 4), // three arguments, field is one-based
            (CALLARGN, FNMIN),
        ]);
        let expr = decode(&tape, &[], 2).unwrap();
        assert_eq!(
            expr,
            Expr::min(vec![Expr::var(0), Expr::var(1), Expr::Number(0.0)]).unwrap()
        );
    }

    #[test]
    fn test_decode_polynomial() {
        // poly(x0; 1, 2, 3) = 1 + 2*x0 + 3*sqr(x0)
        let tape = Tape::from_pairs(&[
            (PUSHV, 1),
            (PUSHI, 1),
            (PUSHI, 2),
            (PUSHI, 3),
            (FUNCARGN, 4),
            (CALLARGN, FNPOLY),
        ]);
        let expr = decode(&tape, &[1.0, 2.0, 3.0], 1).unwrap();
        let expected = Expr::plus(
            Expr::plus(
                Expr::Number(1.0),
                Expr::times(Expr::Number(2.0), Expr::var(0)),
            ),
            Expr::times(
                Expr::Number(3.0),
                Expr::Square(Box::new(Expr::var(0))),
            ),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_decode_polynomial_quartic_uses_power() {
        // poly(x0; 0, 0, 0, 5) = ... + 5*x0**3
        let tape = Tape::from_pairs(&[
            (PUSHV, 1),
            (PUSHZERO, 0),
            (PUSHZERO, 0),
            (PUSHZERO, 0),
            (PUSHI, 1),
            (FUNCARGN, 5),
            (CALLARGN, FNPOLY),
        ]);
        let expr = decode(&tape, &[5.0], 1).unwrap();
        let cubic = Expr::times(
            Expr::Number(5.0),
            Expr::power(Expr::var(0), Expr::Number(3.0)),
        );
        match expr {
            Expr::Plus(_, term) => assert_eq!(*term, cubic),
            other => panic!("expected a plus chain, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_polynomial_without_coefficients_is_zero() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (FUNCARGN, 1), (CALLARGN, FNPOLY)]);
        let expr = decode(&tape, &[], 1).unwrap();
        assert_eq!(expr, Expr::Number(0.0));
    }

    #[test]
    fn test_decode_rejects_unsupported_opcode() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (SWAP, 0)]);
        let err = decode(&tape, &[], 2);
        assert!(matches!(
            err,
            Err(OslinkError::UnsupportedOpcode {
                opcode: 18,
                position: 2
            })
        ));
    }

    #[test]
    fn test_decode_rejects_unsupported_function() {
        // 86 is hyperbolic sine in the native table
        let tape = Tape::from_pairs(&[(PUSHV, 1), (CALLARG1, 86)]);
        let err = decode(&tape, &[], 1);
        assert!(matches!(
            err,
            Err(OslinkError::UnsupportedFunction {
                func: 86,
                position: 1
            })
        ));
    }

    #[test]
    fn test_decode_rejects_stack_underflow() {
        let tape = Tape::from_pairs(&[(ADD, 0)]);
        assert!(matches!(
            decode(&tape, &[], 0),
            Err(OslinkError::MalformedTape(_))
        ));
    }

    #[test]
    fn test_decode_rejects_leftover_stack() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (STORE, 1)]);
        assert!(matches!(
            decode(&tape, &[], 2),
            Err(OslinkError::MalformedTape(_))
        ));
    }

    #[test]
    fn test_decode_rejects_callargn_without_count() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (CALLARGN, FNMIN)]);
        assert!(matches!(
            decode(&tape, &[], 2),
            Err(OslinkError::MalformedTape(_))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_variable() {
        let tape = Tape::from_pairs(&[(PUSHV, 6)]);
        assert!(matches!(
            decode(&tape, &[], 2),
            Err(OslinkError::MalformedTape(_))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_constant() {
        let tape = Tape::from_pairs(&[(PUSHI, 9)]);
        assert!(matches!(
            decode(&tape, &[1.0], 0),
            Err(OslinkError::MalformedTape(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_call_arity() {
        let tape = Tape::from_pairs(&[(PUSHV, 1), (PUSHV, 2), (CALLARG2, FNSQR)]);
        assert!(matches!(
            decode(&tape, &[], 2),
            Err(OslinkError::MalformedTape(_))
        ));
    }
}
