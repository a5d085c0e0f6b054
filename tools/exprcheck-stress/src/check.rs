//! Runs generated expressions through the reference interpreter.

use std::fmt;

use exprcheck_frontend::{Expr, ScalarType};
use exprcheck_sema::{
    EvalError, RecordType, StaticFrame, Target, Type, UbStatus, Value, evaluate,
};

use crate::config::GenConfig;

const VAR_ADDRESS: u64 = 0x1000;
const ARRAY_ADDRESS: u64 = 0x2000;
const ARRAY_LEN: u64 = 16;
const STRUCT_ADDRESS: u64 = 0x3000;

/// A frame holding the names the generator refers to: `int x = 42`, an
/// `int arr[16]` of multiples of three, and a struct `s` with one `int`
/// field per configured field name (holding 1, 2, ...) that `sp` points to.
pub fn synthetic_frame(target: &Target, config: &GenConfig) -> StaticFrame {
    let int = Type::Scalar(ScalarType::Int);
    let element_size = target.size_of(&int);
    let mut frame = StaticFrame::new()
        .with_variable_at(
            config.var_name.clone(),
            Value::from_int(target, int.clone(), 42),
            VAR_ADDRESS,
        )
        .with_variable(
            config.array_name.clone(),
            Value::pointer(int.clone(), ARRAY_ADDRESS),
        );
    for i in 0..ARRAY_LEN {
        frame = frame.with_memory(
            ARRAY_ADDRESS + i * element_size,
            Value::from_int(target, int.clone(), i128::from(i) * 3),
        );
    }

    let tag = config.tagged_types.first().map_or("S", String::as_str);
    let record = config
        .field_names
        .iter()
        .fold(RecordType::new(tag), |record, name| {
            record.with_field(target, name.clone(), int.clone())
        });
    for (i, field) in record.fields.iter().enumerate() {
        frame = frame.with_memory(
            STRUCT_ADDRESS + field.offset,
            Value::from_int(target, field.ty.clone(), i as i128 + 1),
        );
    }
    frame
        .with_type(tag, Type::Record(record.clone()))
        .with_variable(
            config.struct_ptr_name.clone(),
            Value::pointer(Type::Record(record.clone()), STRUCT_ADDRESS),
        )
        .with_variable_at(
            config.struct_name.clone(),
            Value::record(record, STRUCT_ADDRESS),
            STRUCT_ADDRESS,
        )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    UndefinedBehavior(UbStatus),
    Error(EvalError),
}

pub fn check(target: &Target, frame: &StaticFrame, expr: &Expr) -> Outcome {
    match evaluate(target, frame, expr) {
        Ok(evaluation) if evaluation.ub.is_ub() => Outcome::UndefinedBehavior(evaluation.ub),
        Ok(evaluation) => Outcome::Value(evaluation.value),
        Err(err) => Outcome::Error(err),
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => write!(f, "= {value} ({})", value.ty()),
            Outcome::UndefinedBehavior(status) => write!(f, "UB: {status}"),
            Outcome::Error(err) => write!(f, "error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use exprcheck_frontend::BinOp;

    use super::*;

    fn run(expr: Expr) -> Outcome {
        let target = Target::default();
        let frame = synthetic_frame(&target, &GenConfig::default());
        check(&target, &frame, &expr)
    }

    #[test]
    fn reads_the_synthetic_frame() {
        assert_eq!(run(Expr::var("x")).to_string(), "= 42 (int)");
        assert_eq!(run(Expr::index(Expr::var("arr"), Expr::int(5))).to_string(), "= 15 (int)");
        assert_eq!(
            run(Expr::address_of(Expr::var("x"))).to_string(),
            "= 0x1000 (int *)"
        );
    }

    #[test]
    fn reports_undefined_behavior() {
        let outcome = run(Expr::binary(BinOp::Shl, Expr::var("x"), Expr::int(32)));
        assert_eq!(outcome, Outcome::UndefinedBehavior(UbStatus::InvalidShift));
        assert!(outcome.to_string().starts_with("UB: "));
    }

    #[test]
    fn reports_errors() {
        let outcome = run(Expr::index(Expr::var("arr"), Expr::int(100)));
        assert!(matches!(outcome, Outcome::Error(EvalError::MemoryRead { .. })));
        let outcome = run(Expr::member_of(Expr::var("x"), "f"));
        assert!(outcome.to_string().starts_with("error: "));
    }

    #[test]
    fn reads_struct_fields() {
        let target = Target::default();
        let mut config = GenConfig::default();
        config.field_names = vec!["f".to_string(), "g".to_string()];
        let frame = synthetic_frame(&target, &config);
        let run = |e: Expr| check(&target, &frame, &e).to_string();

        assert_eq!(run(Expr::member_of(Expr::var("s"), "f")), "= 1 (int)");
        assert_eq!(run(Expr::member_of_ptr(Expr::var("sp"), "g")), "= 2 (int)");
        assert_eq!(
            run(Expr::binary(
                BinOp::Div,
                Expr::var("x"),
                Expr::member_of(Expr::var("s"), "g")
            )),
            "= 21 (int)"
        );
        assert_eq!(run(Expr::address_of(Expr::var("s"))), "= 0x3000 (S *)");
    }
}
