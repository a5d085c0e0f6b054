//! exprcheck sema: the target type model, the undefined-behavior classifier,
//! and a reference interpreter that runs the classifier over whole
//! expressions.

pub mod errors;
pub mod eval;
pub mod frame;
pub mod types;
pub mod ub;
pub mod value;

pub use errors::EvalError;
pub use eval::{EvalOptions, Evaluation, Interpreter, evaluate};
pub use frame::{Frame, StaticFrame};
pub use types::{Arch, EnumType, Field, IntRange, RecordType, Target, Type};
pub use ub::{UbClassifier, UbStatus};
pub use value::{Scalar, Value};
