//! Weighted, grammar-driven expression generation.
//!
//! Generation is recursive descent over `ExprKind`. Each recursion point
//! takes a fresh weight snapshot for its depth from the configuration, lets
//! the RNG pick a kind, and recurses one level deeper for sub-expressions.
//! Parentheses needed for precedence are inserted structurally; on top of
//! that every sub-expression may be wrapped at random.

use exprcheck_frontend::ast::{TERNARY_PRECEDENCE, UNARY_PRECEDENCE};
use exprcheck_frontend::{
    BinOp, CvQualifiers, Expr, QualifiedType, ScalarType, TypeDesc, UnOp, VariableDecl,
};

use crate::config::GenConfig;
use crate::errors::{ConfigError, GenError};
use crate::rng::GeneratorRng;
use crate::weights::{ExprKind, Kind, TypeKind};

pub struct ExprGenerator<R> {
    rng: R,
    config: GenConfig,
}

impl<R: GeneratorRng> ExprGenerator<R> {
    /// Validates `config` before anything is generated from it.
    pub fn new(rng: R, config: GenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        for kind in config.undamped_recursive_kinds() {
            tracing::warn!(
                kind = kind.name(),
                "recursive kind has no dampening and no max_depth, generation may not terminate"
            );
        }
        Ok(Self { rng, config })
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    /// One complete expression.
    pub fn generate(&mut self) -> Result<Expr, GenError> {
        let expr = self.gen_with_depth(0)?;
        tracing::debug!(%expr, depth = expr.depth(), nodes = expr.node_count(), "generated");
        Ok(expr)
    }

    fn gen_with_depth(&mut self, depth: usize) -> Result<Expr, GenError> {
        let weights = self.config.weights_at(depth);
        let kind = self
            .rng
            .gen_expr_kind(&weights)
            .ok_or(GenError::NoViableExprKind { depth })?;
        tracing::trace!(%kind, depth, "expression kind");

        let expr = match kind {
            ExprKind::IntegerConstant => {
                Expr::int(self.rng.gen_u64(self.config.int_const_min, self.config.int_const_max))
            }
            ExprKind::DoubleConstant => {
                let value = self.rng.gen_double(
                    self.config.double_constant_min,
                    self.config.double_constant_max,
                );
                // Literals have no sign; a negative value is a negated literal.
                if value.is_sign_negative() {
                    Expr::unary(UnOp::Neg, Expr::double(-value))
                } else {
                    Expr::double(value)
                }
            }
            ExprKind::BooleanConstant => Expr::BooleanConstant(self.rng.gen_bool(0.5)),
            ExprKind::VariableExpr => Expr::var(&self.config.var_name),
            ExprKind::UnaryExpr => self.gen_unary_expr(depth)?,
            ExprKind::BinaryExpr => self.gen_binary_expr(depth)?,
            ExprKind::AddressOf => Expr::address_of(Expr::var(&self.config.var_name)),
            ExprKind::MemberOf => {
                let field = self.pick_field()?;
                Expr::member_of(Expr::var(&self.config.struct_name), field)
            }
            ExprKind::MemberOfPtr => {
                let field = self.pick_field()?;
                Expr::member_of_ptr(Expr::var(&self.config.struct_ptr_name), field)
            }
            ExprKind::ArrayIndex => {
                let index = self.gen_with_depth(depth + 1)?;
                Expr::index(Expr::var(&self.config.array_name), index)
            }
            ExprKind::TernaryExpr => self.gen_ternary_expr(depth)?,
        };
        Ok(self.maybe_parenthesized(expr))
    }

    fn maybe_parenthesized(&mut self, expr: Expr) -> Expr {
        if self.rng.gen_bool(self.config.parenthesize_prob) {
            Expr::paren(expr)
        } else {
            expr
        }
    }

    fn gen_unary_expr(&mut self, depth: usize) -> Result<Expr, GenError> {
        let op = self
            .rng
            .gen_un_op(self.config.un_op_mask)
            .ok_or(GenError::NoViableOperator { kind: "unary" })?;
        let operand = self.gen_with_depth(depth + 1)?;
        let needs_parens = operand.precedence() > UNARY_PRECEDENCE;
        Ok(Expr::unary(op, parenthesize_if(operand, needs_parens)))
    }

    /// Operators are left-associative, so only the right operand needs
    /// parentheses at equal precedence.
    fn gen_binary_expr(&mut self, depth: usize) -> Result<Expr, GenError> {
        let op: BinOp = self
            .rng
            .gen_bin_op(self.config.bin_op_mask)
            .ok_or(GenError::NoViableOperator { kind: "binary" })?;
        let lhs = self.gen_with_depth(depth + 1)?;
        let rhs = self.gen_with_depth(depth + 1)?;
        let lhs_parens = lhs.precedence() > op.precedence();
        let rhs_parens = rhs.precedence() >= op.precedence();
        Ok(Expr::binary(
            op,
            parenthesize_if(lhs, lhs_parens),
            parenthesize_if(rhs, rhs_parens),
        ))
    }

    /// `?:` is right-associative; only a conditional in the condition needs
    /// parentheses.
    fn gen_ternary_expr(&mut self, depth: usize) -> Result<Expr, GenError> {
        let cond = self.gen_with_depth(depth + 1)?;
        let lhs = self.gen_with_depth(depth + 1)?;
        let rhs = self.gen_with_depth(depth + 1)?;
        let cond_parens = cond.precedence() >= TERNARY_PRECEDENCE;
        Ok(Expr::ternary(parenthesize_if(cond, cond_parens), lhs, rhs))
    }

    fn pick_field(&mut self) -> Result<String, GenError> {
        pick(&mut self.rng, &self.config.field_names)
            .cloned()
            .ok_or(GenError::NoNames { what: "field names" })
    }

    /// A random type as it may be written in a declaration.
    pub fn gen_type(&mut self) -> Result<QualifiedType, GenError> {
        self.gen_type_with_depth(0, true)
    }

    /// A pointer never points to a reference and a reference never refers to
    /// a reference. References carry no cv-qualifiers of their own.
    fn gen_type_with_depth(
        &mut self,
        depth: usize,
        allow_reference: bool,
    ) -> Result<QualifiedType, GenError> {
        let mut weights = self.config.weights_at(depth);
        if !allow_reference {
            weights[TypeKind::ReferenceType] = 0.0;
        }
        let kind = self
            .rng
            .gen_type_kind(&weights)
            .ok_or(GenError::NoViableTypeKind { depth })?;
        tracing::trace!(%kind, depth, "type kind");

        let ty = match kind {
            TypeKind::ScalarType => {
                let scalar = pick(&mut self.rng, &ScalarType::ALL)
                    .copied()
                    .unwrap_or(ScalarType::Int);
                TypeDesc::Scalar(scalar)
            }
            TypeKind::TaggedType => {
                let name = pick(&mut self.rng, &self.config.tagged_types)
                    .cloned()
                    .ok_or(GenError::NoNames {
                        what: "tagged types",
                    })?;
                TypeDesc::Tagged(name)
            }
            TypeKind::PointerType => {
                TypeDesc::Pointer(Box::new(self.gen_type_with_depth(depth + 1, false)?))
            }
            TypeKind::ReferenceType => {
                let referee = self.gen_type_with_depth(depth + 1, false)?;
                return Ok(QualifiedType::new(
                    TypeDesc::Reference(Box::new(referee)),
                    CvQualifiers::NONE,
                ));
            }
        };
        let cv = self
            .rng
            .gen_cv_qualifiers(self.config.const_prob, self.config.volatile_prob);
        Ok(QualifiedType::new(ty, cv))
    }

    /// A declaration of the configured variable with a random type.
    pub fn generate_declaration(&mut self) -> Result<VariableDecl, GenError> {
        let ty = self.gen_type()?;
        Ok(VariableDecl {
            ty,
            name: self.config.var_name.clone(),
        })
    }
}

fn parenthesize_if(expr: Expr, needed: bool) -> Expr {
    if needed { Expr::paren(expr) } else { expr }
}

fn pick<'a, T>(rng: &mut impl GeneratorRng, items: &'a [T]) -> Option<&'a T> {
    let last = items.len().checked_sub(1)?;
    let index = rng.gen_u64(0, last as u64);
    items.get(usize::try_from(index).ok()?)
}
