use crate::expr::SymExpr;

/// Anything that can lower symbolic expressions into solver terms.
///
/// The returned width follows the expression's own width, with one
/// overload: width 1 means the term lives in the backend's Boolean sort
/// rather than a one-bit bitvector.
pub trait ExprTranslator<'ctx> {
    type Term: Clone + 'ctx;

    fn translate(&mut self, expr: &SymExpr) -> (Self::Term, u32);
}
