mod builder;
mod context;
mod solve;
mod translate;

pub use builder::{Z3Builder, Z3BuilderOptions};
pub use context::{AstHandle, Config, Context, SortHandle};
pub use solve::{SatResult, SolverError, Z3Solver};

use crate::backend::ExprTranslator;
use crate::expr::SymExpr;

impl<'ctx> ExprTranslator<'ctx> for Z3Builder<'ctx> {
    type Term = AstHandle<'ctx>;

    fn translate(&mut self, expr: &SymExpr) -> (Self::Term, u32) {
        Z3Builder::translate(self, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;

    const RM: RoundingMode = RoundingMode::NearestTiesToEven;

    /// A fresh 32-bit symbolic value, modelled as a one-cell array read.
    fn sym32(name: &str) -> SymExpr {
        let root = ArrayRef::symbolic(name, 32, 32, 1);
        SymExpr::read(UpdateList::new(root), SymExpr::from_u64(0, 32))
    }

    fn is_valid<'ctx>(ctx: &'ctx Context, cond: &AstHandle<'ctx>) -> bool {
        let mut solver = Z3Solver::new(ctx);
        solver.assert(&cond.not());
        solver.check() == Ok(SatResult::Unsat)
    }

    fn is_unsat<'ctx>(ctx: &'ctx Context, cond: &AstHandle<'ctx>) -> bool {
        let mut solver = Z3Solver::new(ctx);
        solver.assert(cond);
        solver.check() == Ok(SatResult::Unsat)
    }

    /// `cond` translated and proven valid.
    fn assert_valid(e: &SymExpr) {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);
        let (ast, width) = builder.construct(e);
        assert_eq!(width, 1);
        assert!(is_valid(&ctx, &ast), "not valid: {}", e);
    }

    fn implies(cond: SymExpr, body: SymExpr) -> SymExpr {
        SymExpr::binary(BinOp::Or, SymExpr::not(cond), body)
    }

    #[test]
    fn constant_arithmetic_folds_through_translation() {
        let sum = SymExpr::binary(
            BinOp::Add,
            SymExpr::from_u64(2, 32),
            SymExpr::from_u64(3, 32),
        );
        assert_valid(&SymExpr::compare(CmpOp::Eq, sum, SymExpr::from_u64(5, 32)));
    }

    #[test]
    fn translated_widths_match_ir_widths() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let x = sym32("x");
        let exprs = [
            SymExpr::from_u64(9, 48),
            SymExpr::binary(BinOp::Mul, x.clone(), x.clone()),
            SymExpr::compare(CmpOp::Slt, x.clone(), SymExpr::from_u64(0, 32)),
            SymExpr::zext(x.clone(), 77),
            SymExpr::extract(x.clone(), 3, 9),
            SymExpr::concat([x.clone(), x.clone()]),
        ];

        for e in exprs {
            let (_, width) = builder.construct(&e);
            assert_eq!(width, e.width(), "width drift on {}", e);
        }
    }

    #[test]
    fn symbolic_read_of_constant_array_is_bounded() {
        let cells = [7u64, 8, 9, 10]
            .iter()
            .map(|v| BvConst::from_u64(*v, 32))
            .collect();
        let root = ArrayRef::constant("vals", 32, 32, cells);
        let i = sym32("i");

        let in_bounds = SymExpr::compare(CmpOp::Ult, i.clone(), SymExpr::from_u64(4, 32));
        let read = SymExpr::read(UpdateList::new(root), i);
        let bounded = SymExpr::compare(CmpOp::Ult, read, SymExpr::from_u64(11, 32));

        assert_valid(&implies(in_bounds, bounded));
    }

    #[test]
    fn read_through_update_chain_sees_the_write() {
        let root = ArrayRef::symbolic("mem", 32, 8, 16);
        let ul = UpdateList::new(root)
            .write(SymExpr::from_u64(2, 32), SymExpr::from_u64(0x55, 8))
            .write(SymExpr::from_u64(2, 32), SymExpr::from_u64(0xAA, 8));

        let read = SymExpr::read(ul, SymExpr::from_u64(2, 32));
        assert_valid(&SymExpr::compare(CmpOp::Eq, read, SymExpr::from_u64(0xAA, 8)));
    }

    #[test]
    fn udiv_by_power_of_two_matches_logical_shift() {
        let x = sym32("x");
        let div = SymExpr::binary(BinOp::UDiv, x.clone(), SymExpr::from_u64(8, 32));
        let shr = SymExpr::binary(BinOp::LShr, x, SymExpr::from_u64(3, 32));
        assert_valid(&SymExpr::compare(CmpOp::Eq, div, shr));
    }

    #[test]
    fn urem_lowering() {
        let x = sym32("x");

        let rem1 = SymExpr::binary(BinOp::URem, x.clone(), SymExpr::from_u64(1, 32));
        assert_valid(&SymExpr::compare(CmpOp::Eq, rem1, SymExpr::from_u64(0, 32)));

        let rem8 = SymExpr::binary(BinOp::URem, x.clone(), SymExpr::from_u64(8, 32));
        let low = SymExpr::zext(SymExpr::extract(x, 0, 3), 32);
        assert_valid(&SymExpr::compare(CmpOp::Eq, rem8, low));
    }

    #[test]
    fn constant_overshift_is_zero() {
        let shl = SymExpr::binary(
            BinOp::Shl,
            SymExpr::from_u64(1, 32),
            SymExpr::from_u64(64, 32),
        );
        assert_valid(&SymExpr::compare(CmpOp::Eq, shl, SymExpr::from_u64(0, 32)));
    }

    #[test]
    fn variable_overshift_is_zero() {
        let x = sym32("x");
        let s = sym32("s");
        let over = SymExpr::compare(CmpOp::Ule, SymExpr::from_u64(32, 32), s.clone());
        let shl = SymExpr::binary(BinOp::Shl, x, s);
        let zero = SymExpr::compare(CmpOp::Eq, shl, SymExpr::from_u64(0, 32));
        assert_valid(&implies(over, zero));
    }

    #[test]
    fn shift_laws() {
        let x = sym32("x");

        let shl0 = SymExpr::binary(BinOp::Shl, x.clone(), SymExpr::from_u64(0, 32));
        assert_valid(&SymExpr::compare(CmpOp::Eq, shl0, x.clone()));

        // Low k bits of (x << k) >> k are zero only after masking; the
        // law that holds unconditionally is (x << k) >> k == x mod 2^29.
        let k = SymExpr::from_u64(3, 32);
        let round = SymExpr::binary(
            BinOp::LShr,
            SymExpr::binary(BinOp::Shl, x.clone(), k.clone()),
            k,
        );
        let masked = SymExpr::zext(SymExpr::extract(x, 0, 29), 32);
        assert_valid(&SymExpr::compare(CmpOp::Eq, round, masked));
    }

    #[test]
    fn arithmetic_shift_keeps_the_sign() {
        let x = sym32("x");
        let negative = SymExpr::compare(CmpOp::Slt, x.clone(), SymExpr::from_u64(0, 32));
        let shifted = SymExpr::binary(BinOp::AShr, x, SymExpr::from_u64(31, 32));
        let all_ones = SymExpr::compare(
            CmpOp::Eq,
            shifted,
            SymExpr::constant(BvConst::from_u64(u32::MAX as u64, 32)),
        );
        assert_valid(&implies(negative, all_ones));
    }

    #[test]
    fn extract_concat_round_trip() {
        let x = sym32("x");
        let high = SymExpr::extract(x.clone(), 16, 16);
        let low = SymExpr::extract(x.clone(), 0, 16);
        let glued = SymExpr::concat([high, low]);
        assert_valid(&SymExpr::compare(CmpOp::Eq, glued, x));
    }

    #[test]
    fn wide_constants_survive_chunking() {
        let c = BvConst::new(128, [0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210]);
        let whole = SymExpr::constant(c);
        let halves = SymExpr::concat([
            SymExpr::constant(BvConst::from_u64(0xFEDC_BA98_7654_3210, 64)),
            SymExpr::constant(BvConst::from_u64(0x0123_4567_89AB_CDEF, 64)),
        ]);
        assert_valid(&SymExpr::compare(CmpOp::Eq, whole, halves));
    }

    #[test]
    fn boolean_equality_against_a_literal_collapses() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let cmp = SymExpr::compare(CmpOp::Ult, sym32("a"), sym32("b"));
        let eq = SymExpr::compare(CmpOp::Eq, SymExpr::bool_const(true), cmp.clone());

        let (cmp_ast, _) = builder.construct(&cmp);
        let (eq_ast, width) = builder.construct(&eq);
        assert_eq!(width, 1);
        // The literal side folds away entirely: same underlying term.
        assert_eq!(cmp_ast.raw(), eq_ast.raw());

        let ne = SymExpr::compare(CmpOp::Eq, SymExpr::bool_const(false), cmp);
        let (ne_ast, _) = builder.construct(&ne);
        assert!(is_valid(&ctx, &ne_ast.iff(&cmp_ast.not())));
    }

    #[test]
    fn width_one_casts_go_through_ite() {
        let x = sym32("x");
        let bit = SymExpr::compare(CmpOp::Ult, x.clone(), SymExpr::from_u64(10, 32));

        let z = SymExpr::zext(bit.clone(), 32);
        assert_valid(&SymExpr::compare(CmpOp::Ule, z, SymExpr::from_u64(1, 32)));

        let s = SymExpr::sext(bit.clone(), 32);
        let is_zero = SymExpr::compare(CmpOp::Eq, s.clone(), SymExpr::from_u64(0, 32));
        let is_ones = SymExpr::compare(
            CmpOp::Eq,
            s,
            SymExpr::constant(BvConst::from_u64(u32::MAX as u64, 32)),
        );
        assert_valid(&SymExpr::binary(BinOp::Or, is_zero, is_ones));
    }

    #[test]
    fn unlisted_comparisons_are_rejected() {
        let result = std::panic::catch_unwind(|| {
            let ctx = Context::default();
            let mut builder = Z3Builder::new(&ctx);
            let e = SymExpr::compare(CmpOp::Ugt, sym32("a"), sym32("b"));
            builder.construct(&e);
        });
        assert!(result.is_err());
    }

    #[test]
    fn construct_cache_is_per_unique_node() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let a = sym32("a");
        let b = SymExpr::binary(BinOp::Add, a.clone(), a.clone());
        let c = SymExpr::binary(BinOp::Mul, b.clone(), b);

        builder.construct(&c);
        // Constants bypass the cache; read + add + mul remain.
        assert_eq!(builder.constructed.len(), 3);

        builder.construct(&c);
        assert_eq!(builder.constructed.len(), 3);

        builder.clear_construct_cache();
        assert!(builder.constructed.is_empty());
    }

    #[test]
    fn disabling_the_cache_skips_memoisation() {
        let ctx = Context::default();
        let opts = Z3BuilderOptions {
            use_construct_cache: false,
            auto_clear_construct_cache: false,
        };
        let mut builder = Z3Builder::with_options(&ctx, opts);

        let a = sym32("a");
        let e = SymExpr::binary(BinOp::Add, a.clone(), a);
        builder.construct(&e);
        assert!(builder.constructed.is_empty());
    }

    #[test]
    fn float_bits_round_trip_at_32() {
        let c = SymExpr::from_u64(0x4049_0FDB, 32);
        let back = SymExpr::float_to_bits(SymExpr::bits_to_float(c.clone()));
        assert_valid(&SymExpr::compare(CmpOp::Eq, back, c));
    }

    #[test]
    fn nan_comparison_table() {
        let nan = SymExpr::bits_to_float(SymExpr::from_u64(0x7FC0_0000, 32));
        let x = SymExpr::bits_to_float(sym32("x"));

        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let (oeq, _) = builder.construct(&SymExpr::float_compare(
            FCmpOp::Oeq,
            nan.clone(),
            nan.clone(),
        ));
        assert!(is_unsat(&ctx, &oeq));

        let (une, _) = builder.construct(&SymExpr::float_compare(
            FCmpOp::Une,
            nan.clone(),
            nan.clone(),
        ));
        assert!(is_valid(&ctx, &une));

        let (ueq, _) = builder.construct(&SymExpr::float_compare(FCmpOp::Ueq, nan, x));
        assert!(is_valid(&ctx, &ueq));
    }

    #[test]
    fn float_min_max_agree_with_ordering() {
        let a = SymExpr::bits_to_float(SymExpr::from_u64(1.5f32.to_bits() as u64, 32));
        let b = SymExpr::bits_to_float(SymExpr::from_u64(2.5f32.to_bits() as u64, 32));

        let min = SymExpr::float_binary(FBinOp::Min, RM, a.clone(), b.clone());
        let le = SymExpr::float_compare(FCmpOp::Ole, min, b);
        assert_valid(&le);
    }

    // 80-bit patterns: exponent 1 with a clear integer bit is unnormal,
    // 0x3FFF with the integer bit set is 1.0.
    const UNNORMAL_BITS: u128 = (1u128 << 64) | 1;
    const ONE_BITS: u128 = (0x3FFFu128 << 64) | (1u128 << 63);

    #[test]
    fn f80_unnormal_operand_poisons_addition() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let unnormal = SymExpr::float_const(FpConst::from_f80_bits(UNNORMAL_BITS));
        let one = SymExpr::float_const(FpConst::from_f80_bits(ONE_BITS));
        let sum = SymExpr::float_binary(FBinOp::Add, RM, unnormal, one);

        let (arr, width) = builder.construct(&sum);
        assert_eq!(width, FL80);

        // Number channel NaN, sentinel channel back to fp-zero.
        assert!(is_valid(&ctx, &builder.f80_number(&arr).fp_is_nan()));
        assert!(is_valid(
            &ctx,
            &arr.select(&builder.bv_one(1)).fp_is_zero()
        ));
    }

    #[test]
    fn f80_not_equal_is_the_unnormal_exception() {
        let unnormal = SymExpr::float_const(FpConst::from_f80_bits(UNNORMAL_BITS));
        let one = SymExpr::float_const(FpConst::from_f80_bits(ONE_BITS));

        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let (oeq, _) = builder.construct(&SymExpr::float_compare(
            FCmpOp::Oeq,
            unnormal.clone(),
            one.clone(),
        ));
        assert!(is_unsat(&ctx, &oeq));

        let (une, _) = builder.construct(&SymExpr::float_compare(
            FCmpOp::Une,
            unnormal.clone(),
            one.clone(),
        ));
        assert!(is_valid(&ctx, &une));

        let (olt, _) = builder.construct(&SymExpr::float_compare(FCmpOp::Olt, unnormal, one));
        assert!(is_unsat(&ctx, &olt));
    }

    #[test]
    fn f80_fabs_preserves_the_sentinel() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let unnormal = SymExpr::float_const(FpConst::from_f80_bits(UNNORMAL_BITS));
        let (abs, width) = builder.construct(&SymExpr::fabs(unnormal));
        assert_eq!(width, FL80);
        assert!(is_valid(&ctx, &builder.f80_wrong_hidden_bit(&abs)));
    }

    #[test]
    fn f80_bits_round_trip_for_canonical_values() {
        let one = SymExpr::constant(BvConst::new(80, [ONE_BITS as u64, (ONE_BITS >> 64) as u64]));
        let back = SymExpr::float_to_bits(SymExpr::bits_to_float(one.clone()));
        assert_valid(&SymExpr::compare(CmpOp::Eq, back, one));
    }

    #[test]
    fn f80_conversion_from_f32_is_normal() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let small = SymExpr::bits_to_float(SymExpr::from_u64(2.0f32.to_bits() as u64, 32));
        let wide = SymExpr::fext(small, FL80, RM);

        let (arr, width) = builder.construct(&wide);
        assert_eq!(width, FL80);
        assert!(is_valid(&ctx, &builder.f80_wrong_hidden_bit(&arr).not()));
    }

    #[test]
    fn f80_to_signed_int_on_unnormal_is_int_min() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let unnormal = SymExpr::float_const(FpConst::from_f80_bits(UNNORMAL_BITS));
        let (cast, width) = builder.construct(&SymExpr::ftos(unnormal, 32, RM));
        assert_eq!(width, 32);

        let int_min = builder.bv_const32(32, i32::MIN as u32);
        assert!(is_valid(&ctx, &cast.eq(&int_min)));
    }

    #[test]
    fn classification_ignores_the_sentinel() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);

        let unnormal = SymExpr::float_const(FpConst::from_f80_bits(UNNORMAL_BITS));
        let (is_nan, width) =
            builder.construct(&SymExpr::classify(ClassKind::IsNan, unnormal.clone()));
        assert_eq!(width, 32);
        // The stored 79-bit number is an honest denormal-range value,
        // not a NaN, so isnan answers for the number alone.
        assert!(is_valid(&ctx, &is_nan.eq(&builder.bv_const32(32, 0))));

        let (is_inf, _) = builder.construct(&SymExpr::classify(ClassKind::IsInf, unnormal));
        assert!(is_valid(&ctx, &is_inf.eq(&builder.bv_const32(32, 0))));
    }

    #[test]
    fn getters_round_trip_through_the_solver() {
        let ctx = Context::default();
        let mut builder = Z3Builder::new(&ctx);
        let mut solver = Z3Solver::new(&ctx);

        let root = ArrayRef::symbolic("mem", 32, 8, 4);
        let cell = builder.get_initial_read(&root, 2);
        let expected = builder.bv_const32(8, 0x7F);

        solver.assert(&cell.eq(&expected));
        assert_eq!(solver.check(), Ok(SatResult::Sat));
        assert_eq!(solver.eval_bv_u64(&cell), Some(0x7F));

        assert!(is_valid(&ctx, &builder.get_true()));
        assert!(is_unsat(&ctx, &builder.get_false()));
    }
}
