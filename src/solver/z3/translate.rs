use log::trace;

use crate::expr::{
    BinOp, ClassKind, CmpOp, Expr, FBinOp, FCmpOp, FUnOp, FpConst, SymExpr, FL32, FL64, FL80,
    INT32, INT64,
};

use super::context::{AstHandle, SortHandle};
use super::Z3Builder;

// Classification results, as <math.h> numbers them.
const FP_NAN: u64 = 0;
const FP_INFINITE: u64 = 1;
const FP_ZERO: u64 = 2;
const FP_SUBNORMAL: u64 = 3;
const FP_NORMAL: u64 = 4;

impl<'ctx> Z3Builder<'ctx> {
    /// Translate one top-level expression, honouring the auto-clear
    /// option for the construct cache.
    pub fn translate(&mut self, e: &SymExpr) -> (AstHandle<'ctx>, u32) {
        trace!("translating {}", e);
        let result = self.construct(e);
        if self.opts.auto_clear_construct_cache {
            self.clear_construct_cache();
        }
        result
    }

    /// Memoised recursive entry. Returns the term together with its
    /// width; width 1 means the term is a Z3 Boolean, anything else a
    /// bitvector (or float / the f80 array encoding).
    pub fn construct(&mut self, e: &SymExpr) -> (AstHandle<'ctx>, u32) {
        if !self.opts.use_construct_cache || e.is_constant() {
            return self.construct_actual(e);
        }

        if let Some((ast, width)) = self.constructed.get(e) {
            return (ast.clone(), *width);
        }

        let (ast, width) = self.construct_actual(e);
        self.constructed.insert(e.clone(), (ast.clone(), width));
        (ast, width)
    }

    // The 80-bit width is deliberately absent: it has no native sort and
    // every caller handles its array encoding before reaching here.
    fn fp_sort_for_width(&self, width: u32) -> SortHandle<'ctx> {
        match width {
            16 => self.ctx.fpa_sort(5, 11),
            FL32 => self.ctx.fpa_sort(8, 24),
            FL64 => self.ctx.fpa_sort(11, 53),
            128 => self.ctx.fpa_sort(15, 113),
            _ => panic!("no float sort for width {}", width),
        }
    }

    fn construct_actual(&mut self, e: &SymExpr) -> (AstHandle<'ctx>, u32) {
        match &**e {
            Expr::Const(c) => {
                let width = c.width();
                if width == 1 {
                    let ast = if c.is_true() { self.get_true() } else { self.get_false() };
                    return (ast, 1);
                }
                (self.bv_const_ast(c), width)
            }

            Expr::FConst(c) => {
                let width = c.width();
                match c {
                    FpConst::Single(bits) => {
                        let sort = self.fp_sort_for_width(FL32);
                        (self.ctx.fp_numeral_f32(f32::from_bits(*bits), &sort), width)
                    }
                    FpConst::Double(bits) => {
                        let sort = self.fp_sort_for_width(FL64);
                        (self.ctx.fp_numeral_f64(f64::from_bits(*bits), &sort), width)
                    }
                    FpConst::Extended(_) => {
                        let sign = c.f80_sign();
                        let exp = c.f80_exponent();
                        let mnt = c.f80_significand();
                        let correct_hidden_bit = (exp == 0) == ((mnt >> 63) & 1 == 0);

                        let number = self.ctx.fp_from_parts(
                            &self.bv_const32(1, sign),
                            &self.bv_const32(15, exp),
                            &self.bv_const64(63, mnt & 0x7FFF_FFFF_FFFF_FFFF),
                        );

                        let sort = self.f80_sort();
                        let sentinel = if correct_hidden_bit {
                            self.ctx.fp_zero(&sort)
                        } else {
                            self.ctx.fp_nan(&sort)
                        };
                        (self.f80_pack(&number, &sentinel), width)
                    }
                }
            }

            Expr::NotOptimized(inner) => self.construct(inner),

            Expr::Read { updates, index } => {
                let width = updates.root.range;
                let array = self.get_array_for_update(&updates.root, updates.head.as_ref());
                let (index, _) = self.construct(index);
                (array.select(&index), width)
            }

            Expr::Select { cond, on_true, on_false }
            | Expr::FSelect { cond, on_true, on_false } => {
                let (cond, _) = self.construct(cond);
                let (on_true, width) = self.construct(on_true);
                let (on_false, _) = self.construct(on_false);
                (cond.ite(&on_true, &on_false), width)
            }

            Expr::Concat(kids) => {
                let (mut res, _) = self.construct(&kids[kids.len() - 1]);
                for kid in kids[..kids.len() - 1].iter().rev() {
                    let (kid, _) = self.construct(kid);
                    res = kid.concat(&res);
                }
                (res, e.width())
            }

            Expr::Extract { src, offset, width } => {
                let (src, _) = self.construct(src);
                if *width == 1 {
                    (self.bv_bool_extract(&src, *offset), 1)
                } else {
                    (src.extract(offset + width - 1, *offset), *width)
                }
            }

            Expr::ZExt { src, width } => {
                let (src, src_width) = self.construct(src);
                if src_width == 1 {
                    (src.ite(&self.bv_one(*width), &self.bv_zero(*width)), *width)
                } else {
                    (self.bv_zero(width - src_width).concat(&src), *width)
                }
            }

            Expr::SExt { src, width } => {
                let (src, src_width) = self.construct(src);
                if src_width == 1 {
                    (
                        src.ite(&self.bv_minus_one(*width), &self.bv_zero(*width)),
                        *width,
                    )
                } else {
                    (src.sign_ext(width - src_width), *width)
                }
            }

            Expr::Not(inner) => {
                let (inner, width) = self.construct(inner);
                if width == 1 {
                    (inner.not(), 1)
                } else {
                    (inner.bvnot(), width)
                }
            }

            Expr::Binary(op, l, r) => self.construct_binary(*op, l, r),
            Expr::Cmp(op, l, r) => self.construct_compare(*op, l, r),

            Expr::FExt { src, width, rm } => {
                let (src, src_width) = self.construct(src);
                let rm = self.rounding(*rm);

                if *width == FL80 {
                    let number = src.fp_to_fp(&rm, &self.f80_sort());
                    return (self.f80_pack_normal(&number), FL80);
                }

                let sort = self.fp_sort_for_width(*width);
                if src_width == FL80 {
                    // Widening an unnormal yields NaN.
                    let wrong = self.f80_wrong_hidden_bit(&src);
                    let number = self.f80_number(&src);
                    (
                        wrong.ite(&self.ctx.fp_nan(&sort), &number.fp_to_fp(&rm, &sort)),
                        *width,
                    )
                } else {
                    (src.fp_to_fp(&rm, &sort), *width)
                }
            }

            Expr::FToU { src, width, rm } => {
                let (src, src_width) = self.construct(src);
                let rm = self.rounding(*rm);

                if src_width == FL80 {
                    let wrong = self.f80_wrong_hidden_bit(&src);
                    let number = self.f80_number(&src);
                    (
                        wrong.ite(&self.bv_zero(*width), &number.fp_to_ubv(&rm, *width)),
                        *width,
                    )
                } else {
                    (src.fp_to_ubv(&rm, *width), *width)
                }
            }

            Expr::FToS { src, width, rm } => {
                let (src, src_width) = self.construct(src);
                let rm = self.rounding(*rm);

                if src_width == FL80 {
                    let wrong = self.f80_wrong_hidden_bit(&src);
                    let number = self.f80_number(&src);
                    // x87 stores INT_MIN for int-sized targets and zero
                    // for everything else when the operand is unnormal.
                    let on_wrong = match *width {
                        INT32 => self.bv_sext_const(INT32, i32::MIN as i64 as u64),
                        INT64 => self.bv_sext_const(INT64, i64::MIN as u64),
                        w => self.bv_zero(w),
                    };
                    (
                        wrong.ite(&on_wrong, &number.fp_to_sbv(&rm, *width)),
                        *width,
                    )
                } else {
                    (src.fp_to_sbv(&rm, *width), *width)
                }
            }

            Expr::UToF { src, width, rm } => {
                let (src, _) = self.construct(src);
                let rm = self.rounding(*rm);

                if *width == FL80 {
                    let number = self.ctx.fp_from_ubv(&rm, &src, &self.f80_sort());
                    return (self.f80_pack_normal(&number), FL80);
                }

                let sort = self.fp_sort_for_width(*width);
                (self.ctx.fp_from_ubv(&rm, &src, &sort), *width)
            }

            Expr::SToF { src, width, rm } => {
                let (src, _) = self.construct(src);
                let rm = self.rounding(*rm);

                if *width == FL80 {
                    let number = self.ctx.fp_from_sbv(&rm, &src, &self.f80_sort());
                    return (self.f80_pack_normal(&number), FL80);
                }

                let sort = self.fp_sort_for_width(*width);
                (self.ctx.fp_from_sbv(&rm, &src, &sort), *width)
            }

            Expr::BitsToFloat(src) => {
                let (src, width) = self.construct(src);

                if width == FL80 {
                    // Drop the explicit integer bit to reach the 79-bit
                    // sort; its disagreement with the canonical value is
                    // recorded in the sentinel cell instead.
                    let sign = src.extract(79, 79);
                    let exp = src.extract(78, 64);
                    let hidden_bit = src.extract(63, 63);
                    let mnt = src.extract(62, 0);

                    let canonical = exp
                        .bvredor()
                        .eq(&self.bv_zero(1))
                        .ite(&self.bv_zero(1), &self.bv_one(1));
                    let correct_hidden_bit = hidden_bit.eq(&canonical);

                    let sort = self.f80_sort();
                    let number = self
                        .ctx
                        .fp_from_bv(&sign.concat(&exp).concat(&mnt), &sort);
                    let sentinel =
                        correct_hidden_bit.ite(&self.ctx.fp_zero(&sort), &self.ctx.fp_nan(&sort));
                    return (self.f80_pack(&number, &sentinel), FL80);
                }

                let sort = self.fp_sort_for_width(width);
                (self.ctx.fp_from_bv(&src, &sort), width)
            }

            Expr::FloatToBits(src) => {
                let (src, width) = self.construct(src);

                if width == FL80 {
                    let ieee = self.f80_number(&src).fp_to_ieee_bv();

                    let sign = ieee.extract(78, 78);
                    let exp = ieee.extract(77, 63);
                    let mnt = ieee.extract(62, 0);

                    // A zero exponent forces the integer bit to 0, any
                    // other exponent forces it to 1.
                    let hidden_bit = exp
                        .bvredor()
                        .eq(&self.bv_zero(1))
                        .ite(&self.bv_zero(1), &self.bv_one(1));

                    let ret = sign.concat(&exp).concat(&hidden_bit).concat(&mnt);
                    return (ret, FL80);
                }

                (src.fp_to_ieee_bv(), width)
            }

            Expr::FAbs(inner) => {
                let (inner, width) = self.construct(inner);
                assert!(
                    matches!(width, FL32 | FL64 | FL80),
                    "non-float argument to FAbs"
                );

                if width == FL80 {
                    // Only the sign bit changes; the sentinel cell keeps
                    // whatever unnormal state the operand carried.
                    let number = self.f80_number(&inner).fp_abs();
                    (inner.store(&self.bv_zero(1), &number), FL80)
                } else {
                    (inner.fp_abs(), width)
                }
            }

            Expr::FClassify(kind, inner) => self.construct_classify(*kind, inner),

            Expr::FUnary(op, rm, inner) => {
                let (inner, width) = self.construct(inner);
                assert!(
                    matches!(width, FL32 | FL64 | FL80),
                    "non-float argument to {:?}",
                    op
                );
                let rm = self.rounding(*rm);

                if width == FL80 {
                    let wrong = self.f80_wrong_hidden_bit(&inner);
                    let number = self.f80_number(&inner);
                    let native = match op {
                        FUnOp::Sqrt => number.fp_sqrt(&rm),
                        FUnOp::NearbyInt => number.fp_round_to_integral(&rm),
                    };
                    let sort = self.f80_sort();
                    let result = wrong.ite(&self.ctx.fp_nan(&sort), &native);
                    (self.f80_pack_normal(&result), FL80)
                } else {
                    let result = match op {
                        FUnOp::Sqrt => inner.fp_sqrt(&rm),
                        FUnOp::NearbyInt => inner.fp_round_to_integral(&rm),
                    };
                    (result, width)
                }
            }

            Expr::FBinary(op, rm, l, r) => {
                let (left, width) = self.construct(l);
                let (right, _) = self.construct(r);
                assert!(
                    matches!(width, FL32 | FL64 | FL80),
                    "non-float argument to {:?}",
                    op
                );
                let rm = self.rounding(*rm);

                if width == FL80 {
                    let wrong_left = self.f80_wrong_hidden_bit(&left);
                    let wrong_right = self.f80_wrong_hidden_bit(&right);
                    let left = self.f80_number(&left);
                    let right = self.f80_number(&right);
                    let sort = self.f80_sort();

                    let result = match op {
                        // min/max skip unnormal operands: one unnormal
                        // yields the other operand, two yield the left.
                        FBinOp::Min | FBinOp::Max => {
                            let native = match op {
                                FBinOp::Min => left.fp_min(&right),
                                _ => left.fp_max(&right),
                            };
                            wrong_left.ite(
                                &wrong_right.ite(&left, &right),
                                &wrong_right.ite(&left, &native),
                            )
                        }
                        _ => {
                            let native = match op {
                                FBinOp::Add => left.fp_add(&rm, &right),
                                FBinOp::Sub => left.fp_sub(&rm, &right),
                                FBinOp::Mul => left.fp_mul(&rm, &right),
                                FBinOp::Div => left.fp_div(&rm, &right),
                                FBinOp::Rem => left.fp_rem(&right),
                                FBinOp::Min | FBinOp::Max => unreachable!(),
                            };
                            let wrong = wrong_left.or2(&wrong_right);
                            wrong.ite(&self.ctx.fp_nan(&sort), &native)
                        }
                    };
                    (self.f80_pack_normal(&result), FL80)
                } else {
                    let result = match op {
                        FBinOp::Add => left.fp_add(&rm, &right),
                        FBinOp::Sub => left.fp_sub(&rm, &right),
                        FBinOp::Mul => left.fp_mul(&rm, &right),
                        FBinOp::Div => left.fp_div(&rm, &right),
                        FBinOp::Rem => left.fp_rem(&right),
                        FBinOp::Min => left.fp_min(&right),
                        FBinOp::Max => left.fp_max(&right),
                    };
                    (result, width)
                }
            }

            Expr::FCmp(op, l, r) => self.construct_float_compare(*op, l, r),
        }
    }

    fn construct_binary(&mut self, op: BinOp, l: &SymExpr, r: &SymExpr) -> (AstHandle<'ctx>, u32) {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::SDiv | BinOp::SRem => {
                let (left, width) = self.construct(l);
                let (right, _) = self.construct(r);
                assert!(width != 1, "uncanonicalized {:?}", op);
                let result = match op {
                    BinOp::Add => left.bvadd(&right),
                    BinOp::Sub => left.bvsub(&right),
                    BinOp::Mul => left.bvmul(&right),
                    BinOp::SDiv => left.bvsdiv(&right),
                    // The sign of srem follows the dividend, both here
                    // and in the source IR.
                    BinOp::SRem => left.bvsrem(&right),
                    _ => unreachable!(),
                };
                assert!(result.bv_width() == width, "width mismatch on {:?}", op);
                (result, width)
            }

            BinOp::UDiv => {
                let (left, width) = self.construct(l);
                assert!(width != 1, "uncanonicalized udiv");

                if let Some(shift) = r.as_bv_const().and_then(|c| c.pow2_shift()) {
                    return (self.bv_right_shift(&left, shift), width);
                }

                let (right, _) = self.construct(r);
                let result = left.bvudiv(&right);
                assert!(result.bv_width() == width, "width mismatch on udiv");
                (result, width)
            }

            BinOp::URem => {
                let (left, width) = self.construct(l);
                assert!(width != 1, "uncanonicalized urem");

                if let Some(bits) = r.as_bv_const().and_then(|c| c.pow2_shift()) {
                    // Remainder by one, or else the extract below would
                    // run off the low end.
                    return if bits == 0 {
                        (self.bv_zero(width), width)
                    } else {
                        (
                            self.bv_zero(width - bits).concat(&left.extract(bits - 1, 0)),
                            width,
                        )
                    };
                }

                let (right, _) = self.construct(r);
                let result = left.bvurem(&right);
                assert!(result.bv_width() == width, "width mismatch on urem");
                (result, width)
            }

            BinOp::And | BinOp::Or | BinOp::Xor => {
                let (left, width) = self.construct(l);
                let (right, _) = self.construct(r);
                let result = if width == 1 {
                    match op {
                        BinOp::And => left.and2(&right),
                        BinOp::Or => left.or2(&right),
                        // Boolean xor, spelled with primitives every
                        // backend has.
                        BinOp::Xor => left.ite(&right.not(), &right),
                        _ => unreachable!(),
                    }
                } else {
                    match op {
                        BinOp::And => left.bvand(&right),
                        BinOp::Or => left.bvor(&right),
                        BinOp::Xor => left.bvxor(&right),
                        _ => unreachable!(),
                    }
                };
                (result, width)
            }

            BinOp::Shl => {
                let (left, width) = self.construct(l);
                assert!(width != 1, "uncanonicalized shl");

                if let Some(c) = r.as_bv_const() {
                    let shift = c.low_u64_saturating().min(width as u64) as u32;
                    (self.bv_left_shift(&left, shift), width)
                } else {
                    let (amount, _) = self.construct(r);
                    (self.bv_var_left_shift(&left, &amount), width)
                }
            }

            BinOp::LShr => {
                let (left, width) = self.construct(l);
                assert!(width != 1, "uncanonicalized lshr");

                if let Some(c) = r.as_bv_const() {
                    let shift = c.low_u64_saturating().min(width as u64) as u32;
                    (self.bv_right_shift(&left, shift), width)
                } else {
                    let (amount, _) = self.construct(r);
                    (self.bv_var_right_shift(&left, &amount), width)
                }
            }

            BinOp::AShr => {
                let (left, width) = self.construct(l);
                assert!(width != 1, "uncanonicalized ashr");

                if let Some(c) = r.as_bv_const() {
                    let shift = c.low_u64_saturating().min(width as u64) as u32;
                    let sign = self.bv_bool_extract(&left, width - 1);
                    (self.bv_ashr_by_const(&left, shift, &sign), width)
                } else {
                    let (amount, _) = self.construct(r);
                    (self.bv_var_arith_right_shift(&left, &amount), width)
                }
            }
        }
    }

    fn construct_compare(&mut self, op: CmpOp, l: &SymExpr, r: &SymExpr) -> (AstHandle<'ctx>, u32) {
        match op {
            CmpOp::Eq => {
                let (left, width) = self.construct(l);
                let (right, _) = self.construct(r);
                let result = if width == 1 {
                    // Canonicalisation keeps constants on the left, so a
                    // Boolean equality against a literal folds away.
                    if let Some(c) = l.as_bv_const() {
                        if c.is_true() {
                            right
                        } else {
                            right.not()
                        }
                    } else {
                        left.iff(&right)
                    }
                } else {
                    left.eq(&right)
                };
                (result, 1)
            }

            CmpOp::Ult | CmpOp::Ule | CmpOp::Slt | CmpOp::Sle => {
                let (left, width) = self.construct(l);
                let (right, _) = self.construct(r);
                assert!(width != 1, "uncanonicalized {:?}", op);
                let result = match op {
                    CmpOp::Ult => left.bvult(&right),
                    CmpOp::Ule => left.bvule(&right),
                    CmpOp::Slt => left.bvslt(&right),
                    CmpOp::Sle => left.bvsle(&right),
                    _ => unreachable!(),
                };
                (result, 1)
            }

            CmpOp::Ne | CmpOp::Ugt | CmpOp::Uge | CmpOp::Sgt | CmpOp::Sge => {
                panic!(
                    "unhandled expression kind {:?}: comparison should have been canonicalised away",
                    op
                )
            }
        }
    }

    fn construct_classify(&mut self, kind: ClassKind, e: &SymExpr) -> (AstHandle<'ctx>, u32) {
        let (expr, width) = self.construct(e);
        assert!(
            matches!(width, FL32 | FL64 | FL80),
            "non-float argument to {:?}",
            kind
        );
        let out = 32;

        if kind == ClassKind::IsInf {
            // The only classifier that notices unnormals.
            let (wrong, number) = if width == FL80 {
                (
                    Some(self.f80_wrong_hidden_bit(&expr)),
                    self.f80_number(&expr),
                )
            } else {
                (None, expr)
            };

            let signed = number.fp_is_infinite().ite(
                &number
                    .fp_is_negative()
                    .ite(&self.bv_minus_one(out), &self.bv_one(out)),
                &self.bv_zero(out),
            );
            let result = match wrong {
                Some(wrong) => wrong.ite(&self.bv_zero(out), &signed),
                None => signed,
            };
            return (result, out);
        }

        let number = if width == FL80 {
            self.f80_number(&expr)
        } else {
            expr
        };

        let result = match kind {
            ClassKind::Classify => number.fp_is_nan().ite(
                &self.bv_sext_const(out, FP_NAN),
                &number.fp_is_infinite().ite(
                    &self.bv_sext_const(out, FP_INFINITE),
                    &number.fp_is_zero().ite(
                        &self.bv_sext_const(out, FP_ZERO),
                        &number.fp_is_subnormal().ite(
                            &self.bv_sext_const(out, FP_SUBNORMAL),
                            &self.bv_sext_const(out, FP_NORMAL),
                        ),
                    ),
                ),
            ),
            ClassKind::IsFinite => number
                .fp_is_nan()
                .or2(&number.fp_is_infinite())
                .ite(&self.bv_zero(out), &self.bv_one(out)),
            ClassKind::IsNan => number
                .fp_is_nan()
                .ite(&self.bv_one(out), &self.bv_zero(out)),
            ClassKind::IsInf => unreachable!(),
        };
        (result, out)
    }

    fn construct_float_compare(
        &mut self,
        op: FCmpOp,
        l: &SymExpr,
        r: &SymExpr,
    ) -> (AstHandle<'ctx>, u32) {
        let (left, width) = self.construct(l);
        let (right, _) = self.construct(r);
        assert!(
            matches!(width, FL32 | FL64 | FL80),
            "non-float argument to {:?}",
            op
        );

        // Ordered-ness tests never look at the unnormal state.
        if matches!(op, FCmpOp::Ord | FCmpOp::Uno) {
            let (left, right) = if width == FL80 {
                (self.f80_number(&left), self.f80_number(&right))
            } else {
                (left, right)
            };
            let result = match op {
                FCmpOp::Ord => left.fp_is_nan().not().and2(&right.fp_is_nan().not()),
                _ => left.fp_is_nan().or2(&right.fp_is_nan()),
            };
            return (result, 1);
        }

        let result = if width == FL80 {
            let wrong = self
                .f80_wrong_hidden_bit(&left)
                .or2(&self.f80_wrong_hidden_bit(&right));
            let left = self.f80_number(&left);
            let right = self.f80_number(&right);

            match op {
                FCmpOp::Oeq => wrong.not().and2(&left.fp_eq(&right)),
                FCmpOp::Ogt => wrong.not().and2(&left.fp_gt(&right)),
                FCmpOp::Oge => wrong.not().and2(&left.fp_geq(&right)),
                FCmpOp::Olt => wrong.not().and2(&left.fp_lt(&right)),
                FCmpOp::Ole => wrong.not().and2(&left.fp_leq(&right)),
                FCmpOp::Ueq => wrong
                    .not()
                    .and2(&left.fp_is_nan().or3(&right.fp_is_nan(), &left.fp_eq(&right))),
                FCmpOp::Ugt => wrong
                    .not()
                    .and2(&left.fp_is_nan().or3(&right.fp_is_nan(), &left.fp_gt(&right))),
                FCmpOp::Uge => wrong
                    .not()
                    .and2(&left.fp_is_nan().or3(&right.fp_is_nan(), &left.fp_geq(&right))),
                FCmpOp::Ult => wrong
                    .not()
                    .and2(&left.fp_is_nan().or3(&right.fp_is_nan(), &left.fp_lt(&right))),
                FCmpOp::Ule => wrong
                    .not()
                    .and2(&left.fp_is_nan().or3(&right.fp_is_nan(), &left.fp_leq(&right))),
                // Not-equal is the one comparison an unnormal satisfies,
                // in both its ordered and unordered forms.
                FCmpOp::Une => wrong.or2(&left.fp_eq(&right).not()),
                FCmpOp::One => wrong.or2(
                    &left
                        .fp_is_nan()
                        .or3(&right.fp_is_nan(), &left.fp_eq(&right))
                        .not(),
                ),
                FCmpOp::Ord | FCmpOp::Uno => unreachable!(),
            }
        } else {
            match op {
                FCmpOp::Oeq => left.fp_eq(&right),
                FCmpOp::Ogt => left.fp_gt(&right),
                FCmpOp::Oge => left.fp_geq(&right),
                FCmpOp::Olt => left.fp_lt(&right),
                FCmpOp::Ole => left.fp_leq(&right),
                FCmpOp::Ueq => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_eq(&right)),
                FCmpOp::Ugt => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_gt(&right)),
                FCmpOp::Uge => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_geq(&right)),
                FCmpOp::Ult => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_lt(&right)),
                FCmpOp::Ule => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_leq(&right)),
                FCmpOp::Une => left.fp_eq(&right).not(),
                FCmpOp::One => left
                    .fp_is_nan()
                    .or3(&right.fp_is_nan(), &left.fp_eq(&right))
                    .not(),
                FCmpOp::Ord | FCmpOp::Uno => unreachable!(),
            }
        };

        (result, 1)
    }
}
