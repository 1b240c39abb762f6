use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_uint;

use z3_sys::*;

use crate::expr::RoundingMode;

/// Wrapper around `Z3_config`; `Z3_del_config` runs on drop.
pub struct Config {
    z3_cfg: Z3_config,
}

impl Config {
    pub fn new() -> Self {
        unsafe { Config { z3_cfg: Z3_mk_config() } }
    }

    pub fn set_param_value(&self, id: &str, value: &str) {
        let id = CString::new(id).unwrap();
        let value = CString::new(value).unwrap();
        unsafe { Z3_set_param_value(self.z3_cfg, id.as_ptr(), value.as_ptr()) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        unsafe { Z3_del_config(self.z3_cfg) }
    }
}

/// The value Z3 reports when a query is cancelled from outside (a timeout
/// set by the caller). Cancellation is not a usage error, so the error
/// hook lets it pass; the outcome surfaces through the check result.
const CANCELLED_MSG: &str = "canceled";

unsafe extern "C" fn error_hook(ctx: Z3_context, code: ErrorCode) {
    let msg = CStr::from_ptr(Z3_get_error_msg(ctx, code));
    if msg.to_str() == Ok(CANCELLED_MSG) {
        return;
    }
    eprintln!("fatal Z3 error [{:?}]: {}", code, msg.to_string_lossy());
    std::process::abort();
}

/// Wrapper around a reference-counted `Z3_context`.
///
/// The context is created in manual-refcount mode so that terms held in
/// the translation caches stay alive across solver calls; every term and
/// sort that leaves this module is wrapped in a handle that owns one
/// reference.
pub struct Context {
    z3_ctx: Z3_context,
}

impl Context {
    pub fn new(cfg: Config) -> Self {
        unsafe {
            let z3_ctx = Z3_mk_context_rc(cfg.z3_cfg);
            Z3_set_error_handler(z3_ctx, Some(error_hook));
            Z3_set_ast_print_mode(z3_ctx, AstPrintMode::SmtLib2Compliant);
            Context { z3_ctx }
        }
    }

    pub(crate) fn raw(&self) -> Z3_context {
        self.z3_ctx
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::new())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe { Z3_del_context(self.z3_ctx) }
    }
}

/// An owned reference to a Z3 sort.
pub struct SortHandle<'ctx> {
    z3_sort: Z3_sort,
    ctx: &'ctx Context,
}

impl<'ctx> SortHandle<'ctx> {
    pub(crate) unsafe fn wrap(ctx: &'ctx Context, z3_sort: Z3_sort) -> Self {
        Z3_inc_ref(ctx.z3_ctx, Z3_sort_to_ast(ctx.z3_ctx, z3_sort));
        SortHandle { z3_sort, ctx }
    }
}

impl<'ctx> Clone for SortHandle<'ctx> {
    fn clone(&self) -> Self {
        unsafe { Self::wrap(self.ctx, self.z3_sort) }
    }
}

impl<'ctx> Drop for SortHandle<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_dec_ref(self.ctx.z3_ctx, Z3_sort_to_ast(self.ctx.z3_ctx, self.z3_sort)) }
    }
}

/// An owned reference to a Z3 term. Construction and `Clone` increment
/// the context's count for the wrapped term, `Drop` decrements it, so a
/// handle is valid for exactly as long as it is held.
pub struct AstHandle<'ctx> {
    z3_ast: Z3_ast,
    ctx: &'ctx Context,
}

impl<'ctx> Clone for AstHandle<'ctx> {
    fn clone(&self) -> Self {
        unsafe { Self::wrap(self.ctx, self.z3_ast) }
    }
}

impl<'ctx> Drop for AstHandle<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_dec_ref(self.ctx.z3_ctx, self.z3_ast) }
    }
}

impl<'ctx> fmt::Display for AstHandle<'ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = unsafe { CStr::from_ptr(Z3_ast_to_string(self.ctx.z3_ctx, self.z3_ast)) };
        write!(f, "{}", s.to_string_lossy())
    }
}

impl<'ctx> fmt::Debug for AstHandle<'ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

macro_rules! z3_unop {
    ($(#[$attr:meta])* $f:ident, $mk:ident) => {
        $(#[$attr])*
        pub fn $f(&self) -> Self {
            unsafe { Self::wrap(self.ctx, $mk(self.ctx.z3_ctx, self.z3_ast)) }
        }
    };
}

macro_rules! z3_binop {
    ($(#[$attr:meta])* $f:ident, $mk:ident) => {
        $(#[$attr])*
        pub fn $f(&self, rhs: &AstHandle<'ctx>) -> Self {
            unsafe { Self::wrap(self.ctx, $mk(self.ctx.z3_ctx, self.z3_ast, rhs.z3_ast)) }
        }
    };
}

macro_rules! z3_rm_unop {
    ($(#[$attr:meta])* $f:ident, $mk:ident) => {
        $(#[$attr])*
        pub fn $f(&self, rm: &AstHandle<'ctx>) -> Self {
            unsafe { Self::wrap(self.ctx, $mk(self.ctx.z3_ctx, rm.z3_ast, self.z3_ast)) }
        }
    };
}

macro_rules! z3_rm_binop {
    ($(#[$attr:meta])* $f:ident, $mk:ident) => {
        $(#[$attr])*
        pub fn $f(&self, rm: &AstHandle<'ctx>, rhs: &AstHandle<'ctx>) -> Self {
            unsafe {
                Self::wrap(self.ctx, $mk(self.ctx.z3_ctx, rm.z3_ast, self.z3_ast, rhs.z3_ast))
            }
        }
    };
}

impl<'ctx> AstHandle<'ctx> {
    pub(crate) unsafe fn wrap(ctx: &'ctx Context, z3_ast: Z3_ast) -> Self {
        Z3_inc_ref(ctx.z3_ctx, z3_ast);
        AstHandle { z3_ast, ctx }
    }

    pub(crate) fn raw(&self) -> Z3_ast {
        self.z3_ast
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    z3_unop!(not, Z3_mk_not);
    z3_binop!(eq, Z3_mk_eq);

    pub fn and2(&self, rhs: &AstHandle<'ctx>) -> Self {
        unsafe {
            let args = [self.z3_ast, rhs.z3_ast];
            Self::wrap(self.ctx, Z3_mk_and(self.ctx.z3_ctx, 2, args.as_ptr()))
        }
    }

    pub fn or2(&self, rhs: &AstHandle<'ctx>) -> Self {
        unsafe {
            let args = [self.z3_ast, rhs.z3_ast];
            Self::wrap(self.ctx, Z3_mk_or(self.ctx.z3_ctx, 2, args.as_ptr()))
        }
    }

    pub fn or3(&self, second: &AstHandle<'ctx>, third: &AstHandle<'ctx>) -> Self {
        unsafe {
            let args = [self.z3_ast, second.z3_ast, third.z3_ast];
            Self::wrap(self.ctx, Z3_mk_or(self.ctx.z3_ctx, 3, args.as_ptr()))
        }
    }

    pub fn iff(&self, rhs: &AstHandle<'ctx>) -> Self {
        assert!(
            self.is_bool() && rhs.is_bool(),
            "iff applied to non-Boolean operands"
        );
        unsafe { Self::wrap(self.ctx, Z3_mk_iff(self.ctx.z3_ctx, self.z3_ast, rhs.z3_ast)) }
    }

    pub fn ite(&self, on_true: &AstHandle<'ctx>, on_false: &AstHandle<'ctx>) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_ite(self.ctx.z3_ctx, self.z3_ast, on_true.z3_ast, on_false.z3_ast),
            )
        }
    }

    z3_unop!(bvnot, Z3_mk_bvnot);
    z3_unop!(bvredor, Z3_mk_bvredor);
    z3_binop!(bvand, Z3_mk_bvand);
    z3_binop!(bvor, Z3_mk_bvor);
    z3_binop!(bvxor, Z3_mk_bvxor);
    z3_binop!(bvadd, Z3_mk_bvadd);
    z3_binop!(bvsub, Z3_mk_bvsub);
    z3_binop!(bvmul, Z3_mk_bvmul);
    z3_binop!(bvudiv, Z3_mk_bvudiv);
    z3_binop!(bvsdiv, Z3_mk_bvsdiv);
    z3_binop!(bvurem, Z3_mk_bvurem);
    z3_binop!(bvsrem, Z3_mk_bvsrem);
    z3_binop!(bvult, Z3_mk_bvult);
    z3_binop!(bvule, Z3_mk_bvule);
    z3_binop!(bvslt, Z3_mk_bvslt);
    z3_binop!(bvsle, Z3_mk_bvsle);
    z3_binop!(concat, Z3_mk_concat);

    pub fn extract(&self, high: u32, low: u32) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_extract(self.ctx.z3_ctx, high as c_uint, low as c_uint, self.z3_ast),
            )
        }
    }

    /// Sign-extend by `extra` additional bits.
    pub fn sign_ext(&self, extra: u32) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_sign_ext(self.ctx.z3_ctx, extra as c_uint, self.z3_ast),
            )
        }
    }

    pub fn select(&self, index: &AstHandle<'ctx>) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_select(self.ctx.z3_ctx, self.z3_ast, index.z3_ast),
            )
        }
    }

    pub fn store(&self, index: &AstHandle<'ctx>, value: &AstHandle<'ctx>) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_store(self.ctx.z3_ctx, self.z3_ast, index.z3_ast, value.z3_ast),
            )
        }
    }

    z3_unop!(fp_is_nan, Z3_mk_fpa_is_nan);
    z3_unop!(fp_is_infinite, Z3_mk_fpa_is_infinite);
    z3_unop!(fp_is_zero, Z3_mk_fpa_is_zero);
    z3_unop!(fp_is_subnormal, Z3_mk_fpa_is_subnormal);
    z3_unop!(fp_is_negative, Z3_mk_fpa_is_negative);
    z3_unop!(fp_abs, Z3_mk_fpa_abs);
    z3_unop!(fp_to_ieee_bv, Z3_mk_fpa_to_ieee_bv);

    z3_rm_unop!(fp_sqrt, Z3_mk_fpa_sqrt);
    z3_rm_unop!(fp_round_to_integral, Z3_mk_fpa_round_to_integral);

    z3_rm_binop!(fp_add, Z3_mk_fpa_add);
    z3_rm_binop!(fp_sub, Z3_mk_fpa_sub);
    z3_rm_binop!(fp_mul, Z3_mk_fpa_mul);
    z3_rm_binop!(fp_div, Z3_mk_fpa_div);

    z3_binop!(fp_rem, Z3_mk_fpa_rem);
    z3_binop!(fp_min, Z3_mk_fpa_min);
    z3_binop!(fp_max, Z3_mk_fpa_max);
    z3_binop!(fp_eq, Z3_mk_fpa_eq);
    z3_binop!(fp_lt, Z3_mk_fpa_lt);
    z3_binop!(fp_leq, Z3_mk_fpa_leq);
    z3_binop!(fp_gt, Z3_mk_fpa_gt);
    z3_binop!(fp_geq, Z3_mk_fpa_geq);

    pub fn fp_to_ubv(&self, rm: &AstHandle<'ctx>, width: u32) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_fpa_to_ubv(self.ctx.z3_ctx, rm.z3_ast, self.z3_ast, width as c_uint),
            )
        }
    }

    pub fn fp_to_sbv(&self, rm: &AstHandle<'ctx>, width: u32) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_fpa_to_sbv(self.ctx.z3_ctx, rm.z3_ast, self.z3_ast, width as c_uint),
            )
        }
    }

    /// Convert between floating-point sorts under a rounding mode.
    pub fn fp_to_fp(&self, rm: &AstHandle<'ctx>, sort: &SortHandle<'ctx>) -> Self {
        unsafe {
            Self::wrap(
                self.ctx,
                Z3_mk_fpa_to_fp_float(self.ctx.z3_ctx, rm.z3_ast, self.z3_ast, sort.z3_sort),
            )
        }
    }

    /// The width of this term's bitvector sort.
    pub fn bv_width(&self) -> u32 {
        unsafe {
            Z3_get_bv_sort_size(
                self.ctx.z3_ctx,
                Z3_get_sort(self.ctx.z3_ctx, self.z3_ast),
            ) as u32
        }
    }

    pub fn is_bool(&self) -> bool {
        unsafe {
            Z3_get_sort_kind(
                self.ctx.z3_ctx,
                Z3_get_sort(self.ctx.z3_ctx, self.z3_ast),
            ) == SortKind::Bool
        }
    }
}

impl Context {
    pub fn bv_sort(&self, width: u32) -> SortHandle<'_> {
        unsafe { SortHandle::wrap(self, Z3_mk_bv_sort(self.z3_ctx, width as c_uint)) }
    }

    pub fn array_sort(&self, domain: &SortHandle<'_>, range: &SortHandle<'_>) -> SortHandle<'_> {
        unsafe {
            SortHandle::wrap(
                self,
                Z3_mk_array_sort(self.z3_ctx, domain.z3_sort, range.z3_sort),
            )
        }
    }

    pub fn fpa_sort(&self, ebits: u32, sbits: u32) -> SortHandle<'_> {
        unsafe {
            SortHandle::wrap(
                self,
                Z3_mk_fpa_sort(self.z3_ctx, ebits as c_uint, sbits as c_uint),
            )
        }
    }

    pub fn mk_true(&self) -> AstHandle<'_> {
        unsafe { AstHandle::wrap(self, Z3_mk_true(self.z3_ctx)) }
    }

    pub fn mk_false(&self) -> AstHandle<'_> {
        unsafe { AstHandle::wrap(self, Z3_mk_false(self.z3_ctx)) }
    }

    pub fn bv_u32(&self, width: u32, value: u32) -> AstHandle<'_> {
        let sort = self.bv_sort(width);
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_unsigned_int(self.z3_ctx, value as c_uint, sort.z3_sort),
            )
        }
    }

    pub fn bv_u64(&self, width: u32, value: u64) -> AstHandle<'_> {
        let sort = self.bv_sort(width);
        unsafe { AstHandle::wrap(self, Z3_mk_unsigned_int64(self.z3_ctx, value, sort.z3_sort)) }
    }

    pub fn bv_i64(&self, width: u32, value: i64) -> AstHandle<'_> {
        let sort = self.bv_sort(width);
        unsafe { AstHandle::wrap(self, Z3_mk_int64(self.z3_ctx, value, sort.z3_sort)) }
    }

    /// A named constant of the given sort. Equal name and sort yield the
    /// same underlying Z3 declaration.
    pub fn named_const(&self, name: &str, sort: &SortHandle<'_>) -> AstHandle<'_> {
        let name = CString::new(name).unwrap();
        unsafe {
            let symbol = Z3_mk_string_symbol(self.z3_ctx, name.as_ptr());
            AstHandle::wrap(self, Z3_mk_const(self.z3_ctx, symbol, sort.z3_sort))
        }
    }

    pub fn fp_nan(&self, sort: &SortHandle<'_>) -> AstHandle<'_> {
        unsafe { AstHandle::wrap(self, Z3_mk_fpa_nan(self.z3_ctx, sort.z3_sort)) }
    }

    pub fn fp_zero(&self, sort: &SortHandle<'_>) -> AstHandle<'_> {
        unsafe { AstHandle::wrap(self, Z3_mk_fpa_zero(self.z3_ctx, sort.z3_sort, false)) }
    }

    /// Assemble a float from sign, exponent and significand bitvectors.
    pub fn fp_from_parts(
        &self,
        sign: &AstHandle<'_>,
        exponent: &AstHandle<'_>,
        significand: &AstHandle<'_>,
    ) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_fp(self.z3_ctx, sign.z3_ast, exponent.z3_ast, significand.z3_ast),
            )
        }
    }

    pub fn fp_numeral_f32(&self, value: f32, sort: &SortHandle<'_>) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_numeral_float(self.z3_ctx, value, sort.z3_sort),
            )
        }
    }

    pub fn fp_numeral_f64(&self, value: f64, sort: &SortHandle<'_>) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_numeral_double(self.z3_ctx, value, sort.z3_sort),
            )
        }
    }

    pub fn fp_from_bv(&self, bv: &AstHandle<'_>, sort: &SortHandle<'_>) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_to_fp_bv(self.z3_ctx, bv.z3_ast, sort.z3_sort),
            )
        }
    }

    pub fn fp_from_ubv(
        &self,
        rm: &AstHandle<'_>,
        bv: &AstHandle<'_>,
        sort: &SortHandle<'_>,
    ) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_to_fp_unsigned(self.z3_ctx, rm.z3_ast, bv.z3_ast, sort.z3_sort),
            )
        }
    }

    pub fn fp_from_sbv(
        &self,
        rm: &AstHandle<'_>,
        bv: &AstHandle<'_>,
        sort: &SortHandle<'_>,
    ) -> AstHandle<'_> {
        unsafe {
            AstHandle::wrap(
                self,
                Z3_mk_fpa_to_fp_signed(self.z3_ctx, rm.z3_ast, bv.z3_ast, sort.z3_sort),
            )
        }
    }

    pub fn rounding_mode(&self, rm: RoundingMode) -> AstHandle<'_> {
        unsafe {
            let ast = match rm {
                RoundingMode::NearestTiesToEven => {
                    Z3_mk_fpa_round_nearest_ties_to_even(self.z3_ctx)
                }
                RoundingMode::TowardPositive => Z3_mk_fpa_round_toward_positive(self.z3_ctx),
                RoundingMode::TowardNegative => Z3_mk_fpa_round_toward_negative(self.z3_ctx),
                RoundingMode::TowardZero => Z3_mk_fpa_round_toward_zero(self.z3_ctx),
                RoundingMode::NearestTiesToAway => {
                    Z3_mk_fpa_round_nearest_ties_to_away(self.z3_ctx)
                }
            };
            AstHandle::wrap(self, ast)
        }
    }
}
