use std::ffi::CStr;

use thiserror::Error;

use z3_sys::*;

use super::context::{AstHandle, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverError {
    /// The solver gave up, typically because the query was cancelled by
    /// a timeout outside this crate. The payload is Z3's reason string
    /// (`"canceled"` for cancellation).
    #[error("solver returned unknown: {0}")]
    Unknown(String),
}

/// Thin wrapper around one `Z3_solver`: assert translated terms, check,
/// and peek at models. Scoped queries go through `push`/`pop`.
pub struct Z3Solver<'ctx> {
    ctx: &'ctx Context,
    z3_solver: Z3_solver,
}

impl<'ctx> Z3Solver<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        unsafe {
            let z3_solver = Z3_mk_solver(ctx.raw());
            Z3_solver_inc_ref(ctx.raw(), z3_solver);
            Z3Solver { ctx, z3_solver }
        }
    }

    pub fn assert(&mut self, ast: &AstHandle<'ctx>) {
        unsafe { Z3_solver_assert(self.ctx.raw(), self.z3_solver, ast.raw()) }
    }

    pub fn push(&mut self) {
        unsafe { Z3_solver_push(self.ctx.raw(), self.z3_solver) }
    }

    pub fn pop(&mut self, n: u32) {
        unsafe { Z3_solver_pop(self.ctx.raw(), self.z3_solver, n) }
    }

    pub fn check(&mut self) -> Result<SatResult, SolverError> {
        let result = unsafe { Z3_solver_check(self.ctx.raw(), self.z3_solver) };
        if result == Z3_L_TRUE {
            Ok(SatResult::Sat)
        } else if result == Z3_L_FALSE {
            Ok(SatResult::Unsat)
        } else {
            let reason = unsafe {
                CStr::from_ptr(Z3_solver_get_reason_unknown(self.ctx.raw(), self.z3_solver))
            };
            Err(SolverError::Unknown(reason.to_string_lossy().into_owned()))
        }
    }

    /// Evaluate a bitvector term in the current model. Only meaningful
    /// directly after a `Sat` check.
    pub fn eval_bv_u64(&mut self, ast: &AstHandle<'ctx>) -> Option<u64> {
        unsafe {
            let model = Z3_solver_get_model(self.ctx.raw(), self.z3_solver);
            if model.is_null() {
                return None;
            }
            Z3_model_inc_ref(self.ctx.raw(), model);

            let mut evaluated: Z3_ast = std::ptr::null_mut();
            let ok = Z3_model_eval(self.ctx.raw(), model, ast.raw(), true, &mut evaluated);
            let value = if ok {
                let evaluated = AstHandle::wrap(self.ctx, evaluated);
                let mut out: u64 = 0;
                if Z3_get_numeral_uint64(self.ctx.raw(), evaluated.raw(), &mut out) {
                    Some(out)
                } else {
                    None
                }
            } else {
                None
            };

            Z3_model_dec_ref(self.ctx.raw(), model);
            value
        }
    }
}

impl<'ctx> Drop for Z3Solver<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_solver_dec_ref(self.ctx.raw(), self.z3_solver) }
    }
}
