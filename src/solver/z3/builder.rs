use fxhash::FxHashMap;

use log::debug;

use crate::expr::{ArrayRef, BvConst, RoundingMode, SymExpr, UpdateNodeRef};

use super::context::{AstHandle, Context, SortHandle};

/// Name under which every 80-bit float encoding allocates its scratch
/// array. Both cells are overwritten before any read, so sharing one
/// underlying constant across encodings is not observable.
pub(crate) const F80_SCRATCH_NAME: &str = "[F80, unnormal]";

/// Symbolic array names are truncated so that name plus uniquifying
/// counter stay within this many characters.
const ARRAY_NAME_BUDGET: usize = 32;

#[derive(Debug, Clone)]
pub struct Z3BuilderOptions {
    /// Memoise translation per IR node. Turning this off keeps the
    /// translator correct but makes it linear in DAG unfoldings.
    pub use_construct_cache: bool,
    /// Drop the construct cache after every top-level `construct` call.
    pub auto_clear_construct_cache: bool,
}

impl Default for Z3BuilderOptions {
    fn default() -> Self {
        Self {
            use_construct_cache: true,
            auto_clear_construct_cache: false,
        }
    }
}

/// Lowers symbolic expressions into Z3 terms.
///
/// One builder owns one context borrow and three memo tables: translated
/// nodes, materialised array roots, and translated update nodes. All
/// handles it hands out live as long as the context borrow.
pub struct Z3Builder<'ctx> {
    pub(crate) ctx: &'ctx Context,
    pub(crate) opts: Z3BuilderOptions,
    pub(crate) constructed: FxHashMap<SymExpr, (AstHandle<'ctx>, u32)>,
    arrays: FxHashMap<ArrayRef, AstHandle<'ctx>>,
    updates: FxHashMap<UpdateNodeRef, AstHandle<'ctx>>,
}

impl<'ctx> Z3Builder<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self::with_options(ctx, Z3BuilderOptions::default())
    }

    pub fn with_options(ctx: &'ctx Context, opts: Z3BuilderOptions) -> Self {
        Self {
            ctx,
            opts,
            constructed: FxHashMap::default(),
            arrays: FxHashMap::default(),
            updates: FxHashMap::default(),
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn get_true(&self) -> AstHandle<'ctx> {
        self.ctx.mk_true()
    }

    pub fn get_false(&self) -> AstHandle<'ctx> {
        self.ctx.mk_false()
    }

    /// Release every handle held by the construct cache. The array and
    /// update caches are left untouched.
    pub fn clear_construct_cache(&mut self) {
        debug!("clearing construct cache ({} entries)", self.constructed.len());
        self.constructed.clear();
    }

    pub(crate) fn bv_const32(&self, width: u32, value: u32) -> AstHandle<'ctx> {
        self.ctx.bv_u32(width, value)
    }

    pub(crate) fn bv_const64(&self, width: u32, value: u64) -> AstHandle<'ctx> {
        self.ctx.bv_u64(width, value)
    }

    pub(crate) fn bv_zero(&self, width: u32) -> AstHandle<'ctx> {
        self.bv_zext_const(width, 0)
    }

    pub(crate) fn bv_one(&self, width: u32) -> AstHandle<'ctx> {
        self.bv_zext_const(width, 1)
    }

    pub(crate) fn bv_minus_one(&self, width: u32) -> AstHandle<'ctx> {
        self.bv_sext_const(width, -1i64 as u64)
    }

    /// A `width`-bit numeral holding `value` zero-extended.
    pub(crate) fn bv_zext_const(&self, width: u32, value: u64) -> AstHandle<'ctx> {
        if width <= 64 {
            return self.bv_const64(width, value);
        }

        let mut expr = self.bv_const64(64, value);
        let zero = self.bv_const64(64, 0);
        let mut width = width - 64;
        while width > 64 {
            expr = zero.concat(&expr);
            width -= 64;
        }
        self.bv_const64(width, 0).concat(&expr)
    }

    /// A `width`-bit numeral holding `value` sign-extended.
    pub(crate) fn bv_sext_const(&self, width: u32, value: u64) -> AstHandle<'ctx> {
        if width <= 64 {
            return self.bv_const64(width, value);
        }

        let fill = if value >> 63 != 0 { -1 } else { 0 };
        self.ctx
            .bv_i64(width - 64, fill)
            .concat(&self.bv_const64(64, value))
    }

    /// An arbitrary-width numeral, emitted 64 bits at a time with the
    /// final chunk sized to the remainder.
    pub(crate) fn bv_const_ast(&self, c: &BvConst) -> AstHandle<'ctx> {
        let width = c.width();
        if width <= 32 {
            return self.bv_const32(width, c.limb(0) as u32);
        }
        if width <= 64 {
            return self.bv_const64(width, c.limb(0));
        }

        let mut res = self.bv_const64(64, c.limb(0));
        let mut emitted = 64;
        while emitted < width {
            let chunk = (width - emitted).min(64);
            res = self
                .bv_const64(chunk, c.limb((emitted / 64) as usize))
                .concat(&res);
            emitted += chunk;
        }
        res
    }

    /// The Boolean value of bit `bit` of a bitvector term.
    pub(crate) fn bv_bool_extract(&self, expr: &AstHandle<'ctx>, bit: u32) -> AstHandle<'ctx> {
        expr.extract(bit, bit).eq(&self.bv_one(1))
    }

    // Logical right shift by a known amount.
    pub(crate) fn bv_right_shift(&self, expr: &AstHandle<'ctx>, shift: u32) -> AstHandle<'ctx> {
        let width = expr.bv_width();

        if shift == 0 {
            expr.clone()
        } else if shift >= width {
            self.bv_zero(width)
        } else {
            self.bv_zero(shift).concat(&expr.extract(width - 1, shift))
        }
    }

    // Logical left shift by a known amount.
    pub(crate) fn bv_left_shift(&self, expr: &AstHandle<'ctx>, shift: u32) -> AstHandle<'ctx> {
        let width = expr.bv_width();

        if shift == 0 {
            expr.clone()
        } else if shift >= width {
            self.bv_zero(width)
        } else {
            expr.extract(width - shift - 1, 0).concat(&self.bv_zero(shift))
        }
    }

    /// Arithmetic right shift by a known amount; `sign` is the Boolean
    /// value of the operand's sign bit.
    pub(crate) fn bv_ashr_by_const(
        &self,
        expr: &AstHandle<'ctx>,
        shift: u32,
        sign: &AstHandle<'ctx>,
    ) -> AstHandle<'ctx> {
        let width = expr.bv_width();

        if shift == 0 {
            expr.clone()
        } else if shift >= width {
            self.bv_zero(width)
        } else {
            sign.ite(
                &self.bv_minus_one(shift).concat(&expr.extract(width - 1, shift)),
                &self.bv_right_shift(expr, shift),
            )
        }
    }

    // Variable shifts lower to a demultiplexed chain of ITEs over every
    // candidate amount, with an outer guard sending over-shifts to zero.

    pub(crate) fn bv_var_left_shift(
        &self,
        expr: &AstHandle<'ctx>,
        shift: &AstHandle<'ctx>,
    ) -> AstHandle<'ctx> {
        let width = expr.bv_width();
        let mut res = self.bv_zero(width);

        for i in (0..width).rev() {
            res = shift
                .eq(&self.bv_const32(width, i))
                .ite(&self.bv_left_shift(expr, i), &res);
        }

        let in_range = shift.bvult(&self.bv_const32(shift.bv_width(), width));
        in_range.ite(&res, &self.bv_zero(width))
    }

    pub(crate) fn bv_var_right_shift(
        &self,
        expr: &AstHandle<'ctx>,
        shift: &AstHandle<'ctx>,
    ) -> AstHandle<'ctx> {
        let width = expr.bv_width();
        let mut res = self.bv_zero(width);

        for i in (0..width).rev() {
            res = shift
                .eq(&self.bv_const32(width, i))
                .ite(&self.bv_right_shift(expr, i), &res);
        }

        let in_range = shift.bvult(&self.bv_const32(shift.bv_width(), width));
        in_range.ite(&res, &self.bv_zero(width))
    }

    pub(crate) fn bv_var_arith_right_shift(
        &self,
        expr: &AstHandle<'ctx>,
        shift: &AstHandle<'ctx>,
    ) -> AstHandle<'ctx> {
        let width = expr.bv_width();

        // The sign bit is extracted once and shared by every arm.
        let sign = self.bv_bool_extract(expr, width - 1);

        let mut res = self.bv_ashr_by_const(expr, width - 1, &sign);
        for i in (0..width - 1).rev() {
            res = shift
                .eq(&self.bv_const32(width, i))
                .ite(&self.bv_ashr_by_const(expr, i, &sign), &res);
        }

        let in_range = shift.bvult(&self.bv_const32(shift.bv_width(), width));
        in_range.ite(&res, &self.bv_zero(width))
    }

    fn build_array(&self, name: &str, domain: u32, range: u32) -> AstHandle<'ctx> {
        let domain_sort = self.ctx.bv_sort(domain);
        let range_sort = self.ctx.bv_sort(range);
        let sort = self.ctx.array_sort(&domain_sort, &range_sort);
        self.ctx.named_const(name, &sort)
    }

    /// The Z3 array standing for `root` before any updates. Fresh roots
    /// get a name unique within this builder; constant roots get their
    /// cell values flushed as a chain of stores.
    pub(crate) fn get_initial_array(&mut self, root: &ArrayRef) -> AstHandle<'ctx> {
        if let Some(array) = self.arrays.get(root) {
            return array.clone();
        }

        // Unique by appending the current cache size, truncating the
        // source name so the total stays within the budget.
        let uid = self.arrays.len().to_string();
        let space = root.name.len().min(ARRAY_NAME_BUDGET - uid.len());
        let mut unique_name: String = root.name.chars().take(space).collect();
        unique_name.push_str(&uid);

        debug!(
            "materialising array {} as {} ({} x {} bits)",
            root.name, unique_name, root.size, root.range
        );

        let mut array = self.build_array(&unique_name, root.domain, root.range);

        if let Some(cells) = &root.cells {
            for (i, cell) in cells.iter().enumerate() {
                let index = self.bv_const64(root.domain, i as u64);
                array = array.store(&index, &self.bv_const_ast(cell));
            }
        }

        self.arrays.insert(root.clone(), array.clone());
        array
    }

    /// The Z3 array for `root` with the update chain at `head` applied.
    /// Iterates down the chain so long histories cannot overflow the
    /// stack, memoising each node on the way back up.
    pub(crate) fn get_array_for_update(
        &mut self,
        root: &ArrayRef,
        head: Option<&UpdateNodeRef>,
    ) -> AstHandle<'ctx> {
        let mut pending: Vec<UpdateNodeRef> = Vec::new();
        let mut cursor = head.cloned();

        let mut array = loop {
            match cursor {
                None => break self.get_initial_array(root),
                Some(un) => {
                    if let Some(hit) = self.updates.get(&un) {
                        break hit.clone();
                    }
                    cursor = un.next.clone();
                    pending.push(un);
                }
            }
        };

        while let Some(un) = pending.pop() {
            let (index, _) = self.construct(&un.index);
            let (value, _) = self.construct(&un.value);
            array = array.store(&index, &value);
            self.updates.insert(un, array.clone());
        }

        array
    }

    /// Convenience read of `root[index]` with no updates applied.
    pub fn get_initial_read(&mut self, root: &ArrayRef, index: u32) -> AstHandle<'ctx> {
        self.get_initial_array(root).select(&self.bv_const32(32, index))
    }

    pub(crate) fn rounding(&self, rm: RoundingMode) -> AstHandle<'ctx> {
        self.ctx.rounding_mode(rm)
    }

    // 80-bit floats have no native sort; they travel as a two-cell array
    // indexed by one bit: the 79-bit number at 0, and at 1 a sentinel
    // that is NaN iff the operand's explicit integer bit disagreed with
    // its canonical value.

    pub(crate) fn f80_sort(&self) -> SortHandle<'ctx> {
        self.ctx.fpa_sort(15, 64)
    }

    pub(crate) fn f80_pack(
        &self,
        number: &AstHandle<'ctx>,
        sentinel: &AstHandle<'ctx>,
    ) -> AstHandle<'ctx> {
        let bit = self.ctx.bv_sort(1);
        let sort = self.ctx.array_sort(&bit, &self.f80_sort());
        self.ctx
            .named_const(F80_SCRATCH_NAME, &sort)
            .store(&self.bv_zero(1), number)
            .store(&self.bv_one(1), sentinel)
    }

    /// Pack a result that is known to carry the canonical integer bit.
    pub(crate) fn f80_pack_normal(&self, number: &AstHandle<'ctx>) -> AstHandle<'ctx> {
        self.f80_pack(number, &self.ctx.fp_zero(&self.f80_sort()))
    }

    pub(crate) fn f80_number(&self, arr: &AstHandle<'ctx>) -> AstHandle<'ctx> {
        arr.select(&self.bv_zero(1))
    }

    pub(crate) fn f80_wrong_hidden_bit(&self, arr: &AstHandle<'ctx>) -> AstHandle<'ctx> {
        arr.select(&self.bv_one(1)).fp_is_nan()
    }
}
