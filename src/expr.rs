use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use hashconsing::{consign, HConsed, HashConsign};

use smallvec::SmallVec;

consign! {
    let EXPR = consign(100 * 1024 /* = capacity */) for Expr;
}

pub const FL32: u32 = 32;
pub const FL64: u32 = 64;
pub const FL80: u32 = 80;
pub const INT32: u32 = 32;
pub const INT64: u32 = 64;

/// Fixed-width bitvector constant stored as little-endian 64-bit limbs.
///
/// Bits above `width` are kept zero, so equality and hashing work on the
/// canonical representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BvConst {
    width: u32,
    limbs: SmallVec<[u64; 2]>,
}

impl BvConst {
    pub fn new(width: u32, limbs: impl IntoIterator<Item = u64>) -> Self {
        assert!(width > 0, "zero-width constant");

        let count = ((width + 63) / 64) as usize;
        let mut limbs: SmallVec<[u64; 2]> = limbs.into_iter().collect();
        limbs.resize(count, 0);

        if width % 64 != 0 {
            limbs[count - 1] &= u64::MAX >> (64 - width % 64);
        }

        Self { width, limbs }
    }

    pub fn from_u64(value: u64, width: u32) -> Self {
        Self::new(width, [value])
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(value as u64, 1)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// 64-bit limb `i`, zero beyond the stored ones.
    pub fn limb(&self, i: usize) -> u64 {
        self.limbs.get(i).copied().unwrap_or(0)
    }

    pub fn is_true(&self) -> bool {
        self.limbs[0] & 1 != 0
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|l| *l == 0)
    }

    /// The value clamped into a `u64`: saturates if any higher limb is set.
    pub fn low_u64_saturating(&self) -> u64 {
        if self.limbs[1..].iter().any(|l| *l != 0) {
            u64::MAX
        } else {
            self.limbs[0]
        }
    }

    /// `Some(k)` when the value is exactly `2^k` and fits in 64 bits.
    pub fn pow2_shift(&self) -> Option<u32> {
        if self.width > 64 {
            return None;
        }
        let v = self.limbs[0];
        if v != 0 && v & (v - 1) == 0 {
            Some(v.trailing_zeros())
        } else {
            None
        }
    }
}

/// Floating-point constant as raw bits. The 80-bit form keeps the x87
/// layout: sign(1) exponent(15) integer-bit(1) fraction(63).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpConst {
    Single(u32),
    Double(u64),
    Extended(u128),
}

impl FpConst {
    pub fn from_f32(value: f32) -> Self {
        Self::Single(value.to_bits())
    }

    pub fn from_f64(value: f64) -> Self {
        Self::Double(value.to_bits())
    }

    pub fn from_f80_bits(bits: u128) -> Self {
        Self::Extended(bits & ((1u128 << 80) - 1))
    }

    pub fn width(&self) -> u32 {
        match self {
            Self::Single(_) => FL32,
            Self::Double(_) => FL64,
            Self::Extended(_) => FL80,
        }
    }

    pub fn f80_sign(&self) -> u32 {
        match self {
            Self::Extended(bits) => ((bits >> 79) & 1) as u32,
            _ => panic!("f80 accessor on a {}-bit float", self.width()),
        }
    }

    pub fn f80_exponent(&self) -> u32 {
        match self {
            Self::Extended(bits) => ((bits >> 64) & 0x7FFF) as u32,
            _ => panic!("f80 accessor on a {}-bit float", self.width()),
        }
    }

    /// The 64-bit significand, explicit integer bit included.
    pub fn f80_significand(&self) -> u64 {
        match self {
            Self::Extended(bits) => *bits as u64,
            _ => panic!("f80 accessor on a {}-bit float", self.width()),
        }
    }
}

/// A symbolic array of bitvectors: the root object reads are issued
/// against. Constant arrays additionally carry their cell values.
#[derive(Debug)]
pub struct Array {
    pub name: String,
    pub domain: u32,
    pub range: u32,
    pub size: u32,
    pub cells: Option<Vec<BvConst>>,
}

/// Shared array root, compared and hashed by identity.
#[derive(Debug, Clone)]
pub struct ArrayRef(Arc<Array>);

impl ArrayRef {
    pub fn symbolic(name: impl Into<String>, domain: u32, range: u32, size: u32) -> Self {
        Self(Arc::new(Array {
            name: name.into(),
            domain,
            range,
            size,
            cells: None,
        }))
    }

    pub fn constant(name: impl Into<String>, domain: u32, range: u32, cells: Vec<BvConst>) -> Self {
        let size = cells.len() as u32;
        Self(Arc::new(Array {
            name: name.into(),
            domain,
            range,
            size,
            cells: Some(cells),
        }))
    }

    pub fn is_constant(&self) -> bool {
        self.0.cells.is_some()
    }
}

impl Deref for ArrayRef {
    type Target = Array;

    fn deref(&self) -> &Array {
        &self.0
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArrayRef {}

impl std::hash::Hash for ArrayRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

/// One write layered on an array, linking to the writes below it.
#[derive(Debug)]
pub struct UpdateNode {
    pub index: SymExpr,
    pub value: SymExpr,
    pub next: Option<UpdateNodeRef>,
}

#[derive(Debug, Clone)]
pub struct UpdateNodeRef(Arc<UpdateNode>);

impl Deref for UpdateNodeRef {
    type Target = UpdateNode;

    fn deref(&self) -> &UpdateNode {
        &self.0
    }
}

impl PartialEq for UpdateNodeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for UpdateNodeRef {}

impl std::hash::Hash for UpdateNodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

/// An array root plus the chain of writes layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateList {
    pub root: ArrayRef,
    pub head: Option<UpdateNodeRef>,
}

impl UpdateList {
    pub fn new(root: ArrayRef) -> Self {
        Self { root, head: None }
    }

    /// Layer one more write on top of the list.
    pub fn write(&self, index: SymExpr, value: SymExpr) -> Self {
        Self {
            root: self.root.clone(),
            head: Some(UpdateNodeRef(Arc::new(UpdateNode {
                index,
                value,
                next: self.head.clone(),
            }))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ult,
    Ule,
    Slt,
    Sle,
    // Removed by canonicalisation; the translator refuses them.
    Ne,
    Ugt,
    Uge,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FUnOp {
    Sqrt,
    NearbyInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Classify,
    IsFinite,
    IsNan,
    IsInf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FCmpOp {
    Ord,
    Uno,
    Oeq,
    Ueq,
    Ogt,
    Ugt,
    Oge,
    Uge,
    Olt,
    Ult,
    Ole,
    Ule,
    One,
    Une,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    NearestTiesToEven,
    TowardPositive,
    TowardNegative,
    TowardZero,
    NearestTiesToAway,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SymExpr(HConsed<Expr>);

impl Deref for SymExpr {
    type Target = Expr;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl From<Expr> for SymExpr {
    fn from(e: Expr) -> Self {
        Self(EXPR.mk(e))
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(BvConst),
    FConst(FpConst),

    /// Wrapper shielding its child from rewriting; translated transparently.
    NotOptimized(SymExpr),

    Read { updates: UpdateList, index: SymExpr },

    Select { cond: SymExpr, on_true: SymExpr, on_false: SymExpr },
    FSelect { cond: SymExpr, on_true: SymExpr, on_false: SymExpr },

    Concat(SmallVec<[SymExpr; 2]>),
    Extract { src: SymExpr, offset: u32, width: u32 },

    ZExt { src: SymExpr, width: u32 },
    SExt { src: SymExpr, width: u32 },

    Not(SymExpr),
    Binary(BinOp, SymExpr, SymExpr),
    Cmp(CmpOp, SymExpr, SymExpr),

    FExt { src: SymExpr, width: u32, rm: RoundingMode },
    FToU { src: SymExpr, width: u32, rm: RoundingMode },
    FToS { src: SymExpr, width: u32, rm: RoundingMode },
    UToF { src: SymExpr, width: u32, rm: RoundingMode },
    SToF { src: SymExpr, width: u32, rm: RoundingMode },

    /// Reinterpret a bitvector as a float of the same width.
    BitsToFloat(SymExpr),
    /// Reinterpret a float as a bitvector of the same width.
    FloatToBits(SymExpr),

    FAbs(SymExpr),
    FClassify(ClassKind, SymExpr),
    FUnary(FUnOp, RoundingMode, SymExpr),
    FBinary(FBinOp, RoundingMode, SymExpr, SymExpr),
    FCmp(FCmpOp, SymExpr, SymExpr),
}

impl SymExpr {
    pub fn constant(c: BvConst) -> Self {
        Expr::Const(c).into()
    }

    pub fn from_u64(value: u64, width: u32) -> Self {
        Self::constant(BvConst::from_u64(value, width))
    }

    pub fn bool_const(value: bool) -> Self {
        Self::constant(BvConst::from_bool(value))
    }

    pub fn float_const(c: FpConst) -> Self {
        Expr::FConst(c).into()
    }

    pub fn not_optimized(e: SymExpr) -> Self {
        Expr::NotOptimized(e).into()
    }

    pub fn read(updates: UpdateList, index: SymExpr) -> Self {
        Expr::Read { updates, index }.into()
    }

    pub fn select(cond: SymExpr, on_true: SymExpr, on_false: SymExpr) -> Self {
        assert_eq!(cond.width(), 1);
        assert_eq!(on_true.width(), on_false.width());
        Expr::Select { cond, on_true, on_false }.into()
    }

    pub fn fselect(cond: SymExpr, on_true: SymExpr, on_false: SymExpr) -> Self {
        assert_eq!(cond.width(), 1);
        assert_eq!(on_true.width(), on_false.width());
        Expr::FSelect { cond, on_true, on_false }.into()
    }

    pub fn concat(kids: impl IntoIterator<Item = SymExpr>) -> Self {
        let kids: SmallVec<[SymExpr; 2]> = kids.into_iter().collect();
        assert!(kids.len() >= 2);
        Expr::Concat(kids).into()
    }

    pub fn extract(src: SymExpr, offset: u32, width: u32) -> Self {
        assert!(width >= 1 && offset + width <= src.width());
        Expr::Extract { src, offset, width }.into()
    }

    pub fn zext(src: SymExpr, width: u32) -> Self {
        assert!(width > src.width());
        Expr::ZExt { src, width }.into()
    }

    pub fn sext(src: SymExpr, width: u32) -> Self {
        assert!(width > src.width());
        Expr::SExt { src, width }.into()
    }

    pub fn not(e: SymExpr) -> Self {
        Expr::Not(e).into()
    }

    pub fn binary(op: BinOp, left: SymExpr, right: SymExpr) -> Self {
        assert_eq!(left.width(), right.width());
        Expr::Binary(op, left, right).into()
    }

    pub fn compare(op: CmpOp, left: SymExpr, right: SymExpr) -> Self {
        assert_eq!(left.width(), right.width());
        Expr::Cmp(op, left, right).into()
    }

    pub fn fext(src: SymExpr, width: u32, rm: RoundingMode) -> Self {
        Expr::FExt { src, width, rm }.into()
    }

    pub fn ftou(src: SymExpr, width: u32, rm: RoundingMode) -> Self {
        Expr::FToU { src, width, rm }.into()
    }

    pub fn ftos(src: SymExpr, width: u32, rm: RoundingMode) -> Self {
        Expr::FToS { src, width, rm }.into()
    }

    pub fn utof(src: SymExpr, width: u32, rm: RoundingMode) -> Self {
        Expr::UToF { src, width, rm }.into()
    }

    pub fn stof(src: SymExpr, width: u32, rm: RoundingMode) -> Self {
        Expr::SToF { src, width, rm }.into()
    }

    pub fn bits_to_float(src: SymExpr) -> Self {
        Expr::BitsToFloat(src).into()
    }

    pub fn float_to_bits(src: SymExpr) -> Self {
        Expr::FloatToBits(src).into()
    }

    pub fn fabs(e: SymExpr) -> Self {
        Expr::FAbs(e).into()
    }

    pub fn classify(kind: ClassKind, e: SymExpr) -> Self {
        Expr::FClassify(kind, e).into()
    }

    pub fn float_unary(op: FUnOp, rm: RoundingMode, e: SymExpr) -> Self {
        Expr::FUnary(op, rm, e).into()
    }

    pub fn float_binary(op: FBinOp, rm: RoundingMode, left: SymExpr, right: SymExpr) -> Self {
        assert_eq!(left.width(), right.width());
        Expr::FBinary(op, rm, left, right).into()
    }

    pub fn float_compare(op: FCmpOp, left: SymExpr, right: SymExpr) -> Self {
        assert_eq!(left.width(), right.width());
        Expr::FCmp(op, left, right).into()
    }

    pub fn uid(&self) -> u64 {
        self.0.uid()
    }

    pub fn width(&self) -> u32 {
        match &**self {
            Expr::Const(c) => c.width(),
            Expr::FConst(c) => c.width(),
            Expr::NotOptimized(e) => e.width(),
            Expr::Read { updates, .. } => updates.root.range,
            Expr::Select { on_true, .. } | Expr::FSelect { on_true, .. } => on_true.width(),
            Expr::Concat(kids) => kids.iter().map(|k| k.width()).sum(),
            Expr::Extract { width, .. }
            | Expr::ZExt { width, .. }
            | Expr::SExt { width, .. }
            | Expr::FExt { width, .. }
            | Expr::FToU { width, .. }
            | Expr::FToS { width, .. }
            | Expr::UToF { width, .. }
            | Expr::SToF { width, .. } => *width,
            Expr::Not(e) => e.width(),
            Expr::Binary(_, l, _) => l.width(),
            Expr::Cmp(..) => 1,
            Expr::BitsToFloat(src) | Expr::FloatToBits(src) => src.width(),
            Expr::FAbs(e) => e.width(),
            Expr::FClassify(..) => 32,
            Expr::FUnary(_, _, e) => e.width(),
            Expr::FBinary(_, _, l, _) => l.width(),
            Expr::FCmp(..) => 1,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(&**self, Expr::Const(_) | Expr::FConst(_))
    }

    pub fn as_bv_const(&self) -> Option<&BvConst> {
        match &**self {
            Expr::Const(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => {
                write!(f, "{:#x}:{}", c.low_u64_saturating(), c.width())
            }
            Expr::FConst(c) => match c {
                FpConst::Single(bits) => write!(f, "{}f32", f32::from_bits(*bits)),
                FpConst::Double(bits) => write!(f, "{}f64", f64::from_bits(*bits)),
                FpConst::Extended(bits) => write!(f, "{:#x}f80", bits),
            },
            Expr::NotOptimized(e) => write!(f, "(not-optimized {})", e),
            Expr::Read { updates, index } => write!(f, "(read {} {})", updates.root.name, index),
            Expr::Select { cond, on_true, on_false } => {
                write!(f, "(select {} {} {})", cond, on_true, on_false)
            }
            Expr::FSelect { cond, on_true, on_false } => {
                write!(f, "(fselect {} {} {})", cond, on_true, on_false)
            }
            Expr::Concat(kids) => {
                write!(f, "(concat")?;
                for kid in kids {
                    write!(f, " {}", kid)?;
                }
                write!(f, ")")
            }
            Expr::Extract { src, offset, width } => {
                write!(f, "(extract {} {} {})", src, offset, width)
            }
            Expr::ZExt { src, width } => write!(f, "(zext {} {})", src, width),
            Expr::SExt { src, width } => write!(f, "(sext {} {})", src, width),
            Expr::Not(e) => write!(f, "(not {})", e),
            Expr::Binary(op, l, r) => write!(f, "({:?} {} {})", op, l, r),
            Expr::Cmp(op, l, r) => write!(f, "({:?} {} {})", op, l, r),
            Expr::FExt { src, width, .. } => write!(f, "(fext {} {})", src, width),
            Expr::FToU { src, width, .. } => write!(f, "(ftou {} {})", src, width),
            Expr::FToS { src, width, .. } => write!(f, "(ftos {} {})", src, width),
            Expr::UToF { src, width, .. } => write!(f, "(utof {} {})", src, width),
            Expr::SToF { src, width, .. } => write!(f, "(stof {} {})", src, width),
            Expr::BitsToFloat(src) => write!(f, "(bits->float {})", src),
            Expr::FloatToBits(src) => write!(f, "(float->bits {})", src),
            Expr::FAbs(e) => write!(f, "(fabs {})", e),
            Expr::FClassify(kind, e) => write!(f, "({:?} {})", kind, e),
            Expr::FUnary(op, _, e) => write!(f, "({:?} {})", op, e),
            Expr::FBinary(op, _, l, r) => write!(f, "(f{:?} {} {})", op, l, r),
            Expr::FCmp(op, l, r) => write!(f, "(f{:?} {} {})", op, l, r),
        }
    }
}
