pub mod z3;

pub use z3::{
    AstHandle, Config, Context, SatResult, SolverError, SortHandle, Z3Builder, Z3BuilderOptions,
    Z3Solver,
};
