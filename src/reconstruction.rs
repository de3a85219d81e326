//! Reconstruction of a function from its first (and optionally second) derivative.
//!
//! # Example
//! ```rust, ignore
//! use RustedReconstruct::reconstruction::pipeline::{FunctionReconstruction, ReconstructionInput};
//! let input = ReconstructionInput {
//!     fprime: "3*x^2 - 3".to_string(),
//!     fdoubleprime: "6*x".to_string(),
//!     ic_f: "0,1".to_string(),
//!     ic_fprime: "0,-3".to_string(),
//!     critical_points: "-1, 1".to_string(),
//!     ..ReconstructionInput::default()
//! };
//! let output = FunctionReconstruction::new(input).run().unwrap();
//! println!("f(x) = {}", output.f_display.plain);
//! ```
/// fatal error kinds of a run
pub mod errors;
/// run-scoped symbols: the bound variable and integration constants
pub mod symbols;
/// integrating up the derivative chain
pub mod reconstructor;
/// initial conditions and the joint solve for integration constants
pub mod condition_solver;
/// sample grid, numeric arrays, critical and inflection points
pub mod evaluator;
/// the whole run from text inputs to arrays and display strings
pub mod pipeline;
