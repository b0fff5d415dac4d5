mod assemble;
mod validate;

pub use assemble::{AssembleOptions, cmd_assemble};
pub use validate::cmd_validate;
