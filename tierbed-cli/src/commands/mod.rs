//! Command handlers -- one module per subcommand

pub mod names;
pub mod simulate;
pub mod validate;
