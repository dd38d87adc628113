pub mod util;

pub mod options;

pub mod target;

pub mod codegen;

pub mod deps;

pub mod assign;
