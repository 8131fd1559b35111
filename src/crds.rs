pub mod defs;
mod impls;
