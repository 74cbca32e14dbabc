//! Configuration model for keylayer, a layered keyboard remapper: layers of key bindings,
//! global timing settings, macros and the virtual-key name table.

pub mod cfg;
pub mod keys;
