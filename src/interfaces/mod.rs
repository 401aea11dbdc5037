//! Outer surfaces: the shop API facade, CSV catalog/script IO and the script replayer
//! used by the binary.

pub mod api;
pub mod csv;
pub mod replay;
