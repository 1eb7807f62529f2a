//! Various unsorted logical operators.

pub use self::index_arena::{ArenaRange, IndexArena};
pub(crate) use self::parallel::{map_collect, map_into};

mod index_arena;
mod parallel;
