pub mod guard;
pub mod insert;
pub mod replace;
pub mod traits;

pub use guard::{HasInsertPoint, InsertionGuard};
pub use insert::{CursorInserter, InsertBuilder, InsertPoint};
pub use replace::ReplaceBuilder;
pub use traits::{InstBuilder, InstBuilderBase, InstInserterBase};
