//! Placement of resources in the ordered tree.
//!
//! `placement` holds the validation and decision functions; `entry` runs the
//! create, update and delete workflows that drive the tree store with them.

pub mod entry;
pub mod placement;

pub use entry::{
    ENTRIES_PER_PAGE, EntryInput, EntryPatch, create_entry, delete_entry, entry_children,
    list_entries, update_entry,
};
pub use placement::{
    MoveDecision, ParentUpdate, decide_move, resolve_insert_position, validate_parent,
    validate_position,
};
