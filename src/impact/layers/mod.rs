//! Impact analysis layers
//!
//! Each layer answers one question about an edit:
//! - References: who uses the edited symbol
//! - Tests: which test files cover the touched files
//! - Interface: how the edited definitions' shapes change

pub mod interface;
pub mod references;
pub mod test;

pub use interface::{InterfaceLayer, apply_edit, apply_edits};
pub use references::{ReferenceImpact, ReferenceLayer};
pub use test::TestImpactLayer;
