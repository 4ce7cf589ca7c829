#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Verlet neighbor lists with a drift margin, for molecular simulations.
//!
//! The main entry point is [`NeighborList`], which stores for each atom the
//! list of atoms within `cutoff + 2 * drift`, and can be kept up to date when
//! atoms move, either by checking if a full rebuild is needed with
//! [`NeighborList::check_and_update`], or by patching the lists of a few atoms
//! with [`NeighborList::remake_lists`].

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

pub mod systems;
pub use systems::{System, SimpleSystem, SharedSystem, UnitCell, CellShape};

pub mod locator;
pub use locator::{NeighborItem, NeighborLocator, CellListLocator};

mod neighbor_list;
pub use neighbor_list::{NeighborList, NeighborListParameters};
