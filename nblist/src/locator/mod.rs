//! Spatial search of neighbor candidates.
//!
//! A [`NeighborLocator`] knows where atoms are in space, and can produce the
//! list of atoms within its cutoff of any given atom. The [`NeighborList`]
//! uses it to fill its per-atom lists and keeps it exclusively.
//!
//! [`NeighborList`]: crate::NeighborList

use crate::{Error, System, Vector3D};

mod translations;
pub use self::translations::{CellShift, TranslationTable};

mod cell_list;
pub use self::cell_list::{CellList, BinLocation};

mod cell_list_locator;
pub use self::cell_list_locator::CellListLocator;

/// A single entry in a neighbor list: the index of the neighbor, and the
/// identifier of the periodic translation that should be applied to its
/// wrapped position.
///
/// The vector from atom `i` to the neighbor entry `(j, t)` is
/// `wrapped[j] - wrapped[i] - scaled[t]`, where `scaled[t]` is the cartesian
/// version of the translation `t` in the current unit cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeighborItem {
    /// index of the neighbor atom
    pub neighbor: u32,
    /// identifier of the translation in the [`TranslationTable`]
    pub translation: u32,
}

/// The `NeighborLocator` trait describes the spatial search engine used to
/// build neighbor lists.
///
/// Each pair of atoms within the cutoff is reported once by `candidates` (on
/// the atom with the lower index, or with the translation in the positive half
/// space for pairs between an atom and its own periodic image) and once by
/// `complementary_candidates` (on the other atom, with the inverse
/// translation).
///
/// `candidates` and `complementary_candidates` take `&self` and are called
/// from multiple threads at the same time. All modifications to the locator
/// state go through `&mut self` functions.
pub trait NeighborLocator: Send + Sync {
    /// Get the cutoff used by this locator
    fn cutoff(&self) -> f64;

    /// Should pairs involving ghost atoms be reported? This only takes effect
    /// at the next call to `rebuild_all`.
    fn enable_ghost_neighbors(&mut self, enable: bool);

    /// Rebuild the spatial index from scratch for the given system. This wraps
    /// all positions inside the unit cell, and stores the current positions as
    /// reference positions.
    fn rebuild_all(&mut self, system: &dyn System) -> Result<(), Error>;

    /// Update the wrapped positions of all atoms from the current positions in
    /// `system`, using the same periodic offsets as the last call to
    /// `rebuild_all`. This keeps all translation identifiers valid, but does
    /// not update the spatial index.
    fn renormalize_positions(&mut self, system: &dyn System) -> Result<(), Error>;

    /// Update the wrapped positions of the given `atoms` from the current
    /// positions in `system`, and update their place in the spatial index.
    fn renormalize_subset(&mut self, system: &dyn System, atoms: &[usize]) -> Result<(), Error>;

    /// Mark this locator as invalid: `rebuild_all` must be called before it
    /// can be used again.
    fn invalidate(&mut self);

    /// Write the candidates of the half list for `atom` in `output`
    /// (replacing its previous content), and return the number of candidates.
    fn candidates(&self, atom: usize, output: &mut Vec<NeighborItem>) -> Result<usize, Error>;

    /// Write the candidates of the complementary list for `atom` in `output`
    /// (replacing its previous content), and return the number of candidates.
    fn complementary_candidates(&self, atom: usize, output: &mut Vec<NeighborItem>) -> Result<usize, Error>;

    /// Get the positions of all atoms, wrapped inside the unit cell
    fn wrapped_positions(&self) -> &[Vector3D];

    /// Get the positions of all atoms at the time of the last rebuild (or
    /// `update_reference_positions` for some atoms)
    fn reference_positions(&self) -> &[Vector3D];

    /// Set the reference positions of the given `atoms` to their current
    /// positions in `system`
    fn update_reference_positions(&mut self, system: &dyn System, atoms: &[usize]) -> Result<(), Error>;

    /// Get the translation table used by the entries produced by this locator
    fn translations(&self) -> &TranslationTable;

    /// Get the identifier of the translation opposite to `translation`
    fn inverse_translation(&self, translation: u32) -> u32 {
        self.translations().inverse(translation)
    }
}
