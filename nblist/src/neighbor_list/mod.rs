use std::cell::RefCell;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::{Error, System, UnitCell, Vector3D};
use crate::systems::SharedSystem;
use crate::locator::{CellListLocator, NeighborItem, NeighborLocator, TranslationTable};

mod validity;
mod query;
mod patch;
mod consistency;

/// Parameters for a [`NeighborList`]
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NeighborListParameters {
    /// Spherical cutoff, pairs closer than this distance are neighbors
    pub cutoff: f64,
    /// Safety margin added to the cutoff when building the lists, as a
    /// fraction of the cutoff. Atoms can move by this distance before the
    /// lists need to be rebuilt.
    #[serde(default = "serde_default_drift_factor")]
    pub drift_factor: f64,
    /// Should we store the complementary lists, allowing to get all the
    /// neighbors of an atom and to update the lists incrementally?
    #[serde(default)]
    pub full_lists: bool,
    /// Should we search for neighbors of ghost atoms, and include ghost atoms
    /// in the neighbors of real atoms?
    #[serde(default)]
    pub ghost_neighbors: bool,
    /// Maximal number of neighbors of a single atom. Going over this number
    /// is an error, usually indicating that atoms are overlapping.
    #[serde(default = "serde_default_max_neighbors")]
    pub max_neighbors: usize,
}

fn serde_default_drift_factor() -> f64 { 0.05 }
fn serde_default_max_neighbors() -> usize { 10000 }

impl NeighborListParameters {
    /// Get parameters with the given `cutoff` and default values for
    /// everything else
    pub fn new(cutoff: f64) -> NeighborListParameters {
        NeighborListParameters {
            cutoff: cutoff,
            drift_factor: serde_default_drift_factor(),
            full_lists: false,
            ghost_neighbors: false,
            max_neighbors: serde_default_max_neighbors(),
        }
    }

    /// Check that these parameters are valid
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive number, got {}", self.cutoff
            )));
        }

        if !(self.drift_factor >= 0.0 && self.drift_factor.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "drift factor must be a positive number or zero, got {}", self.drift_factor
            )));
        }

        if self.max_neighbors == 0 {
            return Err(Error::InvalidParameter(
                "max_neighbors must be at least 1".into()
            ));
        }

        Ok(())
    }

    /// Get the drift margin corresponding to these parameters
    pub fn drift(&self) -> f64 {
        self.drift_factor * self.cutoff
    }
}

/// Verlet neighbor list, with a drift margin allowing atoms to move a bit
/// before the list must be rebuilt.
///
/// The list of each atom contains all atoms within `cutoff + 2 * drift`, which
/// means that the neighbors within `cutoff` are still all in the list as long
/// as no atom moved by more than `drift` since the last rebuild. Use
/// [`NeighborList::check_and_update`] after moving atoms to update the
/// positions used by the list, and rebuild the list if needed.
///
/// Each pair is stored once in the primary (half) lists. With `full_lists`,
/// the opposite direction of each pair is stored in the complementary lists,
/// allowing to get all neighbors of an atom with
/// [`NeighborList::get_full_neighbors`] and to update the lists after moving
/// a few atoms with [`NeighborList::remake_lists`].
pub struct NeighborList {
    /// the system we are computing neighbors for
    system: SharedSystem,
    /// spatial search engine
    locator: Box<dyn NeighborLocator>,
    parameters: NeighborListParameters,
    /// drift margin, `drift_factor * cutoff`
    drift: f64,
    /// is the list out of date?
    invalid: bool,
    /// unit cell at the last full rebuild
    reference_cell: UnitCell,
    /// distances between faces of the reference cell
    reference_heights: Vector3D,
    /// number of real atoms at the last full rebuild
    n_atoms: usize,
    /// number of ghost atoms at the last full rebuild
    n_ghosts: usize,
    /// primary (half) lists for all atoms
    primary: Vec<Vec<NeighborItem>>,
    /// complementary lists for all atoms, empty if `full_lists` is false
    complementary: Vec<Vec<NeighborItem>>,
    /// length of the longest lists for a single atom
    max_lengths: ListLengths,
    /// capacity reserved for each list
    reservation: Reservation,
    /// largest displacement of a real atom since its reference position, at
    /// the last check
    max_displacement: f64,
    /// part of the drift margin used by lists patched with `remake_lists`
    /// since the last rebuild
    patch_margin: f64,
    /// translations from the locator, in cartesian coordinates
    scaled_translations: Vec<Vector3D>,
    /// per-thread buffer used to get candidates from the locator
    scratch: ThreadLocal<RefCell<Vec<NeighborItem>>>,
}

impl std::fmt::Debug for NeighborList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborList")
            .field("parameters", &self.parameters)
            .field("invalid", &self.invalid)
            .field("n_atoms", &self.n_atoms)
            .field("n_ghosts", &self.n_ghosts)
            .field("max_lengths", &self.max_lengths)
            .field("patch_margin", &self.patch_margin)
            .finish_non_exhaustive()
    }
}

impl NeighborList {
    /// Create a new neighbor list for the given `system`, using a
    /// [`CellListLocator`] to search for neighbors. The list starts invalid,
    /// and must be built with `make_list` or `check_and_update`.
    pub fn new(system: SharedSystem, parameters: NeighborListParameters) -> Result<NeighborList, Error> {
        parameters.validate()?;
        let locator = CellListLocator::new(parameters.cutoff + 2.0 * parameters.drift())?;
        return NeighborList::with_locator(system, parameters, Box::new(locator));
    }

    /// Create a new neighbor list, getting the parameters from a JSON string
    pub fn from_json(system: SharedSystem, parameters: &str) -> Result<NeighborList, Error> {
        let parameters = serde_json::from_str::<NeighborListParameters>(parameters)?;
        return NeighborList::new(system, parameters);
    }

    /// Create a new neighbor list using a custom `locator`. The locator cutoff
    /// must be at least `cutoff + 2 * drift`.
    pub fn with_locator(
        system: SharedSystem,
        parameters: NeighborListParameters,
        mut locator: Box<dyn NeighborLocator>,
    ) -> Result<NeighborList, Error> {
        parameters.validate()?;
        let drift = parameters.drift();
        let list_cutoff = parameters.cutoff + 2.0 * drift;
        if locator.cutoff() < list_cutoff * (1.0 - 1e-12) {
            return Err(Error::InvalidParameter(format!(
                "the locator cutoff ({}) must be at least the cutoff plus twice the drift ({})",
                locator.cutoff(), list_cutoff
            )));
        }

        locator.enable_ghost_neighbors(parameters.ghost_neighbors);
        locator.invalidate();

        Ok(NeighborList {
            system: system,
            locator: locator,
            parameters: parameters,
            drift: drift,
            invalid: true,
            reference_cell: UnitCell::infinite(),
            reference_heights: Vector3D::zero(),
            n_atoms: 0,
            n_ghosts: 0,
            primary: Vec::new(),
            complementary: Vec::new(),
            max_lengths: ListLengths::default(),
            reservation: Reservation::default(),
            max_displacement: 0.0,
            patch_margin: 0.0,
            scaled_translations: Vec::new(),
            scratch: ThreadLocal::new(),
        })
    }

    /// Get the system used by this neighbor list
    pub fn system(&self) -> &SharedSystem {
        &self.system
    }

    /// Get the parameters used to create this neighbor list
    pub fn parameters(&self) -> &NeighborListParameters {
        &self.parameters
    }

    /// Get the cutoff of this neighbor list
    pub fn cutoff(&self) -> f64 {
        self.parameters.cutoff
    }

    /// Get the drift margin of this neighbor list
    pub fn drift(&self) -> f64 {
        self.drift
    }

    /// Get the radius up to which pairs are stored in the lists
    fn list_cutoff(&self) -> f64 {
        self.parameters.cutoff + 2.0 * self.drift
    }

    /// Are the complementary lists stored?
    pub fn full_lists(&self) -> bool {
        self.parameters.full_lists
    }

    /// Mark this list as out of date. It must be rebuilt before being used
    /// again. This is used when another neighbor list sharing the same system
    /// did an update this list does not know about.
    pub fn invalidate(&mut self) {
        self.invalid = true;
        self.locator.invalidate();
    }

    /// Is this list out of date?
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Get the length of the longest list (primary and complementary lists
    /// together) for a single atom. Buffers of this size are large enough for
    /// all the query functions.
    pub fn max_neighbor_list_length(&self) -> usize {
        self.max_lengths.total
    }

    /// Get the primary list of `atom`, containing the unfiltered entries
    ///
    /// # Panics
    ///
    /// If `atom` is out of bounds
    pub fn primary(&self, atom: usize) -> &[NeighborItem] {
        &self.primary[atom]
    }

    /// Get the complementary list of `atom`, containing the unfiltered
    /// entries. This is always empty if `full_lists` is false.
    ///
    /// # Panics
    ///
    /// If `atom` is out of bounds
    pub fn complementary(&self, atom: usize) -> &[NeighborItem] {
        &self.complementary[atom]
    }

    /// Get the translation table used by the entries in the lists
    pub fn translations(&self) -> &TranslationTable {
        self.locator.translations()
    }

    /// Get the memory used by this neighbor list, in bytes
    pub fn memory_usage(&self) -> usize {
        let item = std::mem::size_of::<NeighborItem>();
        let lists = self.primary.iter().chain(&self.complementary)
            .map(|list| std::mem::size_of::<Vec<NeighborItem>>() + list.capacity() * item)
            .sum::<usize>();

        let translations = self.scaled_translations.capacity() * std::mem::size_of::<Vector3D>()
            + self.translations().len() * (std::mem::size_of::<[i32; 3]>() + std::mem::size_of::<u32>());

        return std::mem::size_of::<NeighborList>() + lists + translations;
    }

    /// Build the lists from scratch, using the current positions in the
    /// system.
    ///
    /// This fails if the cell is too small for the cutoff along one of the
    /// periodic directions, or if an atom has too many neighbors. The list
    /// stays invalid after a failure.
    pub fn make_list(&mut self) -> Result<(), Error> {
        let system = Arc::clone(&self.system);
        let system = system.read()?;
        return self.make_list_with(&*system);
    }

    #[time_graph::instrument(name = "NeighborList::make_list")]
    fn make_list_with(&mut self, system: &dyn System) -> Result<(), Error> {
        self.invalid = true;

        let cell = system.cell()?;
        let heights = cell.distances_between_faces();
        let periodic = cell.periodic();
        for xyz in 0..3 {
            if periodic[xyz] && heights[xyz] < 2.0 * self.parameters.cutoff {
                return Err(Error::Configuration(format!(
                    "the unit cell is too small for a cutoff of {}: the distance \
                    between faces along cell vector {} is {}, it must be at least {}",
                    self.parameters.cutoff, xyz, heights[xyz], 2.0 * self.parameters.cutoff
                )));
            }
        }

        self.locator.rebuild_all(system)?;

        let n_atoms = system.size()?;
        let n_ghosts = system.ghosts()?;
        let n_all = n_atoms + n_ghosts;

        self.primary.resize_with(n_all, Vec::new);
        self.complementary.resize_with(n_all, Vec::new);

        let builder = ListBuilder {
            locator: &*self.locator,
            full_lists: self.parameters.full_lists,
            max_neighbors: self.parameters.max_neighbors,
            reservation: self.reservation,
        };
        let scratch = &self.scratch;

        let max_lengths = self.primary.par_iter_mut()
            .zip(self.complementary.par_iter_mut())
            .enumerate()
            .map(|(atom, (primary, complementary))| {
                let mut buffer = scratch.get_or_default().borrow_mut();
                builder.fill(atom, primary, complementary, &mut buffer)
            })
            .try_reduce(ListLengths::default, |a, b| Ok(a.max(b)))?;

        self.update_max_lengths(max_lengths);
        self.rescale_translations(&cell);

        self.reference_cell = cell;
        self.reference_heights = heights;
        self.n_atoms = n_atoms;
        self.n_ghosts = n_ghosts;
        self.max_displacement = 0.0;
        self.patch_margin = 0.0;
        self.invalid = false;

        debug!(
            "rebuilt neighbor list for {} atoms and {} ghosts, longest list has {} entries",
            n_atoms, n_ghosts, max_lengths.total
        );

        return Ok(());
    }

    /// Replace the lists of `atom` with new entries from the locator,
    /// returning the new lengths of the lists
    fn refill(&mut self, atom: usize, buffer: &mut Vec<NeighborItem>) -> Result<ListLengths, Error> {
        let builder = ListBuilder {
            locator: &*self.locator,
            full_lists: self.parameters.full_lists,
            max_neighbors: self.parameters.max_neighbors,
            reservation: self.reservation,
        };

        return builder.fill(atom, &mut self.primary[atom], &mut self.complementary[atom], buffer);
    }

    /// Update the maximal lengths of the lists, and the capacity reserved for
    /// new lists
    fn update_max_lengths(&mut self, max_lengths: ListLengths) {
        self.max_lengths = max_lengths;

        let mut raised = false;
        if max_lengths.primary > self.reservation.primary {
            self.reservation.primary = with_headroom(max_lengths.primary);
            raised = true;
        }

        if max_lengths.complementary > self.reservation.complementary {
            self.reservation.complementary = with_headroom(max_lengths.complementary);
            raised = true;
        }

        if raised {
            info!(
                "neighbor list reservation raised to {} primary and {} complementary entries per atom",
                self.reservation.primary, self.reservation.complementary
            );
        }
    }

    /// Compute the cartesian translation vectors for the current cell
    fn rescale_translations(&mut self, cell: &UnitCell) {
        self.scaled_translations = self.locator.translations().scaled(&cell.matrix());
    }
}

/// Add about 5% to `size`
fn with_headroom(size: usize) -> usize {
    size + size / 20 + 1
}

/// Lengths of the lists of a single atom, or largest lengths over all atoms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ListLengths {
    primary: usize,
    complementary: usize,
    /// primary + complementary
    total: usize,
}

impl ListLengths {
    fn new(primary: &[NeighborItem], complementary: &[NeighborItem]) -> ListLengths {
        ListLengths {
            primary: primary.len(),
            complementary: complementary.len(),
            total: primary.len() + complementary.len(),
        }
    }

    fn max(self, other: ListLengths) -> ListLengths {
        ListLengths {
            primary: usize::max(self.primary, other.primary),
            complementary: usize::max(self.complementary, other.complementary),
            total: usize::max(self.total, other.total),
        }
    }
}

/// Capacity reserved for the lists of each atom, this is only ever raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Reservation {
    primary: usize,
    complementary: usize,
}

/// Copy candidates from the locator into the lists of one atom
struct ListBuilder<'a> {
    locator: &'a dyn NeighborLocator,
    full_lists: bool,
    max_neighbors: usize,
    reservation: Reservation,
}

impl ListBuilder<'_> {
    fn fill(
        &self,
        atom: usize,
        primary: &mut Vec<NeighborItem>,
        complementary: &mut Vec<NeighborItem>,
        buffer: &mut Vec<NeighborItem>,
    ) -> Result<ListLengths, Error> {
        let mut count = self.locator.candidates(atom, buffer)?;
        self.check_count(atom, count)?;
        copy(primary, buffer, self.reservation.primary);

        if self.full_lists {
            count += self.locator.complementary_candidates(atom, buffer)?;
            self.check_count(atom, count)?;
            copy(complementary, buffer, self.reservation.complementary);
        } else {
            complementary.clear();
        }

        return Ok(ListLengths::new(primary, complementary));
    }

    fn check_count(&self, atom: usize, count: usize) -> Result<(), Error> {
        check_neighbors_count(atom, count, self.max_neighbors)
    }
}

fn check_neighbors_count(atom: usize, count: usize, max_neighbors: usize) -> Result<(), Error> {
    if count > max_neighbors {
        return Err(Error::TooManyNeighbors {
            atom: atom,
            count: count,
            maximum: max_neighbors,
        });
    }
    Ok(())
}

fn copy(list: &mut Vec<NeighborItem>, items: &[NeighborItem], reservation: usize) {
    list.clear();
    list.reserve(usize::max(reservation, with_headroom(items.len())));
    list.extend_from_slice(items);
}
