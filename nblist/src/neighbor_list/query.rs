use crate::{Error, Vector3D};
use crate::locator::NeighborItem;

use super::NeighborList;

/// Output buffers for the vectors and squared distances of neighbors
type Geometry<'a> = (&'a mut [Vector3D], &'a mut [f64]);

impl NeighborList {
    /// Get the neighbors of `atom` from the primary (half) lists, i.e. only
    /// the neighbors stored on this atom.
    ///
    /// The indexes of the neighbors are written to `neighbors`, the vectors
    /// from `atom` to the neighbors are written to `vectors` and the squared
    /// distances to `distances2`. Only neighbors closer than `radius` (or the
    /// cutoff if `radius` is `None`) are written; the function returns the
    /// number of neighbors found.
    ///
    /// The buffers must be able to hold all the entries in the lists before
    /// filtering: [`NeighborList::max_neighbor_list_length`] is large enough
    /// for all atoms.
    pub fn get_neighbors(
        &self,
        atom: usize,
        neighbors: &mut [usize],
        vectors: &mut [Vector3D],
        distances2: &mut [f64],
        radius: Option<f64>,
    ) -> Result<usize, Error> {
        self.collect_neighbors(atom, false, neighbors, Some((vectors, distances2)), radius)
    }

    /// Get all the neighbors of `atom`, from both the primary and the
    /// complementary lists. This requires `full_lists`.
    ///
    /// See [`NeighborList::get_neighbors`] for the meaning of the parameters.
    pub fn get_full_neighbors(
        &self,
        atom: usize,
        neighbors: &mut [usize],
        vectors: &mut [Vector3D],
        distances2: &mut [f64],
        radius: Option<f64>,
    ) -> Result<usize, Error> {
        self.collect_neighbors(atom, true, neighbors, Some((vectors, distances2)), radius)
    }

    /// Same as [`NeighborList::get_neighbors`], only getting the indexes of
    /// the neighbors.
    pub fn get_neighbor_indices(&self, atom: usize, neighbors: &mut [usize], radius: Option<f64>) -> Result<usize, Error> {
        self.collect_neighbors(atom, false, neighbors, None, radius)
    }

    /// Same as [`NeighborList::get_full_neighbors`], only getting the indexes
    /// of the neighbors.
    pub fn get_full_neighbor_indices(&self, atom: usize, neighbors: &mut [usize], radius: Option<f64>) -> Result<usize, Error> {
        self.collect_neighbors(atom, true, neighbors, None, radius)
    }

    fn collect_neighbors(
        &self,
        atom: usize,
        full: bool,
        neighbors: &mut [usize],
        mut geometry: Option<Geometry<'_>>,
        radius: Option<f64>,
    ) -> Result<usize, Error> {
        if self.invalid {
            return Err(Error::Invalidated(
                "the neighbor list must be updated before getting neighbors".into()
            ));
        }

        if full && !self.parameters.full_lists {
            return Err(Error::Precondition(
                "full neighbors are only available with full_lists".into()
            ));
        }

        if atom >= self.primary.len() {
            return Err(Error::InvalidParameter(format!(
                "atom index {} is out of bounds for a system with {} atoms",
                atom, self.primary.len()
            )));
        }

        let cutoff = match radius {
            None => self.parameters.cutoff,
            Some(radius) if radius > 0.0 && radius <= self.parameters.cutoff => radius,
            Some(radius) => {
                return Err(Error::InvalidParameter(format!(
                    "radius must be positive and at most the cutoff ({}), got {}",
                    self.parameters.cutoff, radius
                )));
            }
        };

        let primary = &self.primary[atom];
        let complementary: &[NeighborItem] = if full { &self.complementary[atom] } else { &[] };

        let required = primary.len() + complementary.len();
        let mut available = neighbors.len();
        if let Some((ref vectors, ref distances2)) = geometry {
            available = usize::min(available, usize::min(vectors.len(), distances2.len()));
        }

        if available < required {
            return Err(Error::BufferTooSmall {
                atom: atom,
                required: required,
                available: available,
            });
        }

        let positions = self.locator.wrapped_positions();
        let periodic = self.reference_cell.is_periodic();
        let cutoff2 = cutoff * cutoff;

        let mut count = 0;
        for item in primary.iter().chain(complementary) {
            let neighbor = item.neighbor as usize;
            let mut vector = positions[neighbor] - positions[atom];
            if periodic {
                vector -= self.scaled_translations[item.translation as usize];
            }

            let distance2 = vector.norm2();
            if distance2 < cutoff2 {
                neighbors[count] = neighbor;
                if let Some((ref mut vectors, ref mut distances2)) = geometry {
                    vectors[count] = vector;
                    distances2[count] = distance2;
                }
                count += 1;
            }
        }

        return Ok(count);
    }
}
