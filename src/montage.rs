//! Montages: spatial grids of data containers.
//!
//! A montage arranges data containers, referenced by name, in a grid of rows, columns and depth
//! slices. Grid positions are flattened with the row varying fastest:
//!
//! `offset = row + col * rows + depth * rows * cols`
//!
//! Resizing a grid keeps every slot whose position lies inside both the old and new sizes. The
//! stride changes with the size, so this is a positional copy rather than a flat one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::data_container::DataContainer;
use crate::data_container_array::DataContainerArray;
use crate::error::SimplError;
use crate::models::LengthUnit;
use crate::types::{FloatVec3, FloatVec6, SizeVec3};

/// Value of the "Montage Type" field for grid montages.
pub const GRID_MONTAGE_TYPE: &str = "GridMontage";

/// ASCII record separator, used to join data container names in montage records.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Identity of a montage within and across data container arrays.
pub type MontageId = Uuid;

/// Flat offset of `pos` in a grid of `size`.
fn grid_offset(pos: SizeVec3, size: SizeVec3) -> usize {
    pos[0] + pos[1] * size[0] + pos[2] * size[0] * size[1]
}

/// Whether `pos` addresses a slot of a grid of `size`.
fn in_bounds(pos: SizeVec3, size: SizeVec3) -> bool {
    (0..3).all(|i| pos[i] < size[i])
}

/// Copy `slots` laid out for `old_size` into a new buffer laid out for `new_size`.
///
/// Slots outside the new size are dropped; slots beyond the old size start as `T::default()`.
/// Returns `None` if the new slot count overflows.
fn resize_slots<T: Clone + Default>(
    slots: &[T],
    old_size: SizeVec3,
    new_size: SizeVec3,
) -> Option<Vec<T>> {
    let mut resized = vec![T::default(); new_size.checked_product()?];
    for row in 0..old_size[0] {
        for col in 0..old_size[1] {
            for depth in 0..old_size[2] {
                let pos = SizeVec3::new([row, col, depth]);
                if !in_bounds(pos, new_size) {
                    continue;
                }
                resized[grid_offset(pos, new_size)] = slots[grid_offset(pos, old_size)].clone();
            }
        }
    }
    Some(resized)
}

/// Grid of data container names, used as a filter parameter.
///
/// Unset slots hold an empty name.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DataContainerGrid {
    #[serde(rename = "Dimensions")]
    dims: SizeVec3,
    #[serde(rename = "DataContainerNames")]
    names: Vec<String>,
}

impl DataContainerGrid {
    /// Return a new grid of `dims` (rows, columns, depth) with every slot empty.
    ///
    /// Returns `None` if the slot count overflows.
    pub fn new(dims: SizeVec3) -> Option<Self> {
        Some(DataContainerGrid {
            dims,
            names: vec![String::new(); dims.checked_product()?],
        })
    }

    /// Build a grid from flattened names. The number of names must match the dimensions.
    pub fn from_names(dims: SizeVec3, names: Vec<String>) -> Result<Self, SimplError> {
        let Some(slots) = dims.checked_product() else {
            return Err(SimplError::MontageRecord {
                reason: format!("slot count of a grid of size {} overflows", dims),
            });
        };
        if names.len() != slots {
            return Err(SimplError::MontageRecord {
                reason: format!("{} names for a grid of {} slots", names.len(), slots),
            });
        }
        Ok(DataContainerGrid { dims, names })
    }

    pub fn dims(&self) -> SizeVec3 {
        self.dims
    }

    /// Name at `pos`, or `None` when `pos` is outside the grid.
    pub fn get_data_container_name(&self, pos: SizeVec3) -> Option<&str> {
        if !in_bounds(pos, self.dims) {
            return None;
        }
        Some(&self.names[grid_offset(pos, self.dims)])
    }

    /// Set the name at `pos`. Returns false when `pos` is outside the grid.
    pub fn set_data_container_name(&mut self, pos: SizeVec3, name: impl Into<String>) -> bool {
        if !in_bounds(pos, self.dims) {
            return false;
        }
        let offset = grid_offset(pos, self.dims);
        self.names[offset] = name.into();
        true
    }

    /// Names in flattened order.
    pub fn data_container_names(&self) -> &[String] {
        &self.names
    }

    /// Change the dimensions, keeping every name inside both the old and new bounds.
    ///
    /// Returns false, leaving the grid unchanged, if the new slot count overflows.
    pub fn resize_dimensions(&mut self, dims: SizeVec3) -> bool {
        let Some(names) = resize_slots(&self.names, self.dims, dims) else {
            return false;
        };
        self.names = names;
        self.dims = dims;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.names.iter().all(String::is_empty)
    }
}

/// Order in which a flat list of data containers fills a montage
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum CollectionMethod {
    /// Every row left to right
    #[default]
    CombOrder,
    /// Odd rows right to left
    SnakeOrder,
}

impl CollectionMethod {
    /// Tile positions of a grid of `size` in collection order.
    pub fn positions(self, size: SizeVec3) -> Vec<SizeVec3> {
        let mut positions = Vec::with_capacity(size.product());
        for depth in 0..size[2] {
            for row in 0..size[0] {
                let reverse = self == Self::SnakeOrder && row % 2 == 1;
                for i in 0..size[1] {
                    let col = if reverse { size[1] - 1 - i } else { i };
                    positions.push(SizeVec3::new([row, col, depth]));
                }
            }
        }
        positions
    }
}

/// Handle to one tile of a [GridMontage].
///
/// The handle does not own or borrow its montage. It names it, and must be checked against the
/// registry holding the montage before use.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GridTileIndex {
    montage: MontageId,
    tile_pos: SizeVec3,
}

impl GridTileIndex {
    pub fn montage_id(&self) -> MontageId {
        self.montage
    }

    pub fn tile_pos(&self) -> SizeVec3 {
        self.tile_pos
    }

    pub fn row(&self) -> usize {
        self.tile_pos[0]
    }

    pub fn col(&self) -> usize {
        self.tile_pos[1]
    }

    pub fn depth(&self) -> usize {
        self.tile_pos[2]
    }

    /// Whether the owning montage is still registered in `dca` and the position is inside its
    /// current size.
    pub fn is_valid(&self, dca: &DataContainerArray) -> bool {
        dca.get_montage_by_id(self.montage)
            .map(|m| in_bounds(self.tile_pos, m.grid_size()))
            .unwrap_or(false)
    }

    /// The data container at this tile, if the handle is valid and the tile is set.
    pub fn data_container<'a>(&self, dca: &'a DataContainerArray) -> Option<&'a DataContainer> {
        let montage = dca.get_montage_by_id(self.montage)?;
        let name = montage.get_data_container_name(self)?;
        dca.get_data_container(name)
    }

    /// Summary of the tile for display.
    pub fn info_string(&self, dca: &DataContainerArray) -> String {
        match self.data_container(dca) {
            Some(dc) => format!(
                "Tile [{}, {}, {}]: {}",
                self.row(),
                self.col(),
                self.depth(),
                dc.name()
            ),
            None => format!(
                "Tile [{}, {}, {}]: <empty>",
                self.row(),
                self.col(),
                self.depth()
            ),
        }
    }
}

/// A named grid of data container references.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMontage {
    id: MontageId,
    name: String,
    size: SizeVec3,
    data_containers: Vec<Option<String>>,
}

impl GridMontage {
    /// Return a new, empty montage.
    ///
    /// Returns `None` if the name is empty, any dimension is zero or the tile count overflows.
    pub fn new(name: impl Into<String>, rows: usize, cols: usize, depth: usize) -> Option<Self> {
        let name = name.into();
        if name.is_empty() || rows == 0 || cols == 0 || depth == 0 {
            return None;
        }
        let size = SizeVec3::new([rows, cols, depth]);
        Some(GridMontage {
            id: Uuid::new_v4(),
            name,
            size,
            data_containers: vec![None; size.checked_product()?],
        })
    }

    pub fn id(&self) -> MontageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn row_count(&self) -> usize {
        self.size[0]
    }

    pub fn column_count(&self) -> usize {
        self.size[1]
    }

    pub fn depth_count(&self) -> usize {
        self.size[2]
    }

    pub fn grid_size(&self) -> SizeVec3 {
        self.size
    }

    pub fn tile_count(&self) -> usize {
        self.size.product()
    }

    /// Whether every tile is set to an existing container with a geometry, and every geometry
    /// has the same type and length unit as the first tile's.
    pub fn is_valid(&self, dca: &DataContainerArray) -> bool {
        if self.tile_count() == 0 {
            return false;
        }
        let mut reference = None;
        for name in &self.data_containers {
            let geometry = match name
                .as_deref()
                .and_then(|name| dca.get_data_container(name))
                .and_then(DataContainer::geometry)
            {
                Some(geometry) => geometry,
                None => return false,
            };
            let kind = (geometry.geometry_type(), geometry.length_unit());
            match reference {
                None => reference = Some(kind),
                Some(expected) if expected != kind => return false,
                Some(_) => (),
            }
        }
        true
    }

    /// Handle to the tile at `(row, col, depth)`, or `None` outside the grid.
    pub fn get_tile_index(&self, row: usize, col: usize, depth: usize) -> Option<GridTileIndex> {
        let tile_pos = SizeVec3::new([row, col, depth]);
        if !in_bounds(tile_pos, self.size) {
            return None;
        }
        Some(GridTileIndex {
            montage: self.id,
            tile_pos,
        })
    }

    /// Handle to the first tile set to the container named `name`.
    pub fn get_tile_index_for_data_container(&self, name: &str) -> Option<GridTileIndex> {
        let offset = self
            .data_containers
            .iter()
            .position(|dc| dc.as_deref() == Some(name))?;
        let rows = self.row_count();
        let cols = self.column_count();
        self.get_tile_index(offset % rows, (offset / rows) % cols, offset / (rows * cols))
    }

    fn offset_of(&self, index: &GridTileIndex) -> Option<usize> {
        if index.montage != self.id || !in_bounds(index.tile_pos, self.size) {
            return None;
        }
        Some(grid_offset(index.tile_pos, self.size))
    }

    /// Name of the container at `index`, if the index belongs to this montage and the tile is
    /// set.
    pub fn get_data_container_name(&self, index: &GridTileIndex) -> Option<&str> {
        let offset = self.offset_of(index)?;
        self.data_containers[offset].as_deref()
    }

    /// The container at `index`, looked up in `dca`.
    pub fn get_data_container<'a>(
        &self,
        dca: &'a DataContainerArray,
        index: &GridTileIndex,
    ) -> Option<&'a DataContainer> {
        dca.get_data_container(self.get_data_container_name(index)?)
    }

    /// Set or clear the tile at `index`. Returns false if the index does not address this
    /// montage.
    pub fn set_data_container(&mut self, index: &GridTileIndex, name: Option<String>) -> bool {
        match self.offset_of(index) {
            Some(offset) => {
                self.data_containers[offset] = name;
                true
            }
            None => false,
        }
    }

    /// Replace every tile. The number of names must equal the tile count.
    pub fn set_data_containers(&mut self, names: Vec<Option<String>>) -> bool {
        if names.len() != self.data_containers.len() {
            return false;
        }
        self.data_containers = names;
        true
    }

    /// Container names in flattened order, empty for unset tiles.
    pub fn data_container_names(&self) -> Vec<String> {
        self.data_containers
            .iter()
            .map(|dc| dc.clone().unwrap_or_default())
            .collect()
    }

    /// Change the grid size, keeping every tile inside both the old and new bounds.
    ///
    /// Returns false, leaving the montage unchanged, if the new tile count overflows.
    pub fn resize_tile_dims(&mut self, rows: usize, cols: usize, depth: usize) -> bool {
        let size = SizeVec3::new([rows, cols, depth]);
        let Some(tiles) = resize_slots(&self.data_containers, self.size, size) else {
            return false;
        };
        self.data_containers = tiles;
        self.size = size;
        true
    }

    /// Copy the montage. The copy is a distinct montage with its own identity.
    pub fn deep_copy(&self) -> Self {
        GridMontage {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    /// Copy the montage for use with `dca`, clearing tiles whose container is missing there.
    pub fn propagate(&self, dca: &DataContainerArray) -> Self {
        let mut copy = self.deep_copy();
        for tile in copy.data_containers.iter_mut() {
            if let Some(name) = tile {
                if !dca.does_data_container_exist(name) {
                    *tile = None;
                }
            }
        }
        copy
    }

    /// Length unit of the first tile with a geometry.
    pub fn length_unit(&self, dca: &DataContainerArray) -> LengthUnit {
        self.data_containers
            .iter()
            .flatten()
            .filter_map(|name| dca.get_data_container(name))
            .find_map(|dc| dc.geometry().map(|g| g.length_unit()))
            .unwrap_or(LengthUnit::Unknown)
    }

    /// Union of the bounding boxes of every image tile, as
    /// `[x min, x max, y min, y max, z min, z max]`. All zero when no tile has an image.
    pub fn bounds(&self, dca: &DataContainerArray) -> FloatVec6 {
        let mut bounds: Option<[f32; 6]> = None;
        let images = self
            .data_containers
            .iter()
            .flatten()
            .filter_map(|name| dca.get_data_container(name))
            .filter_map(DataContainer::image_geometry);
        for image in images {
            let tile = image.bounding_box();
            bounds = Some(match bounds {
                None => tile.to_array(),
                Some(mut b) => {
                    for axis in 0..3 {
                        b[2 * axis] = b[2 * axis].min(tile[2 * axis]);
                        b[2 * axis + 1] = b[2 * axis + 1].max(tile[2 * axis + 1]);
                    }
                    b
                }
            });
        }
        FloatVec6::new(bounds.unwrap_or_default())
    }

    /// Physical extent of the montage along each axis.
    pub fn dimensions(&self, dca: &DataContainerArray) -> FloatVec3 {
        let b = self.bounds(dca);
        FloatVec3::new([b[1] - b[0], b[3] - b[2], b[5] - b[4]])
    }

    /// Summary of the montage for display.
    pub fn info_string(&self, dca: &DataContainerArray) -> String {
        format!(
            "Grid Montage {}: {} rows, {} columns, {} depth, {} tiles, units {}, valid {}",
            self.name,
            self.row_count(),
            self.column_count(),
            self.depth_count(),
            self.tile_count(),
            self.length_unit(dca),
            self.is_valid(dca)
        )
    }

    /// Serialisable form of the montage.
    pub fn to_record(&self) -> MontageRecord {
        let names: Vec<String> = self.data_container_names();
        MontageRecord {
            montage_type: GRID_MONTAGE_TYPE.to_string(),
            name: self.name.clone(),
            x_dim: self.size[0],
            y_dim: self.size[1],
            z_dim: self.size[2],
            data_container_names: names.join(&RECORD_SEPARATOR.to_string()),
        }
    }

    /// Rebuild a montage from a validated record. Empty names become unset tiles.
    pub fn from_record(record: &MontageRecord) -> Result<Self, SimplError> {
        record.validate()?;
        let grid = record.to_grid()?;
        let mut montage = GridMontage::new(&record.name, record.x_dim, record.y_dim, record.z_dim)
            .ok_or_else(|| SimplError::MontageRecord {
                reason: format!("cannot create montage {}", record.name),
            })?;
        let names = grid
            .data_container_names()
            .iter()
            .map(|name| (!name.is_empty()).then(|| name.clone()))
            .collect();
        montage.set_data_containers(names);
        Ok(montage)
    }
}

/// Persisted form of a grid montage.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_montage_record"))]
pub struct MontageRecord {
    #[serde(rename = "Montage Type")]
    pub montage_type: String,
    #[serde(rename = "Name")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(rename = "X Dim")]
    #[validate(range(min = 1, message = "X Dim must be greater than 0"))]
    pub x_dim: usize,
    #[serde(rename = "Y Dim")]
    #[validate(range(min = 1, message = "Y Dim must be greater than 0"))]
    pub y_dim: usize,
    #[serde(rename = "Z Dim")]
    #[validate(range(min = 1, message = "Z Dim must be greater than 0"))]
    pub z_dim: usize,
    /// Names joined with [RECORD_SEPARATOR]
    #[serde(rename = "DataContainerNames")]
    pub data_container_names: String,
}

impl MontageRecord {
    pub fn dims(&self) -> SizeVec3 {
        SizeVec3::new([self.x_dim, self.y_dim, self.z_dim])
    }

    fn split_names(&self) -> Vec<String> {
        self.data_container_names
            .split(RECORD_SEPARATOR)
            .map(str::to_string)
            .collect()
    }

    /// The name mapping of the record as a grid.
    pub fn to_grid(&self) -> Result<DataContainerGrid, SimplError> {
        DataContainerGrid::from_names(self.dims(), self.split_names())
    }
}

/// Validate a [MontageRecord] object.
fn validate_montage_record(record: &MontageRecord) -> Result<(), ValidationError> {
    if record.montage_type != GRID_MONTAGE_TYPE {
        let mut error = ValidationError::new("Unsupported montage type");
        error.add_param("montage_type".into(), &record.montage_type);
        return Err(error);
    }
    let Some(tiles) = record.dims().checked_product() else {
        let mut error = ValidationError::new("Tile count overflows");
        error.add_param("x_dim".into(), &record.x_dim);
        error.add_param("y_dim".into(), &record.y_dim);
        error.add_param("z_dim".into(), &record.z_dim);
        return Err(error);
    };
    let names = record.split_names().len();
    if tiles != names {
        let mut error = ValidationError::new("Number of names must equal number of tiles");
        error.add_param("tiles".into(), &tiles);
        error.add_param("names".into(), &names);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageGeom, VertexGeom};
    use crate::test_utils;

    fn numbered_grid(dims: [usize; 3]) -> DataContainerGrid {
        let dims = SizeVec3::new(dims);
        let names = (0..dims.product()).map(|i| format!("DC {}", i)).collect();
        DataContainerGrid::from_names(dims, names).unwrap()
    }

    #[test]
    fn grid_offsets_are_row_fastest() {
        let grid = numbered_grid([2, 3, 2]);
        assert_eq!(Some("DC 0"), grid.get_data_container_name(SizeVec3::new([0, 0, 0])));
        assert_eq!(Some("DC 1"), grid.get_data_container_name(SizeVec3::new([1, 0, 0])));
        assert_eq!(Some("DC 2"), grid.get_data_container_name(SizeVec3::new([0, 1, 0])));
        assert_eq!(Some("DC 6"), grid.get_data_container_name(SizeVec3::new([0, 0, 1])));
        assert_eq!(Some("DC 11"), grid.get_data_container_name(SizeVec3::new([1, 2, 1])));
        assert_eq!(None, grid.get_data_container_name(SizeVec3::new([2, 0, 0])));
    }

    #[test]
    fn grid_resize_intersection_copy() {
        let mut grid = numbered_grid([3, 3, 1]);
        let original = grid.clone();
        assert!(grid.resize_dimensions(SizeVec3::new([2, 2, 1])));
        assert_eq!(vec!["DC 0", "DC 1", "DC 3", "DC 4"], grid.data_container_names());
        assert!(grid.resize_dimensions(SizeVec3::new([3, 3, 1])));
        for row in 0..3 {
            for col in 0..3 {
                let pos = SizeVec3::new([row, col, 0]);
                let name = grid.get_data_container_name(pos).unwrap();
                if row < 2 && col < 2 {
                    assert_eq!(original.get_data_container_name(pos).unwrap(), name);
                } else {
                    assert_eq!("", name);
                }
            }
        }
    }

    #[test]
    fn grid_resize_grow_keeps_positions() {
        let mut grid = numbered_grid([2, 2, 1]);
        assert!(grid.resize_dimensions(SizeVec3::new([3, 2, 2])));
        assert_eq!(12, grid.data_container_names().len());
        assert_eq!(Some("DC 1"), grid.get_data_container_name(SizeVec3::new([1, 0, 0])));
        assert_eq!(Some("DC 2"), grid.get_data_container_name(SizeVec3::new([0, 1, 0])));
        assert_eq!(Some("DC 3"), grid.get_data_container_name(SizeVec3::new([1, 1, 0])));
        assert_eq!(Some(""), grid.get_data_container_name(SizeVec3::new([2, 0, 0])));
        assert_eq!(Some(""), grid.get_data_container_name(SizeVec3::new([0, 0, 1])));
    }

    #[test]
    fn grid_set_name() {
        let mut grid = DataContainerGrid::new(SizeVec3::new([1, 2, 1])).unwrap();
        assert!(grid.is_empty());
        assert!(grid.set_data_container_name(SizeVec3::new([0, 1, 0]), "B"));
        assert!(!grid.set_data_container_name(SizeVec3::new([1, 0, 0]), "C"));
        assert_eq!(&["".to_string(), "B".to_string()], grid.data_container_names());
    }

    #[test]
    fn collection_orders() {
        let size = SizeVec3::new([2, 3, 1]);
        let comb: Vec<_> = CollectionMethod::CombOrder
            .positions(size)
            .iter()
            .map(|p| (p[0], p[1]))
            .collect();
        assert_eq!(vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)], comb);
        let snake: Vec<_> = CollectionMethod::SnakeOrder
            .positions(size)
            .iter()
            .map(|p| (p[0], p[1]))
            .collect();
        assert_eq!(vec![(0, 0), (0, 1), (0, 2), (1, 2), (1, 1), (1, 0)], snake);
    }

    #[test]
    fn montage_new_rejects_bad_arguments() {
        assert!(GridMontage::new("", 1, 1, 1).is_none());
        assert!(GridMontage::new("M", 0, 1, 1).is_none());
        assert!(GridMontage::new("M", 1, 1, 0).is_none());
        let montage = GridMontage::new("M", 2, 3, 4).unwrap();
        assert_eq!((2, 3, 4, 24), (
            montage.row_count(),
            montage.column_count(),
            montage.depth_count(),
            montage.tile_count()
        ));
    }

    #[test]
    fn tile_index_bounds_are_exclusive() {
        let montage = GridMontage::new("M", 2, 2, 1).unwrap();
        assert!(montage.get_tile_index(1, 1, 0).is_some());
        assert!(montage.get_tile_index(2, 0, 0).is_none());
        assert!(montage.get_tile_index(0, 2, 0).is_none());
        assert!(montage.get_tile_index(0, 0, 1).is_none());
    }

    #[test]
    fn is_valid_requires_every_tile() {
        let mut dca = test_utils::image_tiles(&["A", "B", "C", "D"]);
        let mut montage = GridMontage::new("M", 2, 2, 1).unwrap();
        montage.set_data_containers(vec![
            Some("A".into()),
            Some("B".into()),
            Some("C".into()),
            None,
        ]);
        assert!(!montage.is_valid(&dca));
        let index = montage.get_tile_index(1, 1, 0).unwrap();
        montage.set_data_container(&index, Some("D".into()));
        assert!(montage.is_valid(&dca));
        // A missing container invalidates the montage too.
        dca.remove_data_container("D");
        assert!(!montage.is_valid(&dca));
    }

    #[test]
    fn is_valid_rejects_mixed_geometry() {
        let mut dca = test_utils::image_tiles(&["A", "B", "C"]);
        let mut dc = DataContainer::new("V");
        dc.set_geometry(VertexGeom::default());
        dca.insert_or_assign(dc);
        let mut montage = GridMontage::new("M", 2, 2, 1).unwrap();
        montage.set_data_containers(vec![
            Some("A".into()),
            Some("B".into()),
            Some("C".into()),
            Some("V".into()),
        ]);
        assert!(!montage.is_valid(&dca));
    }

    #[test]
    fn is_valid_rejects_mixed_units() {
        let mut dca = test_utils::image_tiles(&["A", "B"]);
        dca.get_data_container_mut("B")
            .unwrap()
            .geometry_mut()
            .unwrap()
            .set_length_unit(LengthUnit::Millimeter);
        let mut montage = GridMontage::new("M", 1, 2, 1).unwrap();
        montage.set_data_containers(vec![Some("A".into()), Some("B".into())]);
        assert!(!montage.is_valid(&dca));
    }

    #[test]
    fn tile_index_for_data_container() {
        let mut montage = GridMontage::new("M", 2, 3, 2).unwrap();
        let names = (0..12).map(|i| Some(format!("DC {}", i))).collect();
        montage.set_data_containers(names);
        let index = montage.get_tile_index_for_data_container("DC 9").unwrap();
        // 9 = row 1 + col 1 * 2 + depth 1 * 6
        assert_eq!((1, 1, 1), (index.row(), index.col(), index.depth()));
        assert_eq!(Some("DC 9"), montage.get_data_container_name(&index));
        assert!(montage.get_tile_index_for_data_container("missing").is_none());
    }

    #[test]
    fn tile_index_of_other_montage_is_rejected() {
        let a = GridMontage::new("A", 1, 1, 1).unwrap();
        let mut b = GridMontage::new("B", 1, 1, 1).unwrap();
        let index = a.get_tile_index(0, 0, 0).unwrap();
        assert!(!b.set_data_container(&index, Some("X".into())));
        assert_eq!(None, b.get_data_container_name(&index));
    }

    #[test]
    fn set_data_containers_requires_matching_length() {
        let mut montage = GridMontage::new("M", 1, 2, 1).unwrap();
        assert!(!montage.set_data_containers(vec![None]));
        assert!(montage.set_data_containers(vec![None, Some("A".into())]));
    }

    #[test]
    fn resize_tile_dims() {
        let mut montage = GridMontage::new("M", 2, 2, 1).unwrap();
        montage.set_data_containers((0..4).map(|i| Some(i.to_string())).collect());
        assert!(montage.resize_tile_dims(1, 3, 1));
        assert_eq!(vec!["0", "2", ""], montage.data_container_names());
    }

    #[test]
    fn tile_index_validity_follows_registry() {
        let mut dca = test_utils::image_tiles(&["A", "B", "C", "D"]);
        let mut montage = GridMontage::new("M", 2, 2, 1).unwrap();
        montage.set_data_containers(
            ["A", "B", "C", "D"].iter().map(|n| Some(n.to_string())).collect(),
        );
        let corner = montage.get_tile_index(1, 1, 0).unwrap();
        let origin = montage.get_tile_index(0, 0, 0).unwrap();
        // Not registered yet.
        assert!(!corner.is_valid(&dca));
        assert!(dca.add_montage(montage));
        assert!(corner.is_valid(&dca));
        assert_eq!("D", corner.data_container(&dca).unwrap().name());
        assert!(corner.info_string(&dca).ends_with("D"));
        dca.get_montage_mut("M").unwrap().resize_tile_dims(1, 1, 1);
        assert!(!corner.is_valid(&dca));
        assert!(origin.is_valid(&dca));
        dca.remove_montage("M");
        assert!(!origin.is_valid(&dca));
    }

    #[test]
    fn propagate_drops_missing_containers() {
        let dca = test_utils::image_tiles(&["A"]);
        let mut montage = GridMontage::new("M", 1, 2, 1).unwrap();
        montage.set_data_containers(vec![Some("A".into()), Some("B".into())]);
        let copy = montage.propagate(&dca);
        assert_ne!(montage.id(), copy.id());
        assert_eq!(vec!["A", ""], copy.data_container_names());
    }

    #[test]
    fn bounds_and_units() {
        let mut dca = DataContainerArray::new();
        for (name, origin) in [("A", 0.0), ("B", 10.0)] {
            let mut dc = DataContainer::new(name);
            let mut geom = ImageGeom::new(
                SizeVec3::new([10, 5, 1]),
                FloatVec3::new([1.0, 2.0, 1.0]),
                FloatVec3::new([origin, 0.0, 0.0]),
            );
            geom.units = LengthUnit::Micrometer;
            dc.set_geometry(geom);
            dca.insert_or_assign(dc);
        }
        let mut montage = GridMontage::new("M", 1, 2, 1).unwrap();
        montage.set_data_containers(vec![Some("A".into()), Some("B".into())]);
        assert_eq!(
            FloatVec6::new([0.0, 20.0, 0.0, 10.0, 0.0, 1.0]),
            montage.bounds(&dca)
        );
        assert_eq!(FloatVec3::new([20.0, 10.0, 1.0]), montage.dimensions(&dca));
        assert_eq!(LengthUnit::Micrometer, montage.length_unit(&dca));
        assert_eq!(LengthUnit::Unknown, montage.length_unit(&DataContainerArray::new()));
        assert!(montage.info_string(&dca).contains("valid true"));
    }

    #[test]
    fn record_round_trip() {
        let mut montage = GridMontage::new("Tiles", 2, 1, 2).unwrap();
        montage.set_data_containers(vec![
            Some("r0".into()),
            None,
            Some("r2".into()),
            Some("r3".into()),
        ]);
        let record = montage.to_record();
        assert_eq!("GridMontage", record.montage_type);
        assert_eq!("r0\u{1e}\u{1e}r2\u{1e}r3", record.data_container_names);
        let json = serde_json::to_string(&record).unwrap();
        let read: MontageRecord = serde_json::from_str(&json).unwrap();
        let restored = GridMontage::from_record(&read).unwrap();
        assert_eq!(montage.name(), restored.name());
        assert_eq!(montage.grid_size(), restored.grid_size());
        assert_eq!(montage.data_container_names(), restored.data_container_names());
        let grid = read.to_grid().unwrap();
        assert_eq!(Some("r3"), grid.get_data_container_name(SizeVec3::new([1, 0, 1])));
    }

    #[test]
    fn record_json_field_names() {
        let record = GridMontage::new("M", 1, 1, 1).unwrap().to_record();
        let value = serde_json::to_value(&record).unwrap();
        for key in ["Montage Type", "Name", "X Dim", "Y Dim", "Z Dim", "DataContainerNames"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn record_validation() {
        let mut record = GridMontage::new("M", 1, 2, 1).unwrap().to_record();
        assert!(record.validate().is_ok());
        record.y_dim = 3;
        assert!(matches!(
            GridMontage::from_record(&record),
            Err(SimplError::MontageRecordInvalid(_))
        ));
        record.y_dim = 0;
        assert!(record.validate().is_err());
        let mut record = GridMontage::new("M", 1, 1, 1).unwrap().to_record();
        record.montage_type = "Other".to_string();
        assert!(record.validate().is_err());
        record.montage_type = GRID_MONTAGE_TYPE.to_string();
        record.name = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn record_tile_count_overflow() {
        let mut record = GridMontage::new("M", 1, 2, 1).unwrap().to_record();
        record.x_dim = usize::MAX;
        record.y_dim = 2;
        assert!(record.validate().is_err());
        assert!(matches!(
            GridMontage::from_record(&record),
            Err(SimplError::MontageRecordInvalid(_))
        ));
        assert!(matches!(record.to_grid(), Err(SimplError::MontageRecord { .. })));
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let huge = SizeVec3::new([usize::MAX, 2, 1]);
        assert!(DataContainerGrid::new(huge).is_none());
        assert!(GridMontage::new("M", usize::MAX, 2, 1).is_none());
        let mut grid = DataContainerGrid::new(SizeVec3::new([1, 2, 1])).unwrap();
        assert!(!grid.resize_dimensions(huge));
        assert_eq!(SizeVec3::new([1, 2, 1]), grid.dims());
        let mut montage = GridMontage::new("M", 1, 2, 1).unwrap();
        assert!(!montage.resize_tile_dims(usize::MAX, 2, 1));
        assert_eq!(2, montage.tile_count());
    }
}
