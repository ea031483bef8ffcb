use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::array::IDataArray;
use crate::attribute_matrix::AttributeMatrix;
use crate::data_container::DataContainer;
use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_pipeline::FilterPipeline;
use crate::filters::create_data_container::CreateDataContainer;
use crate::filters::create_grid_montage::CreateGridMontage;
use crate::filters::create_image_geometry::CreateImageGeometry;
use crate::geometry::ImageGeom;
use crate::models::{AttributeMatrixType, DType, DataArrayPath, LengthUnit};
use crate::types::{FloatVec3, SizeVec3};

/// Number of cells in the structure built by [cell_data_structure].
pub(crate) const CELL_TUPLES: usize = 32;

/// Build a container "DataContainer" with a 4 x 4 x 2 image geometry and a "Cell Data" matrix
/// holding a zeroed int32 "Phases" array and a zeroed three component float32 "Euler" array.
pub(crate) fn cell_data_structure() -> DataContainerArray {
    let mut matrix = AttributeMatrix::new(vec![4, 4, 2], "Cell Data", AttributeMatrixType::Cell);
    matrix
        .insert_or_assign(IDataArray::new(DType::Int32, "Phases", CELL_TUPLES, vec![1], true))
        .unwrap();
    matrix
        .insert_or_assign(IDataArray::new(DType::Float32, "Euler", CELL_TUPLES, vec![3], true))
        .unwrap();
    let mut dc = DataContainer::new("DataContainer");
    dc.set_geometry(ImageGeom::new(
        SizeVec3::new([4, 4, 2]),
        FloatVec3::new([1.0, 1.0, 1.0]),
        FloatVec3::new([0.0, 0.0, 0.0]),
    ));
    dc.insert_or_assign(matrix);
    let mut dca = DataContainerArray::new();
    dca.insert_or_assign(dc);
    dca
}

/// Path of array `name` in the cell matrix of [cell_data_structure].
pub(crate) fn cell_array_path(name: &str) -> DataArrayPath {
    DataArrayPath::new("DataContainer", "Cell Data", name)
}

fn tile_geometry(index: usize) -> ImageGeom {
    let mut geometry = ImageGeom::new(
        SizeVec3::new([10, 10, 1]),
        FloatVec3::new([1.0, 1.0, 1.0]),
        FloatVec3::new([index as f32 * 10.0, 0.0, 0.0]),
    );
    geometry.units = LengthUnit::Micrometer;
    geometry
}

/// Build one container per name, each with a 10 x 10 x 1 micrometre image geometry placed side
/// by side along x.
pub(crate) fn image_tiles(names: &[&str]) -> DataContainerArray {
    let mut dca = DataContainerArray::new();
    for (index, name) in names.iter().enumerate() {
        let mut dc = DataContainer::new(*name);
        dc.set_geometry(tile_geometry(index));
        dca.insert_or_assign(dc);
    }
    dca
}

/// A pipeline that builds two image tiles and assembles them into a 1 x 2 montage.
pub(crate) fn montage_pipeline() -> FilterPipeline {
    let mut pipeline = FilterPipeline::new("Montage");
    let names = ["Tile A", "Tile B"];
    for (index, name) in names.iter().enumerate() {
        pipeline.push_back(Box::new(CreateDataContainer::new(*name)));
        pipeline.push_back(Box::new(CreateImageGeometry::new(*name, &tile_geometry(index))));
    }
    pipeline.push_back(Box::new(CreateGridMontage::new(
        "Montage",
        SizeVec3::new([1, 2, 1]),
        names.iter().map(|n| n.to_string()).collect(),
    )));
    pipeline
}

/// Call counts shared between a [Stub] and the test that built it.
#[derive(Debug, Default)]
pub(crate) struct StubCounters {
    data_checks: AtomicUsize,
    executions: AtomicUsize,
}

impl StubCounters {
    pub(crate) fn data_checks(&self) -> usize {
        self.data_checks.load(Ordering::SeqCst)
    }

    pub(crate) fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

/// Filter that creates a container named after its label and fails or cancels on request.
#[derive(Debug)]
pub(crate) struct Stub {
    status: FilterStatus,
    counters: Arc<StubCounters>,
    /// Error code recorded by every data check, when negative
    pub(crate) preflight_error: i32,
    /// Error code recorded by execute, when negative
    pub(crate) execute_error: i32,
    /// Trip the cancel token once execute finishes
    pub(crate) cancel_after_execute: bool,
    /// Block execute until a value arrives or every sender is dropped
    pub(crate) gate: Option<Receiver<()>>,
}

impl Stub {
    pub(crate) fn new(label: &str) -> Self {
        Stub {
            status: FilterStatus::new(label),
            counters: Arc::default(),
            preflight_error: 0,
            execute_error: 0,
            cancel_after_execute: false,
            gate: None,
        }
    }

    pub(crate) fn counters(&self) -> Arc<StubCounters> {
        self.counters.clone()
    }
}

impl DeclaresParameters for Stub {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![]
    }
}

impl Filter for Stub {
    fn name_of_class(&self) -> &str {
        "Stub"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{00000000-0000-0000-0000-0000000000ff}"
    }

    fn status(&self) -> &FilterStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FilterStatus {
        &mut self.status
    }

    fn data_check(&mut self, dca: &mut DataContainerArray) {
        self.counters.data_checks.fetch_add(1, Ordering::SeqCst);
        self.status.clear_error_code();
        self.status.clear_warning_code();
        if self.preflight_error < 0 {
            self.status
                .set_error_condition(self.preflight_error, "stub data check failed");
            return;
        }
        let name = self.status.human_label().to_string();
        dca.create_non_prereq_data_container(&mut self.status, &name);
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.counters.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.data_check(dca);
        if self.status.error_code() < 0 {
            return;
        }
        if self.execute_error < 0 {
            self.status
                .set_error_condition(self.execute_error, "stub execute failed");
        }
        if self.cancel_after_execute {
            self.status.cancel_token().cancel();
        }
    }
}
