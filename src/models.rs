//! Data types and associated functions and methods

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Supported array element types
///
/// Displayed and serialised with the C type name used in pipeline documents.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum DType {
    /// [i8]
    #[strum(serialize = "int8_t")]
    #[serde(rename = "int8_t")]
    Int8,
    /// [i16]
    #[strum(serialize = "int16_t")]
    #[serde(rename = "int16_t")]
    Int16,
    /// [i32]
    #[strum(serialize = "int32_t")]
    #[serde(rename = "int32_t")]
    Int32,
    /// [i64]
    #[strum(serialize = "int64_t")]
    #[serde(rename = "int64_t")]
    Int64,
    /// [u8]
    #[strum(serialize = "uint8_t")]
    #[serde(rename = "uint8_t")]
    Uint8,
    /// [u16]
    #[strum(serialize = "uint16_t")]
    #[serde(rename = "uint16_t")]
    Uint16,
    /// [u32]
    #[strum(serialize = "uint32_t")]
    #[serde(rename = "uint32_t")]
    Uint32,
    /// [u64]
    #[strum(serialize = "uint64_t")]
    #[serde(rename = "uint64_t")]
    Uint64,
    /// [f32]
    #[strum(serialize = "float")]
    #[serde(rename = "float")]
    Float32,
    /// [f64]
    #[strum(serialize = "double")]
    #[serde(rename = "double")]
    Float64,
    /// [bool]
    #[strum(serialize = "bool")]
    #[serde(rename = "bool")]
    Bool,
}

impl DType {
    /// Every supported element type.
    pub const ALL: [DType; 11] = [
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::Uint8,
        DType::Uint16,
        DType::Uint32,
        DType::Uint64,
        DType::Float32,
        DType::Float64,
        DType::Bool,
    ];

    /// Returns the size of the associated type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            Self::Int8 => std::mem::size_of::<i8>(),
            Self::Int16 => std::mem::size_of::<i16>(),
            Self::Int32 => std::mem::size_of::<i32>(),
            Self::Int64 => std::mem::size_of::<i64>(),
            Self::Uint8 => std::mem::size_of::<u8>(),
            Self::Uint16 => std::mem::size_of::<u16>(),
            Self::Uint32 => std::mem::size_of::<u32>(),
            Self::Uint64 => std::mem::size_of::<u64>(),
            Self::Float32 => std::mem::size_of::<f32>(),
            Self::Float64 => std::mem::size_of::<f64>(),
            Self::Bool => std::mem::size_of::<bool>(),
        }
    }

    /// Returns the C type name, e.g. `uint16_t`.
    pub fn type_name(self) -> String {
        self.to_string()
    }

    /// Look up a type by its C type name.
    pub fn from_type_name(name: &str) -> Option<DType> {
        Self::ALL.into_iter().find(|dtype| dtype.to_string() == name)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// Kind of the elements an attribute matrix describes
///
/// Pipelines persist the numeric codes.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum AttributeMatrixType {
    Vertex,
    Edge,
    Face,
    Cell,
    VertexFeature,
    EdgeFeature,
    FaceFeature,
    CellFeature,
    VertexEnsemble,
    EdgeEnsemble,
    FaceEnsemble,
    CellEnsemble,
    MetaData,
    Generic,
    Unknown,
    /// Wildcard used when matching requirements
    Any,
}

impl AttributeMatrixType {
    /// Returns the numeric code of the type.
    pub fn code(self) -> u32 {
        match self {
            Self::Vertex => 0,
            Self::Edge => 1,
            Self::Face => 2,
            Self::Cell => 3,
            Self::VertexFeature => 4,
            Self::EdgeFeature => 5,
            Self::FaceFeature => 6,
            Self::CellFeature => 7,
            Self::VertexEnsemble => 8,
            Self::EdgeEnsemble => 9,
            Self::FaceEnsemble => 10,
            Self::CellEnsemble => 11,
            Self::MetaData => 12,
            Self::Generic => 13,
            Self::Unknown => 999,
            Self::Any => 4_294_967_295,
        }
    }

    /// Look up a type by its numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        let all = [
            Self::Vertex,
            Self::Edge,
            Self::Face,
            Self::Cell,
            Self::VertexFeature,
            Self::EdgeFeature,
            Self::FaceFeature,
            Self::CellFeature,
            Self::VertexEnsemble,
            Self::EdgeEnsemble,
            Self::FaceEnsemble,
            Self::CellEnsemble,
            Self::MetaData,
            Self::Generic,
            Self::Unknown,
            Self::Any,
        ];
        all.into_iter().find(|t| t.code() == code)
    }

    /// Whether a matrix of this type satisfies a requirement for `required`.
    pub fn matches(self, required: AttributeMatrixType) -> bool {
        required == Self::Any || self == required
    }
}

/// Kind of geometry attached to a data container
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum GeometryType {
    Image,
    RectGrid,
    Vertex,
    Edge,
    Triangle,
    Quad,
    Tetrahedral,
    Hexahedral,
    Unknown,
    Any,
}

/// Physical unit of geometry lengths
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum LengthUnit {
    Yoctometer,
    Nanometer,
    Micrometer,
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,
    Inch,
    Foot,
    Angstrom,
    #[default]
    Unspecified,
    Unknown,
}

/// Address of a data container, attribute matrix or attribute array
///
/// Names must not contain `/`, the separator of the display form `dc/am/array`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DataArrayPath {
    #[serde(rename = "Data Container Name")]
    pub data_container_name: String,
    #[serde(rename = "Attribute Matrix Name")]
    pub attribute_matrix_name: String,
    #[serde(rename = "Data Array Name")]
    pub data_array_name: String,
}

impl DataArrayPath {
    /// Return a new DataArrayPath.
    pub fn new(
        data_container_name: impl Into<String>,
        attribute_matrix_name: impl Into<String>,
        data_array_name: impl Into<String>,
    ) -> Self {
        DataArrayPath {
            data_container_name: data_container_name.into(),
            attribute_matrix_name: attribute_matrix_name.into(),
            data_array_name: data_array_name.into(),
        }
    }

    /// Path to a data container.
    pub fn data_container(name: impl Into<String>) -> Self {
        Self::new(name, "", "")
    }

    /// Path to an attribute matrix.
    pub fn attribute_matrix(dc: impl Into<String>, am: impl Into<String>) -> Self {
        Self::new(dc, am, "")
    }

    /// Whether every component is empty.
    pub fn is_empty(&self) -> bool {
        self.data_container_name.is_empty()
            && self.attribute_matrix_name.is_empty()
            && self.data_array_name.is_empty()
    }

    /// Path of the attribute matrix that owns this path.
    pub fn attribute_matrix_path(&self) -> DataArrayPath {
        Self::attribute_matrix(&self.data_container_name, &self.attribute_matrix_name)
    }

    /// Whether two paths name the same data container and attribute matrix.
    pub fn has_same_attribute_matrix(&self, other: &DataArrayPath) -> bool {
        self.data_container_name == other.data_container_name
            && self.attribute_matrix_name == other.attribute_matrix_name
    }

    /// Parse the display form `dc/am/array`. Missing trailing components are left empty.
    pub fn parse(path: &str) -> Self {
        let mut parts = path.splitn(3, '/');
        let mut next = || parts.next().unwrap_or_default().to_string();
        let dc = next();
        let am = next();
        let da = next();
        Self::new(dc, am, da)
    }
}

impl fmt::Display for DataArrayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.data_container_name, self.attribute_matrix_name, self.data_array_name
        )
    }
}
