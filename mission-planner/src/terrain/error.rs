use super::layer::LayerId;
use thiserror::Error;

/// Failures while turning a user file into terrain geometry.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("'{file_name}' is not a supported terrain file (expected .obj, .tif or .tiff)")]
    UnsupportedExtension { file_name: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("mesh file is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed OBJ at line {line}: {reason}")]
    MalformedObj { line: usize, reason: String },

    #[error("terrain contains no triangles")]
    EmptyMesh,

    #[error("failed to decode raster: {0}")]
    Raster(#[from] image::ImageError),

    #[error("raster has no samples")]
    EmptyRaster,
}

/// Failures of layer bookkeeping operations.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("unknown terrain layer {0}")]
    UnknownLayer(LayerId),

    #[error("terrain layer {0} already has a content URL")]
    AlreadyResolved(LayerId),

    #[error("terrain layer {id} could not be decoded: {source}")]
    Decode {
        id: LayerId,
        #[source]
        source: ImportError,
    },
}
