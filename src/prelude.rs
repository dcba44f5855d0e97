// src/prelude.rs
//
// То, что нужно почти каждому вызывающему: `use ultracode_bridge::prelude::*;`.

pub use crate::api::Bridge;
pub use crate::core::image::{CropRect, ImageFormat, ImageView, Rotation};
pub use crate::core::types::{
    Barcode, BarcodeFormat, BarcodeFormats, BitMatrix, ContentType, ErrorType, Gtin, Point, Position,
    SymbolError,
};
pub use crate::engine::BuiltinEngine;
pub use crate::error::{BridgeError, ErrorKind, Result};
pub use crate::options::{Binarizer, EanAddOnSymbol, ReaderHints, ReaderOptions, TextMode};
pub use crate::surface::{BitmapSurface, PixelSurface, SurfaceFormat, SurfaceInfo};
