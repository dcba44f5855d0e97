#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Граница хоста
pub mod api;      // Bridge: read_* / decode / encode_*
pub mod error;    // BridgeError + Result
pub mod options;  // ReaderOptions, ReaderHints, словари enum'ов
pub mod prelude;  // удобные re-export'ы
pub mod surface;  // блокировка пикселей поверхности
pub mod translate; // сырые результаты -> Barcode, GTIN

pub mod core;     // ImageView и объектный граф результата
pub mod engine;   // интерфейсы движка + встроенный движок

pub mod binarize; // бинаризация линий для 1D
pub mod one_d;    // 1D: Code128, EAN-13/UPC-A
pub mod qr;       // рендер QR

// Только для бинарников: библиотека подписчика не ставит.
pub mod logger;

pub use crate::api::Bridge;
pub use crate::core::image::{CropRect, ImageFormat, ImageView, Rotation};
pub use crate::core::types::{Barcode, BarcodeFormat, BarcodeFormats, BitMatrix};
pub use crate::error::{BridgeError, ErrorKind, Result};
pub use crate::options::{ReaderHints, ReaderOptions};
