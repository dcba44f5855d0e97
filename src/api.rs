// src/api.rs
//
// Операции границы хоста. Каждая — синхронный вызов без общего изменяемого состояния:
// собрать ImageView (под блокировкой, если это поверхность), перевести опции, один раз
// вызвать движок, перевести результаты. Сбой — один `BridgeError`, частичных списков нет.

use tracing::{debug, warn};

use crate::core::image::{CropRect, ImageFormat, ImageView, Rotation};
use crate::core::types::{Barcode, BarcodeFormat, BitMatrix};
use crate::engine::{
    BuiltinEngine, CharacterSet, DetectEngine, EngineFailure, GtinUtils, RenderEngine, RenderRequest,
};
use crate::error::{BridgeError, Result};
use crate::options::{ReaderHints, ReaderOptions};
use crate::surface::{LockedPixels, PixelSurface};
use crate::translate::translate;

/// Точка входа хоста. Движки подставляются параметрами; по умолчанию — встроенный.
#[derive(Clone, Debug)]
pub struct Bridge<D = BuiltinEngine, G = BuiltinEngine, R = BuiltinEngine> {
    detector: D,
    gtin: G,
    renderer: R,
}

impl Bridge {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::with_engines(BuiltinEngine, BuiltinEngine, BuiltinEngine)
    }
}

impl<D, G, R> Bridge<D, G, R> {
    pub fn with_engines(detector: D, gtin: G, renderer: R) -> Self {
        Self { detector, gtin, renderer }
    }
}

impl<D: DetectEngine, G: GtinUtils, R> Bridge<D, G, R> {
    /// Один вызов движка на изображение. `Ok(None)` — символов нет; порядок результатов — порядок движка.
    pub fn decode(&self, image: &ImageView<'_>, options: &ReaderOptions) -> Result<Option<Vec<Barcode>>> {
        debug!(
            width = image.width(),
            height = image.height(),
            format = ?image.format(),
            formats = options.formats().bits(),
            "decode"
        );
        let raw = self
            .detector
            .detect_and_decode(image, options)
            .map_err(|e| engine_failed("detection", e))?;
        if raw.is_empty() {
            debug!("no symbols found");
            return Ok(None);
        }
        let results = raw
            .into_iter()
            .map(|r| translate(r, &self.gtin))
            .collect::<Result<Vec<_>>>()?;
        debug!(found = results.len(), "decode finished");
        Ok(Some(results))
    }

    /// Первый найденный символ: движок останавливается после одного.
    pub fn read_first(&self, image: &ImageView<'_>, options: &ReaderOptions) -> Result<Option<Barcode>> {
        let options = options.with_max_number_of_symbols(1);
        Ok(self.decode(image, &options)?.and_then(|found| found.into_iter().next()))
    }

    /// Яркостная плоскость кадра (Y из YUV): `crop` в координатах плоскости, затем поворот.
    pub fn read_plane(
        &self,
        plane: &[u8],
        row_stride: usize,
        crop: CropRect,
        rotation: i32,
        hints: &ReaderHints,
    ) -> Result<Option<Vec<Barcode>>> {
        let rotation = Rotation::try_from(rotation)?;
        let image = ImageView::from_plane(plane, row_stride, ImageFormat::Lum, crop)?.rotated_by(rotation);
        let options = ReaderOptions::try_from(hints)?;
        self.decode(&image, &options)
    }

    /// Буфер кадра целиком (NV21 и т.п.): читается ведущая Y-плоскость, остальное игнорируется.
    pub fn read_interleaved_buffer(
        &self,
        buffer: &[u8],
        row_stride: usize,
        crop: CropRect,
        rotation: i32,
        hints: &ReaderHints,
    ) -> Result<Option<Vec<Barcode>>> {
        self.read_plane(buffer, row_stride, crop, rotation, hints)
    }

    /// Поверхность читается только под блокировкой; она снимается при любом исходе,
    /// включая ошибки кропа, поворота и опций.
    pub fn read_surface<S: PixelSurface + ?Sized>(
        &self,
        surface: &S,
        crop: CropRect,
        rotation: i32,
        hints: &ReaderHints,
    ) -> Result<Option<Vec<Barcode>>> {
        let locked = LockedPixels::acquire(surface)?;
        let image = locked.view(crop, Rotation::try_from(rotation)?)?;
        let options = ReaderOptions::try_from(hints)?;
        self.decode(&image, &options)
    }
}

impl<D, G, R: RenderEngine> Bridge<D, G, R> {
    /// Текст уходит в движок кодовыми точками Unicode.
    pub fn encode_text(
        &self,
        text: &str,
        format: &str,
        width: i32,
        height: i32,
        margin: i32,
        ecc_level: i32,
    ) -> Result<BitMatrix> {
        let format: BarcodeFormat = format.parse()?;
        let contents: Vec<char> = text.chars().collect();
        self.render(&RenderRequest {
            contents: &contents,
            encoding: CharacterSet::Utf8,
            format,
            width,
            height,
            margin,
            ecc_level,
        })
    }

    /// Байты уходят в движок как есть: по одному символу 0..=255 на байт, без текстовых перекодировок.
    pub fn encode_bytes(
        &self,
        bytes: &[u8],
        format: &str,
        width: i32,
        height: i32,
        margin: i32,
        ecc_level: i32,
    ) -> Result<BitMatrix> {
        let format: BarcodeFormat = format.parse()?;
        let contents: Vec<char> = bytes.iter().map(|&b| char::from(b)).collect();
        self.render(&RenderRequest {
            contents: &contents,
            encoding: CharacterSet::Binary,
            format,
            width,
            height,
            margin,
            ecc_level,
        })
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<BitMatrix> {
        debug!(
            format = %request.format,
            encoding = ?request.encoding,
            width = request.width,
            height = request.height,
            margin = request.margin,
            ecc_level = request.ecc_level,
            "encode"
        );
        let grid = self.renderer.render(request).map_err(|e| engine_failed("rendering", e))?;
        let data = grid
            .modules
            .iter()
            .map(|&dark| if dark { BitMatrix::DARK } else { BitMatrix::LIGHT })
            .collect();
        BitMatrix::new(grid.width, grid.height, data)
    }
}

fn engine_failed(stage: &str, e: EngineFailure) -> BridgeError {
    warn!(stage, error = %e, "engine failure");
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ModuleGrid, RawBarcode};
    use crate::error::ErrorKind;

    struct Failing;

    impl DetectEngine for Failing {
        fn detect_and_decode(&self, _: &ImageView<'_>, _: &ReaderOptions) -> Result<Vec<RawBarcode>, EngineFailure> {
            Err(EngineFailure::new("engine exploded"))
        }
    }

    impl RenderEngine for Failing {
        fn render(&self, _: &RenderRequest<'_>) -> Result<ModuleGrid, EngineFailure> {
            Err(EngineFailure::new("cannot render"))
        }
    }

    /// Рендер, который запоминает, что ему передали.
    #[derive(Default)]
    struct Recorder(std::cell::RefCell<Vec<(Vec<char>, CharacterSet)>>);

    impl RenderEngine for Recorder {
        fn render(&self, request: &RenderRequest<'_>) -> Result<ModuleGrid, EngineFailure> {
            self.0.borrow_mut().push((request.contents.to_vec(), request.encoding));
            let mut grid = ModuleGrid::new(2, 1);
            grid.set_region(0, 0, 1, 1);
            Ok(grid)
        }
    }

    #[test]
    fn blank_image_is_absence_not_error() {
        let data = vec![255u8; 64 * 8];
        let image = ImageView::new(&data, 64, 8, ImageFormat::Lum, 64).unwrap();
        assert_eq!(Bridge::new().decode(&image, &ReaderOptions::default()), Ok(None));
    }

    #[test]
    fn engine_failure_becomes_single_error() {
        let bridge = Bridge::with_engines(Failing, BuiltinEngine, Failing);
        let data = [0u8; 4];
        let image = ImageView::new(&data, 2, 2, ImageFormat::Lum, 2).unwrap();
        let e = bridge.decode(&image, &ReaderOptions::default()).unwrap_err();
        assert_eq!(e, BridgeError::Engine("engine exploded".into()));

        let e = bridge.encode_text("x", "QR_CODE", 10, 10, -1, -1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Engine);
        assert_eq!(e.to_string(), "cannot render");
    }

    #[test]
    fn bytes_are_passed_one_char_per_byte() {
        let bridge = Bridge::with_engines(BuiltinEngine, BuiltinEngine, Recorder::default());
        let m = bridge.encode_bytes(&[0x00, 0xC3, 0xFF], "QR_CODE", 0, 0, -1, -1).unwrap();
        assert_eq!(m.data(), &[BitMatrix::DARK, BitMatrix::LIGHT]);
        bridge.encode_text("é", "QR_CODE", 0, 0, -1, -1).unwrap();

        let calls = bridge.renderer.0.borrow();
        assert_eq!(calls[0], (vec!['\u{0}', '\u{c3}', '\u{ff}'], CharacterSet::Binary));
        assert_eq!(calls[1], (vec!['é'], CharacterSet::Utf8));
    }

    #[test]
    fn unknown_format_name_is_rejected_before_rendering() {
        let bridge = Bridge::with_engines(BuiltinEngine, BuiltinEngine, Recorder::default());
        let e = bridge.encode_text("x", "NOT_A_FORMAT", 0, 0, -1, -1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(bridge.renderer.0.borrow().is_empty());
    }

    #[test]
    fn bad_rotation_is_invalid_argument() {
        let plane = [255u8; 16];
        let e = Bridge::new()
            .read_plane(&plane, 4, CropRect::new(0, 0, 4, 4), 45, &ReaderHints::default())
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
