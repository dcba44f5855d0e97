// tests/integration_smoke.rs
//
// Интеграционные тесты верхнего уровня: операции Bridge целиком, со встроенным движком
// и с подменными движками/поверхностями там, где нужен конкретный сбой.

use std::cell::Cell;
use std::rc::Rc;

use ultracode_bridge::engine::{DetectEngine, EngineFailure, RawBarcode, RawError};
use ultracode_bridge::prelude::*;

/// Code128 `text` высотой `height`, отрисованный самим мостом: (яркости, ширина).
fn code128_luma(text: &str, height: i32) -> (Vec<u8>, usize) {
    let m = Bridge::new().encode_text(text, "CODE_128", 0, height, -1, -1).unwrap();
    (to_luma(&m), m.width())
}

fn to_luma(m: &BitMatrix) -> Vec<u8> {
    m.data().iter().map(|&v| if v == BitMatrix::DARK { 0 } else { 255 }).collect()
}

fn full(width: usize, height: usize) -> CropRect {
    CropRect::new(0, 0, width as i32, height as i32)
}

fn raw(format: BarcodeFormat, text: &str) -> RawBarcode {
    RawBarcode {
        format: format.bit(),
        content_type: 0,
        text: text.into(),
        plain_text: text.into(),
        bytes: text.as_bytes().to_vec(),
        position: [Point::new(1, 2), Point::new(11, 2), Point::new(11, 5), Point::new(1, 5)],
        ec_level: String::new(),
        symbology_identifier: String::new(),
        sequence_size: -1,
        sequence_index: -1,
        sequence_id: String::new(),
        reader_init: false,
        line_count: 4,
        version: String::new(),
        error: None,
    }
}

/// Движок, который всегда отдаёт заготовленный список и запоминает лимит символов.
struct Scripted {
    results: Vec<RawBarcode>,
    seen_max: Rc<Cell<i32>>,
}

impl Scripted {
    fn new(results: Vec<RawBarcode>) -> Self {
        Self { results, seen_max: Rc::default() }
    }
}

impl DetectEngine for Scripted {
    fn detect_and_decode(&self, _: &ImageView<'_>, options: &ReaderOptions) -> Result<Vec<RawBarcode>, EngineFailure> {
        self.seen_max.set(options.max_number_of_symbols());
        Ok(self.results.clone())
    }
}

struct Exploding;

impl DetectEngine for Exploding {
    fn detect_and_decode(&self, _: &ImageView<'_>, _: &ReaderOptions) -> Result<Vec<RawBarcode>, EngineFailure> {
        Err(EngineFailure::new("out of memory in detector"))
    }
}

/// Поверхность, считающая снятия блокировки.
struct Counting {
    inner: BitmapSurface,
    unlocks: Cell<u32>,
}

impl Counting {
    fn new(inner: BitmapSurface) -> Self {
        Self { inner, unlocks: Cell::new(0) }
    }
}

impl PixelSurface for Counting {
    fn info(&self) -> SurfaceInfo {
        self.inner.info()
    }

    fn lock_pixels(&self) -> Option<&[u8]> {
        self.inner.lock_pixels()
    }

    fn unlock_pixels(&self) {
        self.unlocks.set(self.unlocks.get() + 1);
        self.inner.unlock_pixels();
    }
}

/// Поверхность, которую невозможно заблокировать.
struct Unlockable;

impl PixelSurface for Unlockable {
    fn info(&self) -> SurfaceInfo {
        SurfaceInfo { width: 1, height: 1, stride: 1, format: SurfaceFormat::Alpha8 }
    }

    fn lock_pixels(&self) -> Option<&[u8]> {
        None
    }

    fn unlock_pixels(&self) {
        panic!("unlock without a successful lock");
    }
}

#[test]
fn single_row_code128_reads_back() {
    let (luma, width) = code128_luma("12345", 1);
    let found = Bridge::new()
        .read_plane(&luma, width, full(width, 1), 0, &ReaderHints::default())
        .unwrap()
        .expect("symbol");
    assert_eq!(found.len(), 1);
    let b = &found[0];
    assert_eq!(b.format, BarcodeFormat::Code128);
    assert_eq!(b.text, "12345");
    assert_eq!(b.sequence_size, 0);
    assert!(b.gtin.is_none());
    assert!(b.error.is_none());
    assert_eq!(b.bytes, b"12345");
}

#[test]
fn qr_hello_renders_at_requested_size() {
    let m = Bridge::new().encode_text("HELLO", "QR_CODE", 200, 200, 1, -1).unwrap();
    assert_eq!((m.width(), m.height()), (200, 200));
    assert!(m.data().iter().any(|&v| v == BitMatrix::DARK));
    assert!(m.data().iter().all(|&v| v == BitMatrix::DARK || v == BitMatrix::LIGHT));
}

#[test]
fn empty_image_is_absence() {
    let plane = vec![200u8; 120 * 40];
    let found = Bridge::new()
        .read_plane(&plane, 120, full(120, 40), 0, &ReaderHints::default())
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn engine_failure_surfaces_once_with_message() {
    let bridge = Bridge::with_engines(Exploding, BuiltinEngine, BuiltinEngine);
    let plane = [0u8; 16];
    let e = bridge
        .read_plane(&plane, 4, full(4, 4), 0, &ReaderHints::default())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Engine);
    assert_eq!(e.to_string(), "out of memory in detector");
}

#[test]
fn malformed_gtin_payload_keeps_the_result() {
    let bridge = Bridge::with_engines(
        Scripted::new(vec![raw(BarcodeFormat::Ean13, "ABCDEFGHIJKLM")]),
        BuiltinEngine,
        BuiltinEngine,
    );
    let plane = [0u8; 16];
    let found = bridge
        .read_plane(&plane, 4, full(4, 4), 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    let b = &found[0];
    assert_eq!(b.format, BarcodeFormat::Ean13);
    assert_eq!(b.text, "ABCDEFGHIJKLM");
    assert_eq!(b.line_count, 4);
    assert_eq!(b.position.to_string(), "1x2 11x2 11x5 1x5");
    assert!(b.gtin.is_none());
}

#[test]
fn ean13_round_trip_carries_gtin_country() {
    let m = Bridge::new().encode_text("4006381333931", "EAN_13", 0, 20, -1, -1).unwrap();
    let luma = to_luma(&m);
    let found = Bridge::new()
        .read_plane(&luma, m.width(), full(m.width(), m.height()), 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].format, BarcodeFormat::Ean13);
    assert_eq!(found[0].text, "4006381333931");
    let gtin = found[0].gtin.as_ref().expect("gtin");
    assert_eq!(gtin.country, "DE");
    assert_eq!(gtin.add_on, "");
}

#[test]
fn rotation_is_applied_before_decoding() {
    let (luma, width) = code128_luma("12345", 1);
    let found = Bridge::new()
        .read_plane(&luma, width, full(width, 1), 90, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found[0].text, "12345");
    // после поворота символ идёт сверху вниз
    assert_eq!(found[0].orientation, 90);
    assert_eq!(found[0].position.top_left, Point::new(0, 5));
}

#[test]
fn interleaved_buffer_reads_the_leading_plane() {
    let (mut buf, width) = code128_luma("12345", 1);
    // хвост с цветоразностными данными не читается
    buf.extend(std::iter::repeat(128u8).take(width / 2));
    let found = Bridge::new()
        .read_interleaved_buffer(&buf, width, full(width, 1), 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found[0].text, "12345");
}

/// Code128 "12345" (89×10) на белом поле 120×30 с левым верхним углом в (20, 8).
fn framed_code128() -> (Vec<u8>, usize, usize) {
    let (code, code_w) = code128_luma("12345", 10);
    let (width, height) = (120, 30);
    let mut plane = vec![255u8; width * height];
    for (y, row) in code.chunks(code_w).enumerate() {
        let at = (8 + y) * width + 20;
        plane[at..at + code_w].copy_from_slice(row);
    }
    (plane, width, height)
}

#[test]
fn positions_are_relative_to_the_crop() {
    let (plane, width, _) = framed_code128();
    let crop = CropRect::new(7, 3, 110, 25);
    let found = Bridge::new()
        .read_plane(&plane, width, crop, 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found.len(), 1);
    let p = found[0].position;
    // первый штрих в плоскости: x = 20 + 5, строки 8..=17
    assert_eq!(p.top_left, Point::new(18, 5));
    assert_eq!(p.top_right, Point::new(96, 5));
    assert_eq!(p.bottom_right, Point::new(96, 14));
    assert_eq!(p.bottom_left, Point::new(18, 14));
}

#[test]
fn surface_positions_are_relative_to_the_crop() {
    let (plane, width, height) = framed_code128();
    let surface = BitmapSurface::alpha8(width, height, plane);
    let found = Bridge::new()
        .read_surface(&surface, CropRect::new(7, 3, 110, 25), 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found[0].text, "12345");
    assert_eq!(found[0].position.top_left, Point::new(18, 5));
    assert_eq!(found[0].position.bottom_right, Point::new(96, 14));
}

#[test]
fn crop_outside_plane_is_invalid_argument() {
    let plane = [255u8; 64];
    let e = Bridge::new()
        .read_plane(&plane, 8, CropRect::new(4, 4, 8, 8), 0, &ReaderHints::default())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn bad_hint_strings_are_invalid_argument() {
    let plane = [255u8; 64];
    let read = |hints: &ReaderHints| Bridge::new().read_plane(&plane, 8, full(8, 8), 0, hints);

    let hints = ReaderHints { binarizer: "OTSU".into(), ..Default::default() };
    assert_eq!(read(&hints).unwrap_err().kind(), ErrorKind::InvalidArgument);

    let hints = ReaderHints { text_mode: "hri".into(), ..Default::default() };
    assert_eq!(read(&hints).unwrap_err().kind(), ErrorKind::InvalidArgument);

    let hints = ReaderHints { formats: vec!["QR_CODE".into(), "BOGUS".into()], ..Default::default() };
    assert_eq!(read(&hints).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn surface_is_unlocked_on_every_path() {
    let (luma, width) = code128_luma("12345", 8);
    let surface = Counting::new(BitmapSurface::alpha8(width, 8, luma));

    let found = Bridge::new()
        .read_surface(&surface, full(width, 8), 0, &ReaderHints::default())
        .unwrap()
        .unwrap();
    assert_eq!(found[0].text, "12345");
    assert_eq!(surface.unlocks.get(), 1);

    let e = Bridge::new()
        .read_surface(&surface, CropRect::new(0, 0, width as i32 + 1, 8), 0, &ReaderHints::default())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    assert_eq!(surface.unlocks.get(), 2);

    let hints = ReaderHints { ean_add_on_symbol: "SOMETIMES".into(), ..Default::default() };
    assert!(Bridge::new().read_surface(&surface, full(width, 8), 0, &hints).is_err());
    assert_eq!(surface.unlocks.get(), 3);

    let failing = Bridge::with_engines(Exploding, BuiltinEngine, BuiltinEngine);
    assert!(failing.read_surface(&surface, full(width, 8), 0, &ReaderHints::default()).is_err());
    assert_eq!(surface.unlocks.get(), 4);
    assert!(!surface.inner.is_locked());
}

#[test]
fn lock_failure_is_resource_acquisition() {
    let e = Bridge::new()
        .read_surface(&Unlockable, full(1, 1), 0, &ReaderHints::default())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ResourceAcquisition);
}

#[test]
fn unsupported_surface_format_is_rejected_under_lock() {
    let info = SurfaceInfo { width: 2, height: 2, stride: 4, format: SurfaceFormat::Rgb565 };
    let surface = Counting::new(BitmapSurface::new(info, vec![0; 8]));
    let e = Bridge::new()
        .read_surface(&surface, full(2, 2), 0, &ReaderHints::default())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    assert_eq!(surface.unlocks.get(), 1);
}

#[test]
fn engine_values_outside_vocabulary_fail_the_call() {
    let mut bad = raw(BarcodeFormat::QrCode, "x");
    bad.content_type = 9;
    let bridge = Bridge::with_engines(
        Scripted::new(vec![raw(BarcodeFormat::QrCode, "ok"), bad]),
        BuiltinEngine,
        BuiltinEngine,
    );
    let plane = [0u8; 4];
    let e = bridge.read_plane(&plane, 2, full(2, 2), 0, &ReaderHints::default()).unwrap_err();
    assert_eq!(e, BridgeError::Engine("Invalid contentType: 9".into()));

    let mut bad = raw(BarcodeFormat::QrCode, "x");
    bad.error = Some(RawError { kind: 0, message: String::new() });
    let bridge = Bridge::with_engines(Scripted::new(vec![bad]), BuiltinEngine, BuiltinEngine);
    assert_eq!(
        bridge.read_plane(&plane, 2, full(2, 2), 0, &ReaderHints::default()).unwrap_err().kind(),
        ErrorKind::Engine
    );
}

#[test]
fn read_first_limits_the_engine_to_one_symbol() {
    let scripted = Scripted::new(vec![raw(BarcodeFormat::QrCode, "a"), raw(BarcodeFormat::QrCode, "b")]);
    let bridge = Bridge::with_engines(scripted, BuiltinEngine, BuiltinEngine);
    let plane = [0u8; 4];
    let image = ImageView::new(&plane, 2, 2, ImageFormat::Lum, 2).unwrap();
    let first = bridge.read_first(&image, &ReaderOptions::default()).unwrap().unwrap();
    assert_eq!(first.text, "a");

    let (luma, width) = code128_luma("FIRST", 4);
    let image = ImageView::new(&luma, width, 4, ImageFormat::Lum, width).unwrap();
    let first = Bridge::new().read_first(&image, &ReaderOptions::default()).unwrap();
    assert_eq!(first.map(|b| b.text), Some("FIRST".to_owned()));
}

#[test]
fn read_first_passes_limit_to_engine() {
    let scripted = Scripted::new(Vec::new());
    let seen_max = Rc::clone(&scripted.seen_max);
    let bridge = Bridge::with_engines(scripted, BuiltinEngine, BuiltinEngine);
    let plane = [0u8; 4];
    let image = ImageView::new(&plane, 2, 2, ImageFormat::Lum, 2).unwrap();
    assert_eq!(bridge.read_first(&image, &ReaderOptions::default()), Ok(None));
    assert_eq!(seen_max.get(), 1);

    bridge.decode(&image, &ReaderOptions::default()).unwrap();
    assert_eq!(seen_max.get(), 255);
}

#[test]
fn binary_payload_encodes() {
    let m = Bridge::new().encode_bytes(&[0x80, 0xff, 0x00], "QR_CODE", 0, 0, -1, -1).unwrap();
    assert_eq!((m.width(), m.height()), (29, 29));
}

#[test]
fn encode_failures_by_kind() {
    let bridge = Bridge::new();
    let e = bridge.encode_text("x", "AZTEC", 10, 10, -1, -1).unwrap_err();
    assert_eq!(e, BridgeError::Engine("Unsupported format: AZTEC".into()));

    let e = bridge.encode_text("x", "NO_SUCH_FORMAT", 10, 10, -1, -1).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);

    let e = bridge.encode_text("12345", "EAN_13", 10, 10, -1, -1).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Engine);

    let e = bridge.encode_text("x", "CODE_128", -5, 10, -1, -1).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Engine);
}

#[test]
fn huge_render_requests_fail_instead_of_allocating() {
    let bridge = Bridge::new();
    let cases = [
        ("HELLO", "QR_CODE", 0, 0, i32::MAX),
        ("AB", "CODE_128", 0, 0, i32::MAX),
        ("HELLO", "QR_CODE", i32::MAX, i32::MAX, -1),
        ("AB", "CODE_128", i32::MAX, 1, -1),
        ("4006381333931", "EAN_13", 100_000, 100_000, -1),
    ];
    for (text, format, width, height, margin) in cases {
        let e = bridge.encode_text(text, format, width, height, margin, -1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Engine, "{format} {width}x{height} margin {margin}");
        assert!(e.to_string().starts_with("Requested dimensions are too large"), "{e}");
    }
    // обычный запрос по-прежнему рисуется
    assert!(bridge.encode_text("AB", "CODE_128", 400, 50, -1, -1).is_ok());
}

#[test]
fn format_names_parse_loosely() {
    let bridge = Bridge::new();
    let a = bridge.encode_text("HELLO", "qr-code", 0, 0, -1, -1).unwrap();
    let b = bridge.encode_text("HELLO", "QRCode", 0, 0, -1, -1).unwrap();
    assert_eq!(a, b);
}
