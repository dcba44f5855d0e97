//! Встроенный движок на чистом Rust.
//!
//! Детекция — только 1D (Code 128, EAN-13/UPC-A):
//! 1) равномерно выбранные строки, при `try_rotate` ещё и столбцы;
//! 2) каждая линия бинаризуется и читается в обе стороны, при `try_invert` — ещё и в инверсии;
//! 3) одинаковые находки сливаются в один символ, `line_count` — число линий с ним.
//!
//! Рендер — QR (через `qrcode`), Code 128, EAN-13, UPC-A.

use tracing::trace;

use super::{
    gtin, CharacterSet, DetectEngine, EngineFailure, GtinUtils, ModuleGrid, RawBarcode, RawError,
    RenderEngine, RenderRequest,
};
use crate::binarize::binarize_line;
use crate::core::image::ImageView;
use crate::core::types::{BarcodeFormat, BarcodeFormats, Point};
use crate::one_d::{self, code128, ean13, RowHit};
use crate::options::{EanAddOnSymbol, ReaderOptions, TextMode};
use crate::qr;

/// Линий на ось в обычном режиме.
const LINES: usize = 15;
const LINES_TRY_HARDER: usize = 256;
/// Короче этого линия не вмещает ни одного символа с тихими зонами; такие не сканируются.
const MIN_LINE_LEN: usize = 32;

/// Тихая зона 1D по умолчанию, модулей на обе стороны вместе.
const CODE128_MARGIN: usize = 10;
const EAN_MARGIN: usize = 9;

const CONTENT_TEXT: i32 = 0;
const CONTENT_GS1: i32 = 3;
const ERROR_CHECKSUM: i32 = 2;

const ASCII_CONTROL_NAMES: [&str; 32] = [
    "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS", "HT", "LF", "VT", "FF", "CR", "SO",
    "SI", "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM", "SUB", "ESC", "FS",
    "GS", "RS", "US",
];

/// Движок по умолчанию. Без состояния: один экземпляр обслуживает любые вызовы.
#[derive(Copy, Clone, Debug, Default)]
pub struct BuiltinEngine;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    Rows,
    Columns,
}

/// Находка на линии: первый и последний пиксель символа в координатах линии,
/// по направлению чтения.
struct LineHit {
    hit: RowHit,
    first: usize,
    last: usize,
}

/// Один символ, увиденный на нескольких линиях одной оси.
#[derive(Debug)]
struct Track {
    axis: Axis,
    format: BarcodeFormat,
    text: String,
    gs1: bool,
    checksum_ok: bool,
    /// (начало, конец) первой и последней линии.
    first: (Point, Point),
    last: (Point, Point),
    lines: i32,
}

impl DetectEngine for BuiltinEngine {
    fn detect_and_decode(
        &self,
        image: &ImageView<'_>,
        options: &ReaderOptions,
    ) -> Result<Vec<RawBarcode>, EngineFailure> {
        let enabled = enabled_formats(options);
        if enabled.is_empty() {
            trace!(formats = options.formats().bits(), "no linear format requested");
            return Ok(Vec::new());
        }

        let mut tracks = Vec::new();
        let rows = scan_axis(image, Axis::Rows, options, enabled, &mut tracks);
        let cols = if options.try_rotate() {
            scan_axis(image, Axis::Columns, options, enabled, &mut tracks)
        } else {
            0
        };

        let required = |axis: Axis| {
            let scanned = if axis == Axis::Rows { rows } else { cols };
            options.min_line_count().max(1).min(to_i32(scanned))
        };
        let mut out: Vec<RawBarcode> = tracks
            .into_iter()
            .filter(|t| t.lines >= required(t.axis))
            .map(|t| t.into_raw(options.text_mode()))
            .collect();
        if let Ok(max) = usize::try_from(options.max_number_of_symbols()) {
            if max > 0 {
                out.truncate(max);
            }
        }
        trace!(rows, cols, found = out.len(), "linear scan finished");
        Ok(out)
    }
}

impl GtinUtils for BuiltinEngine {
    fn country_identifier(&self, text: &str, format: BarcodeFormat) -> Result<String, EngineFailure> {
        gtin::lookup_country_identifier(text, format)
    }

    fn ean_add_on(&self, text: &str, format: BarcodeFormat) -> Result<String, EngineFailure> {
        Ok(gtin::ean_add_on(text, format))
    }

    fn price(&self, add_on: &str) -> Result<String, EngineFailure> {
        gtin::price(add_on)
    }

    fn issue_nr(&self, add_on: &str) -> Result<String, EngineFailure> {
        gtin::issue_nr(add_on)
    }
}

impl RenderEngine for BuiltinEngine {
    fn render(&self, request: &RenderRequest<'_>) -> Result<ModuleGrid, EngineFailure> {
        let (Ok(width), Ok(height)) = (usize::try_from(request.width), usize::try_from(request.height)) else {
            return Err(EngineFailure::new(format!(
                "Requested dimensions can't be negative: {}x{}",
                request.width, request.height
            )));
        };
        let margin = usize::try_from(request.margin).ok();

        match request.format {
            BarcodeFormat::QrCode => {
                let data = payload_bytes(request.contents, request.encoding)?;
                let code = qr::encode(&data, qr::ec_level(request.ecc_level))?;
                qr::inflate(&code, width, height, margin.unwrap_or(qr::DEFAULT_QUIET_ZONE))
            }
            BarcodeFormat::Code128 => {
                let code = code128::encode(request.contents)?;
                one_d::render_linear(&code, width, height, margin.unwrap_or(CODE128_MARGIN))
            }
            BarcodeFormat::Ean13 => {
                let code = ean13::encode(request.contents)?;
                one_d::render_linear(&code, width, height, margin.unwrap_or(EAN_MARGIN))
            }
            BarcodeFormat::UpcA => {
                let code = ean13::encode_upca(request.contents)?;
                one_d::render_linear(&code, width, height, margin.unwrap_or(EAN_MARGIN))
            }
            other => Err(EngineFailure::new(format!("Unsupported format: {other}"))),
        }
    }
}

/// Линейные форматы, которые стоит искать. `Require` без чтения add-on'ов исключает EAN/UPC целиком.
fn enabled_formats(options: &ReaderOptions) -> BarcodeFormats {
    let gtin_allowed = options.ean_add_on_symbol() != EanAddOnSymbol::Require;
    [BarcodeFormat::Code128, BarcodeFormat::Ean13, BarcodeFormat::UpcA]
        .into_iter()
        .filter(|&f| options.formats().accepts(f) && (gtin_allowed || !f.is_gtin()))
        .collect()
}

/// Просканировать одну ось. Возвращает число прочитанных линий.
fn scan_axis(
    image: &ImageView<'_>,
    axis: Axis,
    options: &ReaderOptions,
    enabled: BarcodeFormats,
    tracks: &mut Vec<Track>,
) -> usize {
    let (len, count) = match axis {
        Axis::Rows => (image.width(), image.height()),
        Axis::Columns => (image.height(), image.width()),
    };
    if len < MIN_LINE_LEN || count == 0 {
        return 0;
    }
    let lines = if options.is_pure() {
        1
    } else {
        count.min(if options.try_harder() { LINES_TRY_HARDER } else { LINES })
    };

    let mut buf = Vec::with_capacity(len);
    for i in 0..lines {
        let at = if lines == 1 { count / 2 } else { i * (count - 1) / (lines - 1) };
        let luma = match axis {
            Axis::Rows => image.row_luma(at, &mut buf),
            Axis::Columns => image.col_luma(at, &mut buf),
        };
        let bits = binarize_line(luma, options.binarizer());
        let Some(found) = read_line(bits, enabled, options.return_errors(), options.try_invert()) else {
            continue;
        };
        let Some((format, text)) = classify(&found.hit, enabled) else {
            continue;
        };

        let point = |p: usize| match axis {
            Axis::Rows => Point::new(to_i32(p), to_i32(at)),
            Axis::Columns => Point::new(to_i32(at), to_i32(p)),
        };
        let ends = (point(found.first), point(found.last));
        let checksum_ok = found.hit.checksum_ok;
        match tracks
            .iter_mut()
            .find(|t| t.axis == axis && t.format == format && t.text == text && t.checksum_ok == checksum_ok)
        {
            Some(t) => {
                t.last = ends;
                t.lines += 1;
            }
            None => tracks.push(Track {
                axis,
                format,
                text,
                gs1: found.hit.gs1,
                checksum_ok,
                first: ends,
                last: ends,
                lines: 1,
            }),
        }
    }
    lines
}

/// Прямое чтение, затем обратное; при `try_invert` то же на инвертированной линии.
fn read_line(mut bits: Vec<bool>, enabled: BarcodeFormats, accept_bad: bool, try_invert: bool) -> Option<LineHit> {
    let passes = if try_invert { 2 } else { 1 };
    for pass in 0..passes {
        if pass == 1 {
            bits.iter_mut().for_each(|b| *b = !*b);
        }
        if let Some(hit) = one_d::decode_line(&bits, enabled, accept_bad) {
            return Some(LineHit { first: hit.start, last: hit.end - 1, hit });
        }
        bits.reverse();
        let reversed = one_d::decode_line(&bits, enabled, accept_bad);
        bits.reverse();
        if let Some(hit) = reversed {
            let n = bits.len();
            return Some(LineHit { first: n - 1 - hit.start, last: n - hit.end, hit });
        }
    }
    None
}

/// Итоговый формат находки. EAN-13 с ведущим нулём — это UPC-A, если он запрошен.
fn classify(hit: &RowHit, enabled: BarcodeFormats) -> Option<(BarcodeFormat, String)> {
    match hit.format {
        BarcodeFormat::Ean13 => {
            if let Some(upc) = hit.text.strip_prefix('0') {
                if enabled.contains(BarcodeFormat::UpcA) {
                    return Some((BarcodeFormat::UpcA, upc.to_owned()));
                }
            }
            enabled
                .contains(BarcodeFormat::Ean13)
                .then(|| (BarcodeFormat::Ean13, hit.text.clone()))
        }
        format => Some((format, hit.text.clone())),
    }
}

impl Track {
    fn into_raw(self, mode: TextMode) -> RawBarcode {
        let symbology_identifier = match self.format {
            BarcodeFormat::Code128 if self.gs1 => "]C1",
            BarcodeFormat::Code128 => "]C0",
            _ => "]E0",
        }
        .to_owned();
        RawBarcode {
            format: self.format.bit(),
            content_type: if self.gs1 { CONTENT_GS1 } else { CONTENT_TEXT },
            text: render_text(&self.text, mode, &symbology_identifier),
            bytes: self.text.as_bytes().to_vec(),
            plain_text: self.text,
            position: [self.first.0, self.first.1, self.last.1, self.last.0],
            ec_level: String::new(),
            symbology_identifier,
            sequence_size: -1,
            sequence_index: -1,
            sequence_id: String::new(),
            reader_init: false,
            line_count: self.lines,
            version: String::new(),
            error: (!self.checksum_ok).then(|| RawError {
                kind: ERROR_CHECKSUM,
                message: "checksum mismatch".to_owned(),
            }),
        }
    }
}

/// Текст в запрошенном режиме. Для 1D без GS1-разметки HRI совпадает с Plain.
fn render_text(plain: &str, mode: TextMode, symbology_identifier: &str) -> String {
    match mode {
        TextMode::Plain | TextMode::Hri => plain.to_owned(),
        TextMode::Hex => plain.bytes().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" "),
        TextMode::Escaped => escape_controls(plain),
        TextMode::Eci => format!("{symbology_identifier}{}", plain.replace('\\', "\\\\")),
    }
}

fn escape_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match u32::from(c) {
            v @ 0..=31 => {
                out.push('<');
                out.push_str(ASCII_CONTROL_NAMES[v as usize]);
                out.push('>');
            }
            127 => out.push_str("<DEL>"),
            _ => out.push(c),
        }
    }
    out
}

fn payload_bytes(contents: &[char], encoding: CharacterSet) -> Result<Vec<u8>, EngineFailure> {
    match encoding {
        CharacterSet::Utf8 => Ok(contents.iter().collect::<String>().into_bytes()),
        CharacterSet::Binary => contents
            .iter()
            .map(|&c| {
                u8::try_from(c)
                    .map_err(|_| EngineFailure::new(format!("Character {c:?} does not fit in a byte")))
            })
            .collect(),
    }
}

#[inline]
fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image::ImageFormat;

    fn render(format: BarcodeFormat, text: &str, width: i32, height: i32) -> ModuleGrid {
        let contents: Vec<char> = text.chars().collect();
        BuiltinEngine
            .render(&RenderRequest {
                contents: &contents,
                encoding: CharacterSet::Utf8,
                format,
                width,
                height,
                margin: -1,
                ecc_level: -1,
            })
            .unwrap()
    }

    /// Сетка → яркости: тёмный модуль 0, светлый 255.
    fn to_luma(grid: &ModuleGrid) -> Vec<u8> {
        grid.modules.iter().map(|&dark| if dark { 0 } else { 255 }).collect()
    }

    fn detect(luma: &[u8], width: usize, height: usize, options: &ReaderOptions) -> Vec<RawBarcode> {
        let view = ImageView::new(luma, width, height, ImageFormat::Lum, width).unwrap();
        BuiltinEngine.detect_and_decode(&view, options).unwrap()
    }

    #[test]
    fn single_row_code128_is_found_on_one_line() {
        let grid = render(BarcodeFormat::Code128, "12345", 0, 1);
        assert_eq!((grid.width, grid.height), (89, 1));
        let found = detect(&to_luma(&grid), grid.width, 1, &ReaderOptions::default());
        assert_eq!(found.len(), 1);
        let b = &found[0];
        assert_eq!(b.format, BarcodeFormat::Code128.bit());
        assert_eq!(b.text, "12345");
        assert_eq!(b.symbology_identifier, "]C0");
        assert_eq!(b.line_count, 1);
        assert_eq!(b.sequence_size, -1);
        assert!(b.error.is_none());
    }

    #[test]
    fn position_spans_first_and_last_line() {
        let grid = render(BarcodeFormat::Code128, "12345", 178, 10);
        let found = detect(&to_luma(&grid), grid.width, grid.height, &ReaderOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line_count, 10);
        // модуль 2 px, отступ (178 - 158) / 2 = 10
        assert_eq!(
            found[0].position,
            [Point::new(10, 0), Point::new(167, 0), Point::new(167, 9), Point::new(10, 9)]
        );
    }

    #[test]
    fn columns_are_scanned_only_with_try_rotate() {
        let grid = render(BarcodeFormat::Code128, "ROTATE", 0, 40);
        let luma = to_luma(&grid);
        let view = ImageView::new(&luma, grid.width, grid.height, ImageFormat::Lum, grid.width)
            .unwrap()
            .rotated(90)
            .unwrap();

        let found = BuiltinEngine.detect_and_decode(&view, &ReaderOptions::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "ROTATE");

        let no_rotate = ReaderOptions::builder().try_rotate(false).build();
        assert!(BuiltinEngine.detect_and_decode(&view, &no_rotate).unwrap().is_empty());
    }

    #[test]
    fn inverted_symbol_needs_try_invert() {
        let grid = render(BarcodeFormat::Code128, "INV", 0, 4);
        let luma: Vec<u8> = to_luma(&grid).into_iter().map(|v| 255 - v).collect();
        let found = detect(&luma, grid.width, grid.height, &ReaderOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "INV");
    }

    #[test]
    fn leading_zero_ean13_becomes_upca_when_allowed() {
        let grid = render(BarcodeFormat::UpcA, "03600029145", 0, 5);
        let luma = to_luma(&grid);

        let any = detect(&luma, grid.width, grid.height, &ReaderOptions::default());
        assert_eq!(any[0].format, BarcodeFormat::UpcA.bit());
        assert_eq!(any[0].text, "036000291452");
        assert_eq!(any[0].symbology_identifier, "]E0");

        let ean_only = ReaderOptions::builder().formats(BarcodeFormat::Ean13).build();
        let found = detect(&luma, grid.width, grid.height, &ean_only);
        assert_eq!(found[0].format, BarcodeFormat::Ean13.bit());
        assert_eq!(found[0].text, "0036000291452");
    }

    #[test]
    fn filters_and_add_on_requirement_drop_results() {
        let grid = render(BarcodeFormat::Ean13, "4006381333931", 0, 5);
        let luma = to_luma(&grid);

        let qr_only = ReaderOptions::builder().formats(BarcodeFormat::QrCode).build();
        assert!(detect(&luma, grid.width, grid.height, &qr_only).is_empty());

        let require = ReaderOptions::builder().ean_add_on_symbol(EanAddOnSymbol::Require).build();
        assert!(detect(&luma, grid.width, grid.height, &require).is_empty());
    }

    #[test]
    fn max_number_of_symbols_caps_output() {
        let a = render(BarcodeFormat::Code128, "FIRST", 0, 20);
        let b = render(BarcodeFormat::Code128, "SECOND", 0, 20);
        let width = a.width.max(b.width);
        let mut luma = Vec::with_capacity(width * 40);
        for grid in [&a, &b] {
            for row in to_luma(grid).chunks(grid.width) {
                luma.extend_from_slice(row);
                luma.extend(std::iter::repeat(255).take(width - grid.width));
            }
        }

        let all = detect(&luma, width, 40, &ReaderOptions::default());
        let texts: Vec<&str> = all.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, ["FIRST", "SECOND"]);

        let one = ReaderOptions::builder().max_number_of_symbols(1).build();
        assert_eq!(detect(&luma, width, 40, &one).len(), 1);
    }

    #[test]
    fn bad_checksum_track_carries_error() {
        let track = Track {
            axis: Axis::Rows,
            format: BarcodeFormat::Code128,
            text: "X".into(),
            gs1: true,
            checksum_ok: false,
            first: (Point::new(0, 0), Point::new(9, 0)),
            last: (Point::new(0, 3), Point::new(9, 3)),
            lines: 4,
        };
        let raw = track.into_raw(TextMode::Plain);
        assert_eq!(raw.content_type, CONTENT_GS1);
        assert_eq!(raw.symbology_identifier, "]C1");
        assert_eq!(raw.error.map(|e| e.kind), Some(ERROR_CHECKSUM));
        assert_eq!(raw.position[2], Point::new(9, 3));
    }

    #[test]
    fn text_modes() {
        assert_eq!(render_text("AB", TextMode::Hex, "]C0"), "41 42");
        assert_eq!(render_text("A\u{1d}B\u{7f}", TextMode::Escaped, "]C0"), "A<GS>B<DEL>");
        assert_eq!(render_text("a\\b", TextMode::Eci, "]C0"), "]C0a\\\\b");
        assert_eq!(render_text("a\u{1d}b", TextMode::Hri, "]C1"), "a\u{1d}b");
    }

    #[test]
    fn render_rejects_bad_requests() {
        let contents: Vec<char> = "X".chars().collect();
        let mut req = RenderRequest {
            contents: &contents,
            encoding: CharacterSet::Utf8,
            format: BarcodeFormat::Aztec,
            width: 10,
            height: 10,
            margin: -1,
            ecc_level: -1,
        };
        assert_eq!(BuiltinEngine.render(&req).unwrap_err().message(), "Unsupported format: AZTEC");

        req.format = BarcodeFormat::QrCode;
        req.width = -1;
        assert!(BuiltinEngine
            .render(&req)
            .unwrap_err()
            .message()
            .starts_with("Requested dimensions can't be negative"));
    }

    #[test]
    fn binary_payload_must_fit_bytes() {
        assert_eq!(payload_bytes(&['\u{0}', '\u{ff}'], CharacterSet::Binary).unwrap(), vec![0, 0xff]);
        assert!(payload_bytes(&['\u{100}'], CharacterSet::Binary).is_err());
        assert_eq!(payload_bytes(&['é'], CharacterSet::Utf8).unwrap(), "é".as_bytes());
    }

    #[test]
    fn qr_render_uses_default_quiet_zone() {
        let grid = render(BarcodeFormat::QrCode, "HELLO", 0, 0);
        assert_eq!((grid.width, grid.height), (29, 29));
    }
}
