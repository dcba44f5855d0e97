//! 1D-символики: декодирование одной бинарной линии и запись модулей.
//!
//! Линия — `&[bool]` (`true` = чёрный) в направлении чтения. Обратное направление
//! и инверсию перебирает вызывающий код.

pub mod code128;
pub mod ean13;

use crate::core::types::{BarcodeFormat, BarcodeFormats};
use crate::engine::{too_large, EngineFailure, ModuleGrid};

/// Минимальная тихая зона 1D-символа, в модулях.
pub(crate) const MIN_QUIET_MODULES: f32 = 3.0;

/// Символ, прочитанный на одной линии.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowHit {
    pub format: BarcodeFormat,
    /// Текст в режиме Plain.
    pub text: String,
    /// Первый символ был FNC1 (данные GS1).
    pub gs1: bool,
    /// Первый пиксель символа на линии.
    pub start: usize,
    /// Пиксель сразу за последним баром.
    pub end: usize,
    /// `false` — символ прочитан целиком, но контрольная сумма не сошлась.
    pub checksum_ok: bool,
}

/// Позиции начала run'ов: `pos[k]` — первый пиксель run'а `k`, `pos[len]` — длина линии.
pub(crate) fn run_positions(rl: &[usize]) -> Vec<usize> {
    let mut pos = Vec::with_capacity(rl.len() + 1);
    let mut acc = 0usize;
    pos.push(0);
    for &w in rl {
        acc += w;
        pos.push(acc);
    }
    pos
}

/// Ширина в модулях, округлённая.
#[inline]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn modules_of(width: usize, unit: f32) -> f32 {
    (width as f32 / unit).round()
}

/// Попробовать все включённые 1D-декодеры на линии; первая удача выигрывает.
/// EAN-13 отдаётся как `Ean13` — решение про UPC-A принимает вызывающий.
pub fn decode_line(bits: &[bool], formats: BarcodeFormats, accept_bad_checksum: bool) -> Option<RowHit> {
    if formats.accepts(BarcodeFormat::Code128) {
        if let Some(hit) = code128::decode_row(bits, accept_bad_checksum) {
            return Some(hit);
        }
    }
    if formats.accepts(BarcodeFormat::Ean13) || formats.accepts(BarcodeFormat::UpcA) {
        if let Some(hit) = ean13::decode_row(bits, accept_bad_checksum) {
            return Some(hit);
        }
    }
    None
}

/// Растянуть 1D-символ на `width × height`: тихая зона `sides_margin` модулей делится поровну
/// между краями, модуль — наибольшее целое число пикселей, высота не меньше 1.
pub fn render_linear(
    code: &[bool],
    width: usize,
    height: usize,
    sides_margin: usize,
) -> Result<ModuleGrid, EngineFailure> {
    let input = code.len();
    let full = input.checked_add(sides_margin).ok_or_else(|| too_large(width, height))?.max(1);
    let out_w = width.max(full);
    let out_h = height.max(1);
    let mut grid = ModuleGrid::try_new(out_w, out_h)?;
    let multiple = out_w / full;
    let left = (out_w - input * multiple) / 2;

    for (k, _) in code.iter().enumerate().filter(|(_, &dark)| dark) {
        grid.set_region(left + k * multiple, 0, multiple, out_h);
    }
    Ok(grid)
}

/// Модули → биты (`true` = чёрный), начиная с `first_black`.
pub(crate) fn push_runs(out: &mut Vec<bool>, widths: &[u8], first_black: bool) {
    let mut black = first_black;
    for &w in widths {
        out.extend(std::iter::repeat(black).take(usize::from(w)));
        black = !black;
    }
}
