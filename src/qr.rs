//! QR Code для рендера: символ строит `qrcode`, здесь — уровень коррекции,
//! тихая зона и целочисленный масштаб под запрошенный размер.

use qrcode::{Color, EcLevel, QrCode};

use crate::engine::{too_large, EngineFailure, ModuleGrid};

/// Тихая зона QR по умолчанию, модулей.
pub const DEFAULT_QUIET_ZONE: usize = 4;

/// Уровень коррекции из целого 0..=8 (шкала «процентов / 10»); вне диапазона — L.
pub fn ec_level(ecc: i32) -> EcLevel {
    match ecc {
        3 | 4 => EcLevel::M,
        5 | 6 => EcLevel::Q,
        7 | 8 => EcLevel::H,
        _ => EcLevel::L,
    }
}

/// Матрица символа без тихой зоны.
pub fn encode(data: &[u8], level: EcLevel) -> Result<ModuleGrid, EngineFailure> {
    let code = QrCode::with_error_correction_level(data, level)
        .map_err(|e| EngineFailure::new(format!("QR encoding failed: {e}")))?;
    let width = code.width();
    Ok(ModuleGrid {
        width,
        height: width,
        modules: code.to_colors().into_iter().map(|c| c == Color::Dark).collect(),
    })
}

/// Вписать символ в `width × height` (минимум — символ плюс тихая зона):
/// наибольший целый масштаб, остаток поровну по краям. Слишком большая сетка — ошибка.
pub fn inflate(
    code: &ModuleGrid,
    width: usize,
    height: usize,
    quiet_zone: usize,
) -> Result<ModuleGrid, EngineFailure> {
    let framed = |side: usize| quiet_zone.checked_mul(2).and_then(|q| q.checked_add(side));
    let (Some(min_w), Some(min_h)) = (framed(code.width), framed(code.height)) else {
        return Err(too_large(width, height));
    };
    let out_w = width.max(min_w);
    let out_h = height.max(min_h);
    if code.width == out_w && code.height == out_h {
        return Ok(code.clone());
    }
    let mut out = ModuleGrid::try_new(out_w, out_h)?;
    let scale = ((out_w - 2 * quiet_zone) / code.width.max(1))
        .min((out_h - 2 * quiet_zone) / code.height.max(1));
    let left = (out_w - code.width * scale) / 2;
    let top = (out_h - code.height * scale) / 2;

    for y in 0..code.height {
        for x in 0..code.width {
            if code.get(x, y) {
                out.set_region(left + x * scale, top + y * scale, scale, scale);
            }
        }
    }
    Ok(out)
}
