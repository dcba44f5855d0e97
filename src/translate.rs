//! Сырые результаты движка → объектный граф хоста.
//!
//! Перевод поштучный и строгий: значение вне словаря хоста (бит формата, тип содержимого,
//! вид ошибки) означает рассинхрон версий с движком и роняет весь вызов.
//! GTIN — наоборот, best-effort: любой сбой утилит превращается в `None`.

use tracing::{debug, warn};

use crate::core::types::{
    Barcode, BarcodeFormat, ContentType, ErrorType, Gtin, Point, Position, SymbolError,
};
use crate::engine::{EngineFailure, GtinUtils, RawBarcode, RawError};
use crate::error::{BridgeError, Result};

/// Один результат движка → [`Barcode`]. Позиция — в координатах того же `ImageView`.
#[allow(clippy::cast_possible_truncation)]
pub fn translate<G: GtinUtils + ?Sized>(raw: RawBarcode, gtin_utils: &G) -> Result<Barcode> {
    let format = BarcodeFormat::from_bit(raw.format)
        .ok_or_else(|| BridgeError::Engine(format!("Invalid format: {}", raw.format)))
        .map_err(version_skew)?;
    let content_type = ContentType::try_from(raw.content_type).map_err(version_skew)?;
    let error = raw.error.map(symbol_error).transpose()?;

    let [top_left, top_right, bottom_right, bottom_left] = raw.position;
    let angle = orientation(top_left, top_right, bottom_right, bottom_left);

    // поля последовательности имеют смысл только у многочастного символа
    let (sequence_size, sequence_index, sequence_id) = if raw.sequence_size > 1 {
        (raw.sequence_size, raw.sequence_index, raw.sequence_id)
    } else {
        (0, -1, String::new())
    };

    let gtin = if format.is_gtin() {
        enrich(gtin_utils, &raw.plain_text, format)
    } else {
        None
    };

    Ok(Barcode {
        format,
        content_type,
        text: raw.text,
        position: Position {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            orientation: angle,
        },
        orientation: angle.to_degrees().round() as i32,
        bytes: raw.bytes,
        ec_level: raw.ec_level,
        symbology_identifier: raw.symbology_identifier,
        sequence_size,
        sequence_index,
        sequence_id,
        reader_init: raw.reader_init,
        line_count: raw.line_count,
        version: raw.version,
        gtin,
        error,
    })
}

/// GTIN-метаданные по Plain-тексту. Пустая страна или любой сбой утилит — `None`.
pub fn enrich<G: GtinUtils + ?Sized>(utils: &G, plain_text: &str, format: BarcodeFormat) -> Option<Gtin> {
    match derive(utils, plain_text, format) {
        Ok(gtin) => gtin,
        Err(e) => {
            debug!(%format, error = %e, "GTIN derivation failed, leaving it out");
            None
        }
    }
}

fn derive<G: GtinUtils + ?Sized>(
    utils: &G,
    plain_text: &str,
    format: BarcodeFormat,
) -> Result<Option<Gtin>, EngineFailure> {
    let country = utils.country_identifier(plain_text, format)?;
    if country.is_empty() {
        return Ok(None);
    }
    let add_on = utils.ean_add_on(plain_text, format)?;
    Ok(Some(Gtin {
        country,
        price: utils.price(&add_on)?,
        issue_number: utils.issue_nr(&add_on)?,
        add_on,
    }))
}

/// Угол средней линии символа (от левого края к правому), радианы; вырожденный четырёхугольник — 0.
pub fn orientation(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> f64 {
    let dx = f64::from(top_right.x) + f64::from(bottom_right.x) - f64::from(top_left.x) - f64::from(bottom_left.x);
    let dy = f64::from(top_right.y) + f64::from(bottom_right.y) - f64::from(top_left.y) - f64::from(bottom_left.y);
    if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        dy.atan2(dx)
    }
}

fn symbol_error(raw: RawError) -> Result<SymbolError> {
    let kind = ErrorType::try_from(raw.kind).map_err(version_skew)?;
    Ok(SymbolError { kind, message: raw.message })
}

fn version_skew(e: BridgeError) -> BridgeError {
    warn!(error = %e, "engine returned a value outside the host vocabulary");
    e
}
