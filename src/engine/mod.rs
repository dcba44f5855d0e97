// src/engine/mod.rs
//
// Интерфейсы внешнего движка: детекция/декодирование, GTIN-утилиты, рендер.
// Типы здесь — «сырые», в соглашениях движка (биты форматов, целые коды enum'ов);
// перевод в объектный граф хоста делает `translate`.

pub mod builtin;
pub mod gtin;

use thiserror::Error;

use crate::core::image::ImageView;
use crate::core::types::{BarcodeFormat, Point};
use crate::error::BridgeError;
use crate::options::ReaderOptions;

pub use builtin::BuiltinEngine;

/// Сбой внутри движка. Наружу уходит только сообщение.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineFailure {
    message: String,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<EngineFailure> for BridgeError {
    fn from(e: EngineFailure) -> Self {
        BridgeError::Engine(e.message)
    }
}

/// Ошибка декодирования в кодах движка: 1 — формат, 2 — контрольная сумма, 3 — не поддерживается.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawError {
    pub kind: i32,
    pub message: String,
}

/// Результат движка «как есть».
#[derive(Clone, Debug, PartialEq)]
pub struct RawBarcode {
    /// Один бит формата.
    pub format: u32,
    /// 0..=5: Text, Binary, Mixed, GS1, ISO15434, UnknownECI.
    pub content_type: i32,
    /// Текст в запрошенном `TextMode`.
    pub text: String,
    /// Текст в режиме Plain (для GTIN: цифры и, через пробел, add-on).
    pub plain_text: String,
    pub bytes: Vec<u8>,
    /// Углы: TL, TR, BR, BL.
    pub position: [Point; 4],
    pub ec_level: String,
    pub symbology_identifier: String,
    /// -1, если символ не часть последовательности.
    pub sequence_size: i32,
    pub sequence_index: i32,
    pub sequence_id: String,
    pub reader_init: bool,
    pub line_count: i32,
    pub version: String,
    pub error: Option<RawError>,
}

/// Пакетная детекция: один вызов на изображение, порядок результатов — порядок движка.
pub trait DetectEngine {
    fn detect_and_decode(
        &self,
        image: &ImageView<'_>,
        options: &ReaderOptions,
    ) -> Result<Vec<RawBarcode>, EngineFailure>;
}

/// Утилиты GTIN. Любая из них может упасть на «кривых» данных.
pub trait GtinUtils {
    /// Код страны по префиксу GS1; пустая строка — страна не определена.
    fn country_identifier(&self, text: &str, format: BarcodeFormat) -> Result<String, EngineFailure>;

    /// Add-on (2 или 5 цифр) из Plain-текста; пустая строка, если его нет.
    fn ean_add_on(&self, text: &str, format: BarcodeFormat) -> Result<String, EngineFailure>;

    /// Рекомендованная цена из 5-значного add-on.
    fn price(&self, add_on: &str) -> Result<String, EngineFailure>;

    /// Номер выпуска из 2-значного add-on.
    fn issue_nr(&self, add_on: &str) -> Result<String, EngineFailure>;
}

/// Кодировка входа рендера.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CharacterSet {
    /// Символы — кодовые точки Unicode.
    Utf8,
    /// Символы — байты 0..=255, по одному на символ.
    Binary,
}

/// Параметры одного рендера.
#[derive(Clone, Debug)]
pub struct RenderRequest<'a> {
    pub contents: &'a [char],
    pub encoding: CharacterSet,
    pub format: BarcodeFormat,
    pub width: i32,
    pub height: i32,
    /// < 0 — отступ символики по умолчанию.
    pub margin: i32,
    /// < 0 — уровень по умолчанию.
    pub ecc_level: i32,
}

/// Модульная сетка рендера, построчно; `true` — тёмный модуль.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleGrid {
    pub width: usize,
    pub height: usize,
    pub modules: Vec<bool>,
}

/// Предел площади сетки рендера, модулей (64 Mi).
pub const MAX_GRID_MODULES: usize = 1 << 26;

impl ModuleGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, modules: vec![false; width * height] }
    }

    /// Пустая сетка, если площадь считается без переполнения и не больше `MAX_GRID_MODULES`.
    pub fn try_new(width: usize, height: usize) -> Result<Self, EngineFailure> {
        match width.checked_mul(height) {
            Some(area) if area <= MAX_GRID_MODULES => Ok(Self::new(width, height)),
            _ => Err(too_large(width, height)),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    /// Закрасить прямоугольник (обрезается по границам сетки).
    pub fn set_region(&mut self, left: usize, top: usize, width: usize, height: usize) {
        for y in top..(top + height).min(self.height) {
            let row = y * self.width;
            for x in left..(left + width).min(self.width) {
                self.modules[row + x] = true;
            }
        }
    }
}

pub(crate) fn too_large(width: usize, height: usize) -> EngineFailure {
    EngineFailure::new(format!("Requested dimensions are too large: {width}x{height}"))
}

pub trait RenderEngine {
    fn render(&self, request: &RenderRequest<'_>) -> Result<ModuleGrid, EngineFailure>;
}
