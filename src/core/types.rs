// src/core/types.rs
//
// Объектный граф, который получает хост: форматы, позиция, метаданные результата, BitMatrix.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::error::BridgeError;

/// Символика штрих-кода. Имена — словарь хоста (`QR_CODE`, `CODE_128`, …),
/// биты — значения движка.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataBar,
    DataBarExpanded,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    UpcA,
    UpcE,
    MicroQrCode,
    RmqrCode,
    DxFilmEdge,
}

impl BarcodeFormat {
    /// Порядок совпадает с номерами битов движка.
    pub const ALL: [Self; 19] = [
        Self::Aztec,
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::DataBar,
        Self::DataBarExpanded,
        Self::DataMatrix,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::MaxiCode,
        Self::Pdf417,
        Self::QrCode,
        Self::UpcA,
        Self::UpcE,
        Self::MicroQrCode,
        Self::RmqrCode,
        Self::DxFilmEdge,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Формат по единственному выставленному биту; иначе `None`.
    pub fn from_bit(bit: u32) -> Option<Self> {
        if bit.count_ones() != 1 {
            return None;
        }
        Self::ALL.get(bit.trailing_zeros() as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Aztec => "AZTEC",
            Self::Codabar => "CODABAR",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::DataBar => "DATA_BAR",
            Self::DataBarExpanded => "DATA_BAR_EXPANDED",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::Itf => "ITF",
            Self::MaxiCode => "MAXICODE",
            Self::Pdf417 => "PDF_417",
            Self::QrCode => "QR_CODE",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::MicroQrCode => "MICRO_QR_CODE",
            Self::RmqrCode => "RMQR_CODE",
            Self::DxFilmEdge => "DX_FILM_EDGE",
        }
    }

    /// Символики семейства EAN/UPC, из которых выводится GTIN.
    #[inline]
    pub const fn is_gtin(self) -> bool {
        matches!(self, Self::Ean8 | Self::Ean13 | Self::UpcA | Self::UpcE)
    }

    #[inline]
    pub fn is_linear(self) -> bool {
        BarcodeFormats::LINEAR.contains(self)
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Сравнение имён без учёта регистра, `_`, `-` и пробелов: `QRCode` == `qr-code` == `QR_CODE`.
fn normalized(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl FromStr for BarcodeFormat {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalized(s);
        Self::ALL
            .iter()
            .copied()
            .find(|f| normalized(f.name()) == key)
            .ok_or_else(|| BridgeError::invalid(format!("Invalid barcode format name: {s:?}")))
    }
}

/// Множество форматов (битсет). Пустое множество в фильтре означает «все форматы».
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct BarcodeFormats(u32);

impl BarcodeFormats {
    pub const NONE: Self = Self(0);
    pub const LINEAR: Self = Self(
        BarcodeFormat::Codabar.bit()
            | BarcodeFormat::Code39.bit()
            | BarcodeFormat::Code93.bit()
            | BarcodeFormat::Code128.bit()
            | BarcodeFormat::Ean8.bit()
            | BarcodeFormat::Ean13.bit()
            | BarcodeFormat::Itf.bit()
            | BarcodeFormat::DataBar.bit()
            | BarcodeFormat::DataBarExpanded.bit()
            | BarcodeFormat::DxFilmEdge.bit()
            | BarcodeFormat::UpcA.bit()
            | BarcodeFormat::UpcE.bit(),
    );
    pub const MATRIX: Self = Self(
        BarcodeFormat::Aztec.bit()
            | BarcodeFormat::DataMatrix.bit()
            | BarcodeFormat::MaxiCode.bit()
            | BarcodeFormat::Pdf417.bit()
            | BarcodeFormat::QrCode.bit()
            | BarcodeFormat::MicroQrCode.bit()
            | BarcodeFormat::RmqrCode.bit(),
    );
    pub const ANY: Self = Self(Self::LINEAR.0 | Self::MATRIX.0);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, format: BarcodeFormat) -> bool {
        self.0 & format.bit() != 0
    }

    /// Фильтр: пустое множество пропускает всё.
    #[inline]
    pub const fn accepts(self, format: BarcodeFormat) -> bool {
        self.is_empty() || self.contains(format)
    }

    #[inline]
    pub fn insert(&mut self, format: BarcodeFormat) {
        self.0 |= format.bit();
    }

    pub fn iter(self) -> impl Iterator<Item = BarcodeFormat> {
        BarcodeFormat::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<BarcodeFormat> for BarcodeFormats {
    fn from(f: BarcodeFormat) -> Self {
        Self(f.bit())
    }
}

impl BitOr for BarcodeFormats {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<BarcodeFormat> for BarcodeFormats {
    type Output = Self;
    fn bitor(self, rhs: BarcodeFormat) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOrAssign<BarcodeFormat> for BarcodeFormats {
    fn bitor_assign(&mut self, rhs: BarcodeFormat) {
        self.insert(rhs);
    }
}

impl FromIterator<BarcodeFormat> for BarcodeFormats {
    fn from_iter<I: IntoIterator<Item = BarcodeFormat>>(iter: I) -> Self {
        let mut out = Self::NONE;
        for f in iter {
            out.insert(f);
        }
        out
    }
}

impl FromStr for BarcodeFormats {
    type Err = BridgeError;

    /// Список через `,`, `|` или пробелы; допускаются группы `LinearCodes`, `MatrixCodes`, `Any`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = Self::NONE;
        for token in s.split([',', '|', ' ', '\t']).filter(|t| !t.is_empty()) {
            out = out
                | match normalized(token).as_str() {
                    "LINEARCODES" => Self::LINEAR,
                    "MATRIXCODES" => Self::MATRIX,
                    "ANY" => Self::ANY,
                    _ => token.parse::<BarcodeFormat>()?.into(),
                };
        }
        Ok(out)
    }
}

/// Тип содержимого символа.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ContentType {
    Text,
    Binary,
    Mixed,
    Gs1,
    Iso15434,
    UnknownEci,
}

impl ContentType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Mixed => "MIXED",
            Self::Gs1 => "GS1",
            Self::Iso15434 => "ISO15434",
            Self::UnknownEci => "UNKNOWN_ECI",
        }
    }
}

impl TryFrom<i32> for ContentType {
    type Error = BridgeError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::Text,
            1 => Self::Binary,
            2 => Self::Mixed,
            3 => Self::Gs1,
            4 => Self::Iso15434,
            5 => Self::UnknownEci,
            _ => return Err(BridgeError::Engine(format!("Invalid contentType: {v}"))),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Вид ошибки декодирования, приложенной к результату.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorType {
    Format,
    Checksum,
    Unsupported,
}

impl ErrorType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Format => "FORMAT",
            Self::Checksum => "CHECKSUM",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

impl TryFrom<i32> for ErrorType {
    type Error = BridgeError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        Ok(match v {
            1 => Self::Format,
            2 => Self::Checksum,
            3 => Self::Unsupported,
            _ => return Err(BridgeError::Engine(format!("Invalid errorType: {v}"))),
        })
    }
}

/// Ошибка, приложенная к частично распознанному символу (только при `returnErrors`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolError {
    pub kind: ErrorType,
    pub message: String,
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Четырёхугольник символа в координатах входного ImageView + угол ориентации.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub orientation: f64,
}

impl fmt::Display for Position {
    /// Обход по часовой стрелке: `10x20 30x20 30x40 10x40`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pts = [self.top_left, self.top_right, self.bottom_right, self.bottom_left];
        for (i, p) in pts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}x{}", p.x, p.y)?;
        }
        Ok(())
    }
}

/// Метаданные товарного кода.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Gtin {
    pub country: String,
    pub add_on: String,
    pub price: String,
    pub issue_number: String,
}

/// Один распознанный символ.
///
/// Поля последовательности (Structured Append) значимы только при `sequence_size > 1`;
/// иначе `sequence_size == 0`, `sequence_index == -1`, `sequence_id` пуст.
#[derive(Clone, Debug, PartialEq)]
pub struct Barcode {
    pub format: BarcodeFormat,
    pub content_type: ContentType,
    pub text: String,
    pub position: Position,
    pub orientation: i32,
    pub bytes: Vec<u8>,
    pub ec_level: String,
    pub symbology_identifier: String,
    pub sequence_size: i32,
    pub sequence_index: i32,
    pub sequence_id: String,
    pub reader_init: bool,
    pub line_count: i32,
    pub version: String,
    pub gtin: Option<Gtin>,
    pub error: Option<SymbolError>,
}

impl Barcode {
    #[inline]
    pub fn is_part_of_sequence(&self) -> bool {
        self.sequence_size > 1
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Отрисованный символ: один байт на модуль, построчно. Тёмный модуль — [`BitMatrix::DARK`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    pub const DARK: u8 = 0xff;
    pub const LIGHT: u8 = 0x00;

    /// `data.len()` обязан быть `width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, BridgeError> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(BridgeError::Engine(format!(
                "module grid of {} bytes does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// `true` — тёмный модуль.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != Self::LIGHT
    }

    /// Текстовая картинка: по две строки модулей на символ (`▀▄█`), 1D — полными блоками.
    pub fn to_text(&self, inverted: bool) -> String {
        let mut out = String::new();
        if self.height == 1 {
            let map = if inverted { ['█', ' '] } else { [' ', '█'] };
            for x in 0..self.width {
                out.push(map[usize::from(self.get(x, 0))]);
            }
            out.push('\n');
            return out;
        }
        let map = if inverted { ['█', '▄', '▀', ' '] } else { [' ', '▀', '▄', '█'] };
        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top = usize::from(self.get(x, y));
                let bottom = usize::from(y + 1 < self.height && self.get(x, y + 1));
                out.push(map[top | (bottom << 1)]);
            }
            out.push('\n');
        }
        out
    }

    /// SVG одним путём; 1D-символ вытягивается на `width / 2` по высоте.
    pub fn to_svg(&self) -> String {
        let module_height = if self.height == 1 { self.width / 2 } else { 1 };
        let mut path = String::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    path.push_str(&format!(" M{x},{y}h1v{module_height}h-1z"));
                }
            }
        }
        let h = self.height * module_height;
        format!(
            "<svg width=\"{w}\" height=\"{h}\"\nviewBox=\"0 0 {w} {h}\"\nxmlns=\"http://www.w3.org/2000/svg\">\n<path d=\"{path}\"/>\n</svg>\n",
            w = self.width
        )
    }
}
