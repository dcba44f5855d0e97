// src/options.rs
//
// Опции распознавания: строгие enum'ы со строковым словарём хоста, неизменяемый ReaderOptions
// (строится билдером или из хостовых ReaderHints) и сами ReaderHints.

use std::fmt;
use std::str::FromStr;

use crate::core::types::{BarcodeFormat, BarcodeFormats};
use crate::error::BridgeError;

/// Объявляет enum со строковым словарём: `name()`, `Display`, строгий `FromStr`.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = BridgeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(BridgeError::invalid(format!(concat!("Invalid ", $what, " name: {:?}"), s))),
                }
            }
        }
    };
}

vocabulary! {
    /// Алгоритм бинаризации.
    Binarizer, "binarizer" {
        /// Локальный порог по окрестности (по умолчанию).
        LocalAverage => "LOCAL_AVERAGE",
        /// Глобальный порог по гистограмме строки.
        GlobalHistogram => "GLOBAL_HISTOGRAM",
        /// Фиксированный порог 127.
        FixedThreshold => "FIXED_THRESHOLD",
        /// Любое ненулевое значение — белое.
        BoolCast => "BOOL_CAST",
    }
}

vocabulary! {
    /// Обработка дополнительного символа EAN (2/5 цифр).
    EanAddOnSymbol, "eanAddOnSymbol" {
        Ignore => "IGNORE",
        Read => "READ",
        Require => "REQUIRE",
    }
}

vocabulary! {
    /// Представление `text` в результате.
    TextMode, "textMode" {
        Plain => "PLAIN",
        Eci => "ECI",
        Hri => "HRI",
        Hex => "HEX",
        Escaped => "ESCAPED",
    }
}

/// Неизменяемые опции одного вызова распознавания.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    formats: BarcodeFormats,
    try_harder: bool,
    try_rotate: bool,
    try_invert: bool,
    try_downscale: bool,
    is_pure: bool,
    binarizer: Binarizer,
    downscale_factor: i32,
    downscale_threshold: i32,
    min_line_count: i32,
    max_number_of_symbols: i32,
    try_code39_extended_mode: bool,
    validate_code39_checksum: bool,
    validate_itf_checksum: bool,
    return_codabar_start_end: bool,
    return_errors: bool,
    ean_add_on_symbol: EanAddOnSymbol,
    text_mode: TextMode,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            formats: BarcodeFormats::NONE,
            try_harder: true,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            is_pure: false,
            binarizer: Binarizer::LocalAverage,
            downscale_factor: 3,
            downscale_threshold: 500,
            min_line_count: 2,
            max_number_of_symbols: 255,
            try_code39_extended_mode: false,
            validate_code39_checksum: false,
            validate_itf_checksum: false,
            return_codabar_start_end: false,
            return_errors: false,
            ean_add_on_symbol: EanAddOnSymbol::Ignore,
            text_mode: TextMode::Hri,
        }
    }
}

impl ReaderOptions {
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::default()
    }

    /// Пустое множество — все форматы.
    pub fn formats(&self) -> BarcodeFormats {
        self.formats
    }

    pub fn try_harder(&self) -> bool {
        self.try_harder
    }

    pub fn try_rotate(&self) -> bool {
        self.try_rotate
    }

    pub fn try_invert(&self) -> bool {
        self.try_invert
    }

    pub fn try_downscale(&self) -> bool {
        self.try_downscale
    }

    pub fn is_pure(&self) -> bool {
        self.is_pure
    }

    pub fn binarizer(&self) -> Binarizer {
        self.binarizer
    }

    pub fn downscale_factor(&self) -> i32 {
        self.downscale_factor
    }

    pub fn downscale_threshold(&self) -> i32 {
        self.downscale_threshold
    }

    pub fn min_line_count(&self) -> i32 {
        self.min_line_count
    }

    pub fn max_number_of_symbols(&self) -> i32 {
        self.max_number_of_symbols
    }

    pub fn try_code39_extended_mode(&self) -> bool {
        self.try_code39_extended_mode
    }

    pub fn validate_code39_checksum(&self) -> bool {
        self.validate_code39_checksum
    }

    pub fn validate_itf_checksum(&self) -> bool {
        self.validate_itf_checksum
    }

    pub fn return_codabar_start_end(&self) -> bool {
        self.return_codabar_start_end
    }

    pub fn return_errors(&self) -> bool {
        self.return_errors
    }

    pub fn ean_add_on_symbol(&self) -> EanAddOnSymbol {
        self.ean_add_on_symbol
    }

    pub fn text_mode(&self) -> TextMode {
        self.text_mode
    }

    /// Копия с другим лимитом символов (для «первого найденного»).
    pub(crate) fn with_max_number_of_symbols(&self, max: i32) -> Self {
        Self { max_number_of_symbols: max, ..self.clone() }
    }
}

/// Билдер: незаданные поля берутся из `ReaderOptions::default()`.
#[derive(Default)]
pub struct ReaderOptionsBuilder {
    formats: Option<BarcodeFormats>,
    try_harder: Option<bool>,
    try_rotate: Option<bool>,
    try_invert: Option<bool>,
    try_downscale: Option<bool>,
    is_pure: Option<bool>,
    binarizer: Option<Binarizer>,
    downscale_factor: Option<i32>,
    downscale_threshold: Option<i32>,
    min_line_count: Option<i32>,
    max_number_of_symbols: Option<i32>,
    try_code39_extended_mode: Option<bool>,
    validate_code39_checksum: Option<bool>,
    validate_itf_checksum: Option<bool>,
    return_codabar_start_end: Option<bool>,
    return_errors: Option<bool>,
    ean_add_on_symbol: Option<EanAddOnSymbol>,
    text_mode: Option<TextMode>,
}

impl ReaderOptionsBuilder {
    pub fn formats(mut self, formats: impl Into<BarcodeFormats>) -> Self {
        self.formats = Some(formats.into());
        self
    }

    pub fn try_harder(mut self, v: bool) -> Self {
        self.try_harder = Some(v);
        self
    }

    pub fn try_rotate(mut self, v: bool) -> Self {
        self.try_rotate = Some(v);
        self
    }

    pub fn try_invert(mut self, v: bool) -> Self {
        self.try_invert = Some(v);
        self
    }

    pub fn try_downscale(mut self, v: bool) -> Self {
        self.try_downscale = Some(v);
        self
    }

    pub fn is_pure(mut self, v: bool) -> Self {
        self.is_pure = Some(v);
        self
    }

    pub fn binarizer(mut self, binarizer: Binarizer) -> Self {
        self.binarizer = Some(binarizer);
        self
    }

    pub fn downscale_factor(mut self, v: i32) -> Self {
        self.downscale_factor = Some(v);
        self
    }

    pub fn downscale_threshold(mut self, v: i32) -> Self {
        self.downscale_threshold = Some(v);
        self
    }

    pub fn min_line_count(mut self, v: i32) -> Self {
        self.min_line_count = Some(v);
        self
    }

    pub fn max_number_of_symbols(mut self, v: i32) -> Self {
        self.max_number_of_symbols = Some(v);
        self
    }

    pub fn try_code39_extended_mode(mut self, v: bool) -> Self {
        self.try_code39_extended_mode = Some(v);
        self
    }

    pub fn validate_code39_checksum(mut self, v: bool) -> Self {
        self.validate_code39_checksum = Some(v);
        self
    }

    pub fn validate_itf_checksum(mut self, v: bool) -> Self {
        self.validate_itf_checksum = Some(v);
        self
    }

    pub fn return_codabar_start_end(mut self, v: bool) -> Self {
        self.return_codabar_start_end = Some(v);
        self
    }

    pub fn return_errors(mut self, v: bool) -> Self {
        self.return_errors = Some(v);
        self
    }

    pub fn ean_add_on_symbol(mut self, mode: EanAddOnSymbol) -> Self {
        self.ean_add_on_symbol = Some(mode);
        self
    }

    pub fn text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = Some(mode);
        self
    }

    pub fn build(self) -> ReaderOptions {
        let d = ReaderOptions::default();
        ReaderOptions {
            formats: self.formats.unwrap_or(d.formats),
            try_harder: self.try_harder.unwrap_or(d.try_harder),
            try_rotate: self.try_rotate.unwrap_or(d.try_rotate),
            try_invert: self.try_invert.unwrap_or(d.try_invert),
            try_downscale: self.try_downscale.unwrap_or(d.try_downscale),
            is_pure: self.is_pure.unwrap_or(d.is_pure),
            binarizer: self.binarizer.unwrap_or(d.binarizer),
            downscale_factor: self.downscale_factor.unwrap_or(d.downscale_factor),
            downscale_threshold: self.downscale_threshold.unwrap_or(d.downscale_threshold),
            min_line_count: self.min_line_count.unwrap_or(d.min_line_count),
            max_number_of_symbols: self.max_number_of_symbols.unwrap_or(d.max_number_of_symbols),
            try_code39_extended_mode: self
                .try_code39_extended_mode
                .unwrap_or(d.try_code39_extended_mode),
            validate_code39_checksum: self
                .validate_code39_checksum
                .unwrap_or(d.validate_code39_checksum),
            validate_itf_checksum: self.validate_itf_checksum.unwrap_or(d.validate_itf_checksum),
            return_codabar_start_end: self
                .return_codabar_start_end
                .unwrap_or(d.return_codabar_start_end),
            return_errors: self.return_errors.unwrap_or(d.return_errors),
            ean_add_on_symbol: self.ean_add_on_symbol.unwrap_or(d.ean_add_on_symbol),
            text_mode: self.text_mode.unwrap_or(d.text_mode),
        }
    }
}

/// Конфигурация в терминах хоста: enum'ы — строки словаря, форматы — список имён.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderHints {
    pub formats: Vec<String>,
    pub try_harder: bool,
    pub try_rotate: bool,
    pub try_invert: bool,
    pub try_downscale: bool,
    pub is_pure: bool,
    pub binarizer: String,
    pub downscale_factor: i32,
    pub downscale_threshold: i32,
    pub min_line_count: i32,
    pub max_number_of_symbols: i32,
    pub try_code39_extended_mode: bool,
    pub validate_code39_checksum: bool,
    pub validate_itf_checksum: bool,
    pub return_codabar_start_end: bool,
    pub return_errors: bool,
    pub ean_add_on_symbol: String,
    pub text_mode: String,
}

impl Default for ReaderHints {
    fn default() -> Self {
        let d = ReaderOptions::default();
        Self {
            formats: Vec::new(),
            try_harder: d.try_harder,
            try_rotate: d.try_rotate,
            try_invert: d.try_invert,
            try_downscale: d.try_downscale,
            is_pure: d.is_pure,
            binarizer: d.binarizer.name().to_owned(),
            downscale_factor: d.downscale_factor,
            downscale_threshold: d.downscale_threshold,
            min_line_count: d.min_line_count,
            max_number_of_symbols: d.max_number_of_symbols,
            try_code39_extended_mode: d.try_code39_extended_mode,
            validate_code39_checksum: d.validate_code39_checksum,
            validate_itf_checksum: d.validate_itf_checksum,
            return_codabar_start_end: d.return_codabar_start_end,
            return_errors: d.return_errors,
            ean_add_on_symbol: d.ean_add_on_symbol.name().to_owned(),
            text_mode: d.text_mode.name().to_owned(),
        }
    }
}

impl TryFrom<&ReaderHints> for ReaderOptions {
    type Error = BridgeError;

    /// Поля переносятся один к одному; числа и флаги не проверяются, строки-enum'ы — строго.
    fn try_from(h: &ReaderHints) -> Result<Self, Self::Error> {
        let formats = h
            .formats
            .iter()
            .map(|name| name.parse::<BarcodeFormat>())
            .collect::<Result<BarcodeFormats, _>>()?;
        Ok(Self {
            formats,
            try_harder: h.try_harder,
            try_rotate: h.try_rotate,
            try_invert: h.try_invert,
            try_downscale: h.try_downscale,
            is_pure: h.is_pure,
            binarizer: h.binarizer.parse()?,
            downscale_factor: h.downscale_factor,
            downscale_threshold: h.downscale_threshold,
            min_line_count: h.min_line_count,
            max_number_of_symbols: h.max_number_of_symbols,
            try_code39_extended_mode: h.try_code39_extended_mode,
            validate_code39_checksum: h.validate_code39_checksum,
            validate_itf_checksum: h.validate_itf_checksum,
            return_codabar_start_end: h.return_codabar_start_end,
            return_errors: h.return_errors,
            ean_add_on_symbol: h.ean_add_on_symbol.parse()?,
            text_mode: h.text_mode.parse()?,
        })
    }
}

impl TryFrom<ReaderHints> for ReaderOptions {
    type Error = BridgeError;

    fn try_from(h: ReaderHints) -> Result<Self, Self::Error> {
        Self::try_from(&h)
    }
}
