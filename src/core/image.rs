// src/core/image.rs
//
// ImageView — невладеющий взгляд на буфер пикселей. Обрезка и поворот меняют только
// метаданные (начало, размеры, шаги), пиксели не копируются.

use crate::error::{BridgeError, Result};

/// Раскладка пикселя в буфере.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ImageFormat {
    /// 8 бит яркости.
    Lum,
    Rgb,
    Bgr,
    /// RGBA с игнорируемым альфа-каналом.
    Rgbx,
    Xrgb,
    Bgrx,
    Xbgr,
}

impl ImageFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Lum => 1,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgbx | Self::Xrgb | Self::Bgrx | Self::Xbgr => 4,
        }
    }

    /// Смещения каналов (r, g, b) внутри пикселя.
    const fn rgb_index(self) -> Option<(usize, usize, usize)> {
        match self {
            Self::Lum => None,
            Self::Rgb | Self::Rgbx => Some((0, 1, 2)),
            Self::Bgr | Self::Bgrx => Some((2, 1, 0)),
            Self::Xrgb => Some((1, 2, 3)),
            Self::Xbgr => Some((3, 2, 1)),
        }
    }
}

/// Прямоугольник обрезки в координатах хоста (могут прийти отрицательные значения — их отвергаем).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CropRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRect {
    #[inline]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    /// (left, top, width, height) как usize; ширина и высота строго положительные.
    fn checked(self) -> Result<(usize, usize, usize, usize)> {
        let bad = || BridgeError::invalid(format!("invalid crop rectangle {self:?}"));
        let left = usize::try_from(self.left).map_err(|_| bad())?;
        let top = usize::try_from(self.top).map_err(|_| bad())?;
        let width = usize::try_from(self.width).map_err(|_| bad())?;
        let height = usize::try_from(self.height).map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok((left, top, width, height))
    }
}

/// Допустимые углы поворота (по часовой стрелке).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Rotation {
    #[default]
    Rot0,
    Rot90,
    Rot180,
    Rot270,
}

impl Rotation {
    pub const ALL: [Self; 4] = [Self::Rot0, Self::Rot90, Self::Rot180, Self::Rot270];

    #[inline]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Rot0 => 0,
            Self::Rot90 => 90,
            Self::Rot180 => 180,
            Self::Rot270 => 270,
        }
    }

    /// Поворот, отменяющий данный.
    #[inline]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Rot0 => Self::Rot0,
            Self::Rot90 => Self::Rot270,
            Self::Rot180 => Self::Rot180,
            Self::Rot270 => Self::Rot90,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = BridgeError;

    fn try_from(degrees: i32) -> Result<Self> {
        match degrees {
            0 => Ok(Self::Rot0),
            90 => Ok(Self::Rot90),
            180 => Ok(Self::Rot180),
            270 => Ok(Self::Rot270),
            other => Err(BridgeError::invalid(format!(
                "rotation must be one of 0, 90, 180, 270 (got {other})"
            ))),
        }
    }
}

/// Невладеющее представление пикселей.
///
/// Пиксель `(x, y)` лежит по смещению `origin + y * row_stride + x * pix_stride`. Шаги могут быть
/// отрицательными после поворота. При построении проверяется, что все адресуемые пиксели лежат
/// внутри `data`; `cropped`/`rotated` это свойство сохраняют.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [u8],
    origin: usize,
    width: usize,
    height: usize,
    format: ImageFormat,
    row_stride: isize,
    pix_stride: isize,
}

impl<'a> ImageView<'a> {
    /// Вид на весь буфер `width × height` с шагом строки `row_stride` байт.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
    ) -> Result<Self> {
        Self::with_origin(data, 0, width, height, format, row_stride)
    }

    /// Вид сразу на прямоугольник `crop` плоскости, высота которой заранее неизвестна
    /// (Y-плоскость кадра камеры). Начало сдвигается на `top * row_stride + left * bpp`.
    pub fn from_plane(
        data: &'a [u8],
        row_stride: usize,
        format: ImageFormat,
        crop: CropRect,
    ) -> Result<Self> {
        let (left, top, width, height) = crop.checked()?;
        let bpp = format.bytes_per_pixel();
        if (left + width) * bpp > row_stride {
            return Err(BridgeError::invalid(format!(
                "crop {crop:?} exceeds the row stride of {row_stride} bytes"
            )));
        }
        let origin = top
            .checked_mul(row_stride)
            .and_then(|o| o.checked_add(left * bpp))
            .ok_or_else(|| BridgeError::invalid(format!("crop {crop:?} overflows")))?;
        Self::with_origin(data, origin, width, height, format, row_stride)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn with_origin(
        data: &'a [u8],
        origin: usize,
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::invalid(format!(
                "image dimensions must be positive ({width}x{height})"
            )));
        }
        let bpp = format.bytes_per_pixel();
        let row_bytes = width * bpp;
        if row_stride < row_bytes {
            return Err(BridgeError::invalid(format!(
                "row stride {row_stride} is smaller than the row width of {row_bytes} bytes"
            )));
        }
        let end = (height - 1)
            .checked_mul(row_stride)
            .and_then(|v| v.checked_add(row_bytes))
            .and_then(|v| v.checked_add(origin));
        match end {
            Some(end) if end <= data.len() => {}
            _ => {
                return Err(BridgeError::invalid(format!(
                    "buffer of {} bytes is too small for a {width}x{height} view with stride {row_stride}",
                    data.len()
                )))
            }
        }
        let row_stride = isize::try_from(row_stride)
            .map_err(|_| BridgeError::invalid("row stride does not fit the address space"))?;
        Ok(Self {
            data,
            origin,
            width,
            height,
            format,
            row_stride,
            pix_stride: bpp as isize,
        })
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
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[inline]
    pub fn row_stride(&self) -> isize {
        self.row_stride
    }

    #[inline]
    pub fn pix_stride(&self) -> isize {
        self.pix_stride
    }

    /// Смещение первого байта пикселя `(x, y)` в исходном буфере.
    #[inline]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn offset_of(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        let off = self.origin as isize + y as isize * self.row_stride + x as isize * self.pix_stride;
        off as usize
    }

    /// Байты пикселя `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &'a [u8] {
        let o = self.offset_of(x, y);
        &self.data[o..o + self.format.bytes_per_pixel()]
    }

    /// Яркость пикселя (для цветных форматов — взвешенная сумма каналов).
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let p = self.pixel(x, y);
        match self.format.rgb_index() {
            None => p[0],
            Some((r, g, b)) => {
                let v = 306 * u32::from(p[r]) + 601 * u32::from(p[g]) + 117 * u32::from(p[b]) + 0x200;
                (v >> 10) as u8
            }
        }
    }

    /// Строка `y` как яркости, в буфер `buf`.
    pub fn row_luma<'b>(&self, y: usize, buf: &'b mut Vec<u8>) -> &'b [u8] {
        buf.clear();
        buf.reserve(self.width);
        for x in 0..self.width {
            buf.push(self.luma(x, y));
        }
        &buf[..]
    }

    /// Столбец `x` как яркости, в буфер `buf`.
    pub fn col_luma<'b>(&self, x: usize, buf: &'b mut Vec<u8>) -> &'b [u8] {
        buf.clear();
        buf.reserve(self.height);
        for y in 0..self.height {
            buf.push(self.luma(x, y));
        }
        &buf[..]
    }

    /// Подпрямоугольник в координатах текущего вида. Выход за границы — ошибка, без клампа.
    pub fn cropped(&self, left: i32, top: i32, width: i32, height: i32) -> Result<Self> {
        let crop = CropRect::new(left, top, width, height);
        let (l, t, w, h) = crop.checked()?;
        if l + w > self.width || t + h > self.height {
            return Err(BridgeError::invalid(format!(
                "crop {crop:?} lies outside the {}x{} image",
                self.width, self.height
            )));
        }
        Ok(Self {
            origin: self.offset_of(l, t),
            width: w,
            height: h,
            ..*self
        })
    }

    /// Поворот на `degrees` ∈ {0, 90, 180, 270}; остальные значения отвергаются.
    pub fn rotated(&self, degrees: i32) -> Result<Self> {
        Ok(self.rotated_by(Rotation::try_from(degrees)?))
    }

    /// Поворот по часовой стрелке: для 90/270 меняются местами ширина и высота,
    /// направление обхода задаётся знаками шагов.
    pub fn rotated_by(&self, rotation: Rotation) -> Self {
        let (w, h) = (self.width, self.height);
        match rotation {
            Rotation::Rot0 => *self,
            Rotation::Rot90 => Self {
                origin: self.offset_of(0, h - 1),
                width: h,
                height: w,
                row_stride: self.pix_stride,
                pix_stride: -self.row_stride,
                ..*self
            },
            Rotation::Rot180 => Self {
                origin: self.offset_of(w - 1, h - 1),
                row_stride: -self.row_stride,
                pix_stride: -self.pix_stride,
                ..*self
            },
            Rotation::Rot270 => Self {
                origin: self.offset_of(w - 1, 0),
                width: h,
                height: w,
                row_stride: -self.pix_stride,
                pix_stride: self.row_stride,
                ..*self
            },
        }
    }
}
