//! Поверхности с блокировкой пикселей (платформенные битмапы).
//!
//! Пиксели поверхности читаются только под [`LockedPixels`]: захват в `acquire`, освобождение в `Drop`,
//! то есть ровно один `unlock_pixels` на каждый успешный `lock_pixels` при любом выходе из вызова.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::core::image::{CropRect, ImageFormat, ImageView, Rotation};
use crate::error::{BridgeError, Result};

/// Формат пикселей платформенного битмапа.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SurfaceFormat {
    Rgba8888,
    Rgb565,
    Rgba4444,
    Alpha8,
    RgbaF16,
}

impl SurfaceFormat {
    /// Раскладка для ImageView. Поддерживаются только `Alpha8` и `Rgba8888`.
    pub fn image_format(self) -> Result<ImageFormat> {
        match self {
            Self::Alpha8 => Ok(ImageFormat::Lum),
            Self::Rgba8888 => Ok(ImageFormat::Rgbx),
            other => Err(BridgeError::invalid(format!("Unsupported format: {other:?}"))),
        }
    }
}

/// Геометрия поверхности.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SurfaceInfo {
    pub width: usize,
    pub height: usize,
    /// Байт на строку.
    pub stride: usize,
    pub format: SurfaceFormat,
}

/// Контракт платформенного провайдера поверхностей.
pub trait PixelSurface {
    fn info(&self) -> SurfaceInfo;

    /// Заблокировать пиксели на чтение. `None` — блокировка не удалась
    /// (поверхность уже заблокирована, освобождена и т.п.).
    fn lock_pixels(&self) -> Option<&[u8]>;

    /// Снять блокировку, взятую `lock_pixels`.
    fn unlock_pixels(&self);
}

/// Захваченные пиксели поверхности. Не копируется; `Drop` снимает блокировку.
#[derive(Debug)]
pub struct LockedPixels<'a, S: PixelSurface + ?Sized> {
    surface: &'a S,
    pixels: &'a [u8],
    info: SurfaceInfo,
}

impl<'a, S: PixelSurface + ?Sized> LockedPixels<'a, S> {
    /// Если захват не удался, освобождать нечего: guard не создаётся.
    pub fn acquire(surface: &'a S) -> Result<Self> {
        let info = surface.info();
        let pixels = surface.lock_pixels().ok_or_else(|| {
            BridgeError::ResourceAcquisition("Failed to lock/Read bitmap data".into())
        })?;
        trace!(width = info.width, height = info.height, "surface locked");
        Ok(Self { surface, pixels, info })
    }

    #[inline]
    pub fn info(&self) -> SurfaceInfo {
        self.info
    }

    /// Срез живёт не дольше guard'а.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }

    /// Вид на захваченные пиксели с обрезкой и поворотом.
    pub fn view(&self, crop: CropRect, rotation: Rotation) -> Result<ImageView<'_>> {
        let format = self.info.format.image_format()?;
        let full = ImageView::new(self.pixels, self.info.width, self.info.height, format, self.info.stride)?;
        Ok(full
            .cropped(crop.left, crop.top, crop.width, crop.height)?
            .rotated_by(rotation))
    }
}

impl<S: PixelSurface + ?Sized> Drop for LockedPixels<'_, S> {
    fn drop(&mut self) {
        self.surface.unlock_pixels();
        trace!("surface unlocked");
    }
}

/// Битмап в памяти процесса с эксклюзивной блокировкой (повторный захват без `unlock` отвергается).
#[derive(Debug)]
pub struct BitmapSurface {
    info: SurfaceInfo,
    data: Vec<u8>,
    locked: AtomicBool,
}

impl BitmapSurface {
    pub fn new(info: SurfaceInfo, data: Vec<u8>) -> Self {
        Self { info, data, locked: AtomicBool::new(false) }
    }

    /// Плотный 8-битный битмап `Alpha8`.
    pub fn alpha8(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(
            SurfaceInfo { width, height, stride: width, format: SurfaceFormat::Alpha8 },
            data,
        )
    }

    /// Плотный `Rgba8888`.
    pub fn rgba8888(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(
            SurfaceInfo { width, height, stride: width * 4, format: SurfaceFormat::Rgba8888 },
            data,
        )
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl PixelSurface for BitmapSurface {
    fn info(&self) -> SurfaceInfo {
        self.info
    }

    fn lock_pixels(&self) -> Option<&[u8]> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| self.data.as_slice())
    }

    fn unlock_pixels(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
