//! Ошибки пограничного слоя.
//!
//! Три «роняющих» вида (неверный аргумент, захват ресурса, сбой движка) — варианты
//! [`BridgeError`]. «Ничего не найдено» ошибкой не является: read-операции отдают `Ok(None)`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Нарушение контракта вызывающей стороной: неизвестная строка-enum, кроп вне границ,
    /// поворот не из {0, 90, 180, 270}, неподдерживаемый формат пикселей.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Не удалось заблокировать пиксели поверхности.
    #[error("failed to lock pixel surface: {0}")]
    ResourceAcquisition(String),

    /// Сбой внутри движка (или значение вне словаря — рассинхрон версий). Сообщение движка как есть.
    #[error("{0}")]
    Engine(String),
}

/// Категория ошибки без полезной нагрузки — для хоста, который ветвится по виду.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    ResourceAcquisition,
    Engine,
}

impl BridgeError {
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::ResourceAcquisition(_) => ErrorKind::ResourceAcquisition,
            Self::Engine(_) => ErrorKind::Engine,
        }
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
