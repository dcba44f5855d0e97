// src/core/mod.rs
//
// Базовые типы: вид на пиксели и объектный граф результата.

pub mod image;
pub mod types;
