//! EAN-13/UPC-A: декодер одной линии + запись модулей.
//!
//! Алгоритм:
//! 1) Run-lengths линии (чётные — белые).
//! 2) Кандидат: стартовый guard (101) после тихой зоны; 59 run'ов символа = 95 модулей,
//!    отсюда ширина модуля.
//! 3) Левую половину декодируем с учётом A/B (B = реверс A), правую — C; между ними guard 01010.
//! 4) Первая цифра — по маске A/B, затем контрольная сумма.
//!
//! UPC-A — это EAN-13 с ведущим 0; декодер всегда отдаёт 13 цифр.

use super::{modules_of, push_runs, run_positions, RowHit, MIN_QUIET_MODULES};
use crate::binarize::{normalize_widths, pattern_distance, runs_from_white};
use crate::core::types::BarcodeFormat;
use crate::engine::EngineFailure;

/// Run'ов в символе: guard 3 + 6×4 + центр 5 + 6×4 + guard 3.
const SYMBOL_RUNS: usize = 59;
const SYMBOL_MODULES: f32 = 95.0;

// A (L) — левые «A»-паттерны (space/bar/space/bar), сумма = 7 модулей
const A_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

// B (G) — это реверс A (зеркало по run-ам)
const B_PATTERNS: [[u8; 4]; 10] = [
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

// C (R) — правая сторона; по ширинам совпадает с A (инверсия цветов не важна для run-ширин)
const C_PATTERNS: [[u8; 4]; 10] = A_PATTERNS;

/// Маски для определения первой цифры по типам шести левых цифр (A/B).
/// true = B, false = A
const FIRST_DIGIT_MASKS: [[bool; 6]; 10] = [
    [false, false, false, false, false, false], // 0
    [false, false, true, false, true, true],    // 1
    [false, false, true, true, false, true],    // 2
    [false, false, true, true, true, false],    // 3
    [false, true, false, false, true, true],    // 4
    [false, true, true, false, false, true],    // 5
    [false, true, true, true, false, false],    // 6
    [false, true, false, true, false, true],    // 7
    [false, true, false, true, true, false],    // 8
    [false, true, true, false, true, false],    // 9
];

/// Попытка декодировать линию. Текст — 13 цифр.
pub fn decode_row(bits: &[bool], accept_bad_checksum: bool) -> Option<RowHit> {
    let rl = runs_from_white(bits);
    let pos = run_positions(&rl);
    let mut fallback = None;
    let mut i = 1;
    // за символом нужен ещё белый run тихой зоны
    while i + SYMBOL_RUNS < rl.len() {
        if let Some(hit) = decode_at(&rl, &pos, i) {
            if hit.checksum_ok {
                return Some(hit);
            }
            if accept_bad_checksum && fallback.is_none() {
                fallback = Some(hit);
            }
        }
        i += 2;
    }
    fallback
}

#[allow(clippy::cast_precision_loss)]
fn decode_at(rl: &[usize], pos: &[usize], i: usize) -> Option<RowHit> {
    let unit = rl[i..i + SYMBOL_RUNS].iter().sum::<usize>() as f32 / SYMBOL_MODULES;
    let quiet = MIN_QUIET_MODULES * unit;
    if (rl[i - 1] as f32) < quiet || (rl[i + SYMBOL_RUNS] as f32) < quiet {
        return None;
    }
    if !is_guard(&rl[i..i + 3], unit) {
        return None;
    }
    let mut idx = i + 3;

    // левая половина: 6 цифр, каждая — 4 run'а
    let mut digits = [0u8; 13];
    let mut left_is_b = [false; 6];
    for d in 0..6 {
        let pat = normalize_widths::<4>(&rl[idx..idx + 4], 7, 4);
        let (digit_a, dist_a) = best_match(&pat, &A_PATTERNS);
        let (digit_b, dist_b) = best_match(&pat, &B_PATTERNS);
        let (digit, dist, is_b) = if dist_a <= dist_b {
            (digit_a, dist_a, false)
        } else {
            (digit_b, dist_b, true)
        };
        if dist > 1 {
            return None;
        }
        digits[1 + d] = digit;
        left_is_b[d] = is_b;
        idx += 4;
    }

    // центральный guard 01010
    if !is_guard(&rl[idx..idx + 5], unit) {
        return None;
    }
    idx += 5;

    // правая половина: 6 цифр (C-набор)
    for d in 0..6 {
        let pat = normalize_widths::<4>(&rl[idx..idx + 4], 7, 4);
        let (digit, dist) = best_match(&pat, &C_PATTERNS);
        if dist > 1 {
            return None;
        }
        digits[7 + d] = digit;
        idx += 4;
    }

    if !is_guard(&rl[idx..idx + 3], unit) {
        return None;
    }

    digits[0] = deduce_first_digit(&left_is_b)?;
    let checksum_ok = check_digit(&digits[..12]) == digits[12];
    Some(RowHit {
        format: BarcodeFormat::Ean13,
        text: digits.iter().map(|&d| char::from(b'0' + d)).collect(),
        gs1: false,
        start: pos[i],
        end: pos[i + SYMBOL_RUNS],
        checksum_ok,
    })
}

/// Guard: все run'ы по одному модулю.
fn is_guard(widths: &[usize], unit: f32) -> bool {
    widths.iter().all(|&w| modules_of(w, unit) == 1.0)
}

/// Ближайшая цифра по паттерну ширин.
fn best_match(pat: &[u8; 4], dict: &[[u8; 4]; 10]) -> (u8, u32) {
    let mut best = (0u8, u32::MAX);
    for (digit, q) in (0u8..).zip(dict.iter()) {
        let d = pattern_distance(pat, q);
        if d < best.1 {
            best = (digit, d);
        }
    }
    best
}

fn deduce_first_digit(mask_b: &[bool; 6]) -> Option<u8> {
    (0u8..).zip(FIRST_DIGIT_MASKS.iter()).find(|(_, m)| *m == mask_b).map(|(d, _)| d)
}

/// Контрольная цифра для 12 цифр EAN-13 (веса 1,3,1,3…).
#[allow(clippy::cast_possible_truncation)]
fn check_digit(d: &[u8]) -> u8 {
    let sum: u32 = d
        .iter()
        .enumerate()
        .map(|(i, &v)| u32::from(v) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

// === Запись ===

/// Модули EAN-13 (без тихих зон). 12 цифр — контрольная дописывается, 13 — проверяется.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(contents: &[char]) -> Result<Vec<bool>, EngineFailure> {
    let mut digits = contents
        .iter()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| EngineFailure::new("Contents should only contain digits: 0-9"))?;
    match digits.len() {
        12 => digits.push(check_digit(&digits)),
        13 => {
            if check_digit(&digits[..12]) != digits[12] {
                return Err(EngineFailure::new("Contents do not pass checksum"));
            }
        }
        n => {
            return Err(EngineFailure::new(format!(
                "Requested contents should be 12 or 13 digits long, but got {n}"
            )))
        }
    }

    let mask = FIRST_DIGIT_MASKS[usize::from(digits[0])];
    let mut out = Vec::with_capacity(95);
    push_runs(&mut out, &[1, 1, 1], true);
    for (k, &d) in digits[1..7].iter().enumerate() {
        let pat = if mask[k] { &B_PATTERNS } else { &A_PATTERNS };
        push_runs(&mut out, &pat[usize::from(d)], false);
    }
    push_runs(&mut out, &[1, 1, 1, 1, 1], false);
    for &d in &digits[7..13] {
        push_runs(&mut out, &C_PATTERNS[usize::from(d)], true);
    }
    push_runs(&mut out, &[1, 1, 1], true);
    Ok(out)
}

/// UPC-A: 11 или 12 цифр, пишется как EAN-13 с ведущим 0.
pub fn encode_upca(contents: &[char]) -> Result<Vec<bool>, EngineFailure> {
    if !matches!(contents.len(), 11 | 12) {
        return Err(EngineFailure::new(format!(
            "Requested contents should be 11 or 12 digits long, but got {}",
            contents.len()
        )));
    }
    let mut padded = Vec::with_capacity(13);
    padded.push('0');
    padded.extend_from_slice(contents);
    encode(&padded)
}
