//! Code 128: декодер одной линии + запись модулей.
//!
//! Поддержка:
//! - Наборы A/B/C, переключения CODE A/B/C, SHIFT, FNC1 (в первой позиции — признак GS1,
//!   дальше — ASCII 29, GS).
//! - Проверка checksum (mod 103).
//! - Все три старт-кода + STOP с тихими зонами по краям.
//!
//! Линию читаем слева направо: ищем старт-код после тихой зоны, затем идём по 6-run
//! символам до STOP (7 run'ов, сумма 13).

use super::{modules_of, push_runs, run_positions, RowHit, MIN_QUIET_MODULES};
use crate::binarize::{normalize_widths, pattern_distance, runs_from_white};
use crate::core::types::BarcodeFormat;
use crate::engine::EngineFailure;

/// Паттерны 0..=105: по 6 чисел (bars/spaces), сумма 11.
const CODE128_PATTERNS_STR: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214",
    "211232", // 103..105 = Start A/B/C
];

const PATTERNS: [[u8; 6]; 106] = parse_patterns();

/// STOP-паттерн (7 чисел, сумма 13).
const CODE128_STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

const FNC3: u8 = 96;
const FNC2: u8 = 97;
const SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const FNC1: u8 = 102;
const START_A: u8 = 103;

/// Ограничение длины входа writer'а.
const MAX_CONTENTS: usize = 80;

const fn parse_patterns() -> [[u8; 6]; 106] {
    let mut out = [[0u8; 6]; 106];
    let mut i = 0;
    while i < 106 {
        let b = CODE128_PATTERNS_STR[i].as_bytes();
        let mut k = 0;
        while k < 6 {
            out[i][k] = b[k] - b'0';
            k += 1;
        }
        i += 1;
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    const fn start_code(self) -> u8 {
        match self {
            Self::A => START_A,
            Self::B => START_A + 1,
            Self::C => START_A + 2,
        }
    }

    /// Код переключения на этот набор.
    const fn switch_code(self) -> u8 {
        match self {
            Self::A => CODE_A,
            Self::B => CODE_B,
            Self::C => CODE_C,
        }
    }

    fn from_start_code(v: u8) -> Option<Self> {
        match v {
            103 => Some(Self::A),
            104 => Some(Self::B),
            105 => Some(Self::C),
            _ => None,
        }
    }

    /// Набор для символа после SHIFT.
    const fn shifted(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
            Self::C => Self::C,
        }
    }
}

/// Попытка декодировать Code 128 на линии. При `accept_bad_checksum` символ с несошедшейся
/// суммой возвращается (с `checksum_ok == false`), если на линии нет корректного.
pub fn decode_row(bits: &[bool], accept_bad_checksum: bool) -> Option<RowHit> {
    let rl = runs_from_white(bits);
    let pos = run_positions(&rl);
    let mut fallback = None;
    // старт + checksum + STOP
    let mut i = 1;
    while i + 6 + 6 + 7 <= rl.len() {
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

/// Символ, начинающийся с чёрного run'а `i`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn decode_at(rl: &[usize], pos: &[usize], i: usize) -> Option<RowHit> {
    let unit = rl[i..i + 6].iter().sum::<usize>() as f32 / 11.0;
    if (rl[i - 1] as f32) < MIN_QUIET_MODULES * unit {
        return None;
    }
    let (start, dist) = best_code_match(&normalize_widths::<6>(&rl[i..i + 6], 11, 4));
    if dist != 0 {
        return None;
    }
    let set = CodeSet::from_start_code(start)?;

    let mut codes: Vec<u8> = Vec::new();
    let mut j = i + 6;
    loop {
        let stop = stop_distance(rl, j, unit);
        if stop == Some(0) {
            break;
        }
        match data_symbol(rl, j, unit) {
            Some(v) => codes.push(v),
            None if stop == Some(1) => break,
            None => return None,
        }
        j += 6;
    }

    let (&check, data) = codes.split_last()?;
    if data.is_empty() {
        return None;
    }
    let weighted: u32 = data
        .iter()
        .enumerate()
        .map(|(k, &v)| (k as u32 + 1) * u32::from(v))
        .sum();
    let checksum_ok = (u32::from(set.start_code()) + weighted) % 103 == u32::from(check);
    let (text, gs1) = decode_values(data, set)?;
    Some(RowHit {
        format: BarcodeFormat::Code128,
        text,
        gs1,
        start: pos[i],
        end: pos[j + 7],
        checksum_ok,
    })
}

/// Расстояние run'ов `j..j+7` до STOP, если за ними есть тихая зона.
#[allow(clippy::cast_precision_loss)]
fn stop_distance(rl: &[usize], j: usize, unit: f32) -> Option<u32> {
    let quiet = *rl.get(j + 7)?;
    if (quiet as f32) < MIN_QUIET_MODULES * unit {
        return None;
    }
    let w = &rl[j..j + 7];
    if (modules_of(w.iter().sum(), unit) - 13.0).abs() > 2.0 {
        return None;
    }
    Some(pattern_distance(&normalize_widths::<7>(w, 13, 4), &CODE128_STOP))
}

/// Значение 0..=102 символа на run'ах `j..j+6`.
fn data_symbol(rl: &[usize], j: usize, unit: f32) -> Option<u8> {
    let w = rl.get(j..j + 6)?;
    if (modules_of(w.iter().sum(), unit) - 11.0).abs() > 2.0 {
        return None;
    }
    let (v, dist) = best_code_match(&normalize_widths::<6>(w, 11, 4));
    (dist <= 1 && v < START_A).then_some(v)
}

fn best_code_match(pat: &[u8; 6]) -> (u8, u32) {
    let mut best = (0u8, u32::MAX);
    for (v, q) in (0u8..).zip(PATTERNS.iter()) {
        let d = pattern_distance(pat, q);
        if d < best.1 {
            best = (v, d);
            if d == 0 {
                break;
            }
        }
    }
    best
}

// === Декодирование код-значений в текст ===

fn decode_values(values: &[u8], start: CodeSet) -> Option<(String, bool)> {
    let mut out = String::new();
    let mut set = start;
    let mut shift = false;
    let mut gs1 = false;

    for (k, &v) in values.iter().enumerate() {
        // SHIFT действует на один следующий символ
        let cur = if shift { set.shifted() } else { set };
        shift = false;
        match (cur, v) {
            (_, FNC1) if k == 0 => gs1 = true,
            (_, FNC1) => out.push('\u{1d}'),
            (CodeSet::C, 0..=99) => {
                out.push(char::from(b'0' + v / 10));
                out.push(char::from(b'0' + v % 10));
            }
            (CodeSet::C, CODE_B) => set = CodeSet::B,
            (CodeSet::C, CODE_A) => set = CodeSet::A,
            (CodeSet::A, 0..=63) => out.push(char::from(v + 32)),
            (CodeSet::A, 64..=95) => out.push(char::from(v - 64)),
            (CodeSet::B, 0..=95) => out.push(char::from(v + 32)),
            (_, FNC3 | FNC2) => {}
            (_, SHIFT) => shift = true,
            (_, CODE_C) => set = CodeSet::C,
            (CodeSet::A, CODE_B) => set = CodeSet::B,
            (CodeSet::B, CODE_A) => set = CodeSet::A,
            // FNC4 (расширенный ASCII) не поддерживаем, пропускаем
            (CodeSet::A, CODE_A) | (CodeSet::B, CODE_B) => {}
            _ => return None,
        }
    }
    Some((out, gs1))
}

// === Запись ===

/// Модули символа (без тихих зон): набор C для чётных серий цифр, иначе B, для управляющих — A.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(contents: &[char]) -> Result<Vec<bool>, EngineFailure> {
    if contents.is_empty() || contents.len() > MAX_CONTENTS {
        return Err(EngineFailure::new(format!(
            "Contents length should be between 1 and {MAX_CONTENTS} characters, but got {}",
            contents.len()
        )));
    }
    let bytes = contents
        .iter()
        .map(|&c| {
            u8::try_from(u32::from(c))
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| EngineFailure::new(format!("Bad character in input: {c:?}")))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let mut codes: Vec<u8> = Vec::with_capacity(bytes.len() + 4);
    let mut set: Option<CodeSet> = None;

    let mut i = 0;
    while i < bytes.len() {
        let run = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        let enter_c = run % 2 == 0 && (run >= 4 || (run >= 2 && run == bytes.len() - i));
        let in_c = set == Some(CodeSet::C) && run >= 2;
        if enter_c || in_c {
            switch_set(&mut codes, &mut set, CodeSet::C);
            codes.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
            i += 2;
            continue;
        }
        let b = bytes[i];
        let target = match set {
            Some(CodeSet::A) if b < 96 => CodeSet::A,
            Some(CodeSet::B) if b >= 32 => CodeSet::B,
            _ if b < 32 => CodeSet::A,
            _ => CodeSet::B,
        };
        switch_set(&mut codes, &mut set, target);
        codes.push(if b < 32 { b + 64 } else { b - 32 });
        i += 1;
    }

    let weighted: u32 = codes
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, &v)| k as u32 * u32::from(v))
        .sum();
    codes.push(((u32::from(codes[0]) + weighted) % 103) as u8);
    Ok(modules_for(&codes))
}

/// Старт-код для первого символа, код переключения при смене набора.
fn switch_set(codes: &mut Vec<u8>, set: &mut Option<CodeSet>, target: CodeSet) {
    match *set {
        None => codes.push(target.start_code()),
        Some(cur) if cur != target => codes.push(target.switch_code()),
        Some(_) => {}
    }
    *set = Some(target);
}

/// Коды (со старт-кодом и checksum) → модули, плюс STOP.
fn modules_for(codes: &[u8]) -> Vec<bool> {
    let mut out = Vec::with_capacity(codes.len() * 11 + 13);
    for &code in codes {
        push_runs(&mut out, &PATTERNS[usize::from(code)], true);
    }
    push_runs(&mut out, &CODE128_STOP, true);
    out
}
