//! Бинаризация линии сканирования и измерение ширин баров.
//!
//! Режимы соответствуют `Binarizer` из опций:
//! - `LocalAverage` — скользящее среднее окна (лучше на неравномерной засветке),
//!   с фоллбэком на глобальный порог, если линия «рассыпалась»;
//! - `GlobalHistogram` — один порог на всю линию;
//! - `FixedThreshold` — порог 127;
//! - `BoolCast` — чёрное только 0.
//!
//! Везде `true` = чёрный.

use crate::options::Binarizer;

/// Меньше стольких run'ов адаптивный результат считается неудачным.
const MIN_ADAPTIVE_RUNS: usize = 24;

/// Простой глобальный порог: смесь среднего и середины между min/max.
/// Быстро и без аллокаций, но не любит градиенты освещения.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn otsu_like_threshold(row: &[u8]) -> u8 {
    if row.is_empty() {
        return 0;
    }
    let (mut min_v, mut max_v) = (u8::MAX, 0u8);
    let mut sum: u64 = 0;
    for &v in row {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
        sum += u64::from(v);
    }
    let mean = sum / row.len() as u64;
    let mid = (u64::from(min_v) + u64::from(max_v)) / 2;
    ((mean + mid) / 2) as u8
}

/// Глобальная бинаризация строки.
pub fn binarize_row(row: &[u8]) -> Vec<bool> {
    let t = otsu_like_threshold(row);
    row.iter().map(|&v| v < t).collect()
}

/// Адаптивная бинаризация по скользящему среднему окна `win` с небольшим смещением `bias`.
/// Выбор окна: width/32, в диапазоне [8..64].
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn binarize_row_adaptive(row: &[u8]) -> Vec<bool> {
    let n = row.len();
    if n == 0 {
        return Vec::new();
    }
    let win = (n / 32).clamp(8, 64);
    let bias: i32 = 5; // небольшой «запас» в сторону чёрного

    // префиксные суммы для среднего по окну
    let mut pref: Vec<u32> = Vec::with_capacity(n + 1);
    let mut acc = 0u32;
    pref.push(0);
    for &v in row {
        acc += u32::from(v);
        pref.push(acc);
    }

    row.iter()
        .enumerate()
        .map(|(i, &v)| {
            let left = i.saturating_sub(win);
            let right = (i + win).min(n - 1);
            let len = (right - left + 1) as u32;
            let mean = ((pref[right + 1] - pref[left]) / len) as i32;
            i32::from(v) < mean - bias
        })
        .collect()
}

/// Бинаризация линии выбранным режимом.
pub fn binarize_line(row: &[u8], mode: Binarizer) -> Vec<bool> {
    match mode {
        Binarizer::LocalAverage => {
            let adaptive = binarize_row_adaptive(row);
            if transitions(&adaptive) + 1 >= MIN_ADAPTIVE_RUNS {
                adaptive
            } else {
                binarize_row(row)
            }
        }
        Binarizer::GlobalHistogram => binarize_row(row),
        Binarizer::FixedThreshold => row.iter().map(|&v| v <= 127).collect(),
        Binarizer::BoolCast => row.iter().map(|&v| v == 0).collect(),
    }
}

fn transitions(bits: &[bool]) -> usize {
    bits.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Превратить бинарную строку в последовательность ширин баров (run-lengths),
/// начиная с первого пикселя (как есть).
pub fn runs(row_bin: &[bool]) -> Vec<usize> {
    let Some((&first, rest)) = row_bin.split_first() else {
        return Vec::new();
    };
    let mut v = Vec::new();
    let mut cur = first;
    let mut len = 1usize;
    for &b in rest {
        if b == cur {
            len += 1;
        } else {
            v.push(len);
            cur = b;
            len = 1;
        }
    }
    v.push(len);
    v
}

/// Run-lengths, гарантированно начинающиеся с белого run'а (возможно нулевой длины):
/// чётные индексы — белые, нечётные — чёрные.
pub fn runs_from_white(row_bin: &[bool]) -> Vec<usize> {
    let mut rl = runs(row_bin);
    if row_bin.first() == Some(&true) {
        rl.insert(0, 0);
    }
    rl
}

/// Привести ширины `widths` к `modules` модулям (каждый элемент 1..=`max`).
/// Сумма подгоняется к `modules`, если это возможно в пределах клампа.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn normalize_widths<const N: usize>(widths: &[usize], modules: u32, max: u8) -> [u8; N] {
    debug_assert_eq!(widths.len(), N);
    let sum: usize = widths.iter().sum();
    let mut out = [1u8; N];
    if sum == 0 {
        return out;
    }
    let scale = sum as f32 / modules as f32;
    for (o, &w) in out.iter_mut().zip(widths) {
        *o = ((w as f32 / scale).round() as i32).clamp(1, i32::from(max)) as u8;
    }
    adjust_sum(&mut out, modules as i32, max);
    out
}

fn adjust_sum(v: &mut [u8], target: i32, max: u8) {
    let mut sum: i32 = v.iter().map(|&x| i32::from(x)).sum();
    while sum != target {
        let pick = if sum > target {
            v.iter().enumerate().rev().max_by_key(|(_, &x)| x).map(|(i, _)| i)
        } else {
            v.iter().enumerate().min_by_key(|(_, &x)| x).map(|(i, _)| i)
        };
        let Some(i) = pick else { break };
        if sum > target && v[i] > 1 {
            v[i] -= 1;
            sum -= 1;
        } else if sum < target && v[i] < max {
            v[i] += 1;
            sum += 1;
        } else {
            break;
        }
    }
}

/// Манхэттенское расстояние между паттернами ширин.
#[inline]
pub fn pattern_distance(p: &[u8], q: &[u8]) -> u32 {
    p.iter()
        .zip(q)
        .map(|(&a, &b)| u32::from(a.abs_diff(b)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_and_white_alignment() {
        let bits = [true, true, false, true, false, false, false];
        assert_eq!(runs(&bits), vec![2, 1, 1, 3]);
        assert_eq!(runs_from_white(&bits), vec![0, 2, 1, 1, 3]);
        assert_eq!(runs_from_white(&bits[2..]), vec![1, 1, 3]);
        assert!(runs(&[]).is_empty());
    }

    #[test]
    fn binarizer_modes() {
        let row = [0u8, 1, 127, 128, 255];
        assert_eq!(binarize_line(&row, Binarizer::BoolCast), vec![true, false, false, false, false]);
        assert_eq!(binarize_line(&row, Binarizer::FixedThreshold), vec![true, true, true, false, false]);
        assert_eq!(binarize_line(&row, Binarizer::GlobalHistogram), vec![true, true, false, false, false]);
    }

    #[test]
    fn adaptive_follows_ideal_bars() {
        let mut row = vec![255u8; 20];
        for extra in [0usize, 2, 4] {
            row.extend(std::iter::repeat(0).take(2 + extra));
            row.extend(std::iter::repeat(255).take(3));
        }
        row.extend(std::iter::repeat(255u8).take(20));
        let bits = binarize_row_adaptive(&row);
        assert_eq!(runs(&bits), vec![20, 2, 3, 4, 3, 6, 23]);
    }

    #[test]
    fn normalization_hits_target_sum() {
        let p: [u8; 6] = normalize_widths(&[4, 2, 2, 4, 4, 6], 11, 4);
        assert_eq!(p, [2, 1, 1, 2, 2, 3]);
        let s: [u8; 7] = normalize_widths(&[6, 9, 9, 3, 3, 3, 6], 13, 4);
        assert_eq!(s, [2, 3, 3, 1, 1, 1, 2]);
        assert_eq!(pattern_distance(&p, &[2, 1, 1, 2, 3, 2]), 2);
    }
}
