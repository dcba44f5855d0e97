//! GTIN: страна по префиксу GS1, add-on EAN-2/EAN-5, цена и номер выпуска.
//!
//! Нецифровые фрагменты там, где ожидаются цифры, — ошибка, а не пустая строка:
//! так вызывающий код отличает «не товарный код» от «битые данные».

use crate::core::types::BarcodeFormat;
use crate::engine::EngineFailure;

/// Диапазон префиксов GS1 (включительно) → ISO 3166 alpha-2.
struct CountryId {
    first: u16,
    last: u16,
    id: &'static str,
}

const fn c(first: u16, last: u16, id: &'static str) -> CountryId {
    CountryId { first, last, id }
}

// Отсортировано по `first`, диапазоны не пересекаются.
const COUNTRIES: &[CountryId] = &[
    c(0, 19, "US"),
    c(30, 39, "US"),
    c(60, 99, "US"),
    c(100, 139, "US"),
    c(300, 379, "FR"),
    c(380, 380, "BG"),
    c(383, 383, "SI"),
    c(385, 385, "HR"),
    c(387, 387, "BA"),
    c(389, 389, "ME"),
    c(400, 440, "DE"),
    c(450, 459, "JP"),
    c(460, 469, "RU"),
    c(470, 470, "KG"),
    c(471, 471, "TW"),
    c(474, 474, "EE"),
    c(475, 475, "LV"),
    c(476, 476, "AZ"),
    c(477, 477, "LT"),
    c(478, 478, "UZ"),
    c(479, 479, "LK"),
    c(480, 480, "PH"),
    c(481, 481, "BY"),
    c(482, 482, "UA"),
    c(483, 483, "TM"),
    c(484, 484, "MD"),
    c(485, 485, "AM"),
    c(486, 486, "GE"),
    c(487, 487, "KZ"),
    c(488, 488, "TJ"),
    c(489, 489, "HK"),
    c(490, 499, "JP"),
    c(500, 509, "GB"),
    c(520, 521, "GR"),
    c(528, 528, "LB"),
    c(529, 529, "CY"),
    c(530, 530, "AL"),
    c(531, 531, "MK"),
    c(535, 535, "MT"),
    c(539, 539, "IE"),
    c(540, 549, "BE"),
    c(560, 560, "PT"),
    c(569, 569, "IS"),
    c(570, 579, "DK"),
    c(590, 590, "PL"),
    c(594, 594, "RO"),
    c(599, 599, "HU"),
    c(600, 601, "ZA"),
    c(603, 603, "GH"),
    c(604, 604, "SN"),
    c(608, 608, "BH"),
    c(609, 609, "MU"),
    c(611, 611, "MA"),
    c(613, 613, "DZ"),
    c(615, 615, "NG"),
    c(616, 616, "KE"),
    c(618, 618, "CI"),
    c(619, 619, "TN"),
    c(620, 620, "TZ"),
    c(621, 621, "SY"),
    c(622, 622, "EG"),
    c(623, 623, "BN"),
    c(624, 624, "LY"),
    c(625, 625, "JO"),
    c(626, 626, "IR"),
    c(627, 627, "KW"),
    c(628, 628, "SA"),
    c(629, 629, "AE"),
    c(630, 630, "QA"),
    c(640, 649, "FI"),
    c(690, 699, "CN"),
    c(700, 709, "NO"),
    c(729, 729, "IL"),
    c(730, 739, "SE"),
    c(740, 740, "GT"),
    c(741, 741, "SV"),
    c(742, 742, "HN"),
    c(743, 743, "NI"),
    c(744, 744, "CR"),
    c(745, 745, "PA"),
    c(746, 746, "DO"),
    c(750, 750, "MX"),
    c(754, 755, "CA"),
    c(759, 759, "VE"),
    c(760, 769, "CH"),
    c(770, 771, "CO"),
    c(773, 773, "UY"),
    c(775, 775, "PE"),
    c(777, 777, "BO"),
    c(778, 779, "AR"),
    c(780, 780, "CL"),
    c(784, 784, "PY"),
    c(786, 786, "EC"),
    c(789, 790, "BR"),
    c(800, 839, "IT"),
    c(840, 849, "ES"),
    c(850, 850, "CU"),
    c(858, 858, "SK"),
    c(859, 859, "CZ"),
    c(860, 860, "RS"),
    c(865, 865, "MN"),
    c(867, 867, "KP"),
    c(868, 869, "TR"),
    c(870, 879, "NL"),
    c(880, 880, "KR"),
    c(883, 883, "MM"),
    c(884, 884, "KH"),
    c(885, 885, "TH"),
    c(888, 888, "SG"),
    c(890, 890, "IN"),
    c(893, 893, "VN"),
    c(896, 896, "PK"),
    c(899, 899, "ID"),
    c(900, 919, "AT"),
    c(930, 939, "AU"),
    c(940, 949, "NZ"),
    c(955, 955, "MY"),
    c(958, 958, "MO"),
];

/// Число из `text[from..from + len]`; всё, что не цифры, — ошибка.
fn digits_at(text: &str, from: usize, len: usize) -> Result<u32, EngineFailure> {
    let part = text
        .get(from..from + len)
        .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| EngineFailure::new(format!("Invalid GTIN digits in {text:?}")))?;
    part.parse()
        .map_err(|_| EngineFailure::new(format!("Invalid GTIN digits in {text:?}")))
}

/// Страна по префиксу. Add-on после пробела игнорируется.
/// GTIN-14 без индикатора упаковки, UPC-A/UPC-E (12/8 цифр) — с неявным ведущим нулём.
pub fn lookup_country_identifier(gtin: &str, format: BarcodeFormat) -> Result<String, EngineFailure> {
    let size = gtin.find(' ').unwrap_or(gtin.len());
    if !matches!(size, 14 | 13 | 12 | 8) {
        return Ok(String::new());
    }
    let first = usize::from(size == 14);
    let implicit_zero = usize::from(size == 12 || (size == 8 && format != BarcodeFormat::Ean8));
    let ean8 = size == 8 && format == BarcodeFormat::Ean8;

    if !ean8 {
        // 0000000 — ограниченное обращение, 0000001..0000099 зарезервированы под GTIN-8
        if digits_at(gtin, first, 7 - implicit_zero)? <= 99 {
            return Ok(String::new());
        }
        if (1..=9).contains(&digits_at(gtin, first, 5 - implicit_zero)?) {
            return Ok("US".into());
        }
        if (1..=9).contains(&digits_at(gtin, first, 4 - implicit_zero)?) {
            return Ok("US".into());
        }
    }

    let prefix = digits_at(gtin, first, 3 - implicit_zero)?;
    if ean8 && prefix <= 99 {
        return Ok(String::new());
    }

    let i = COUNTRIES.partition_point(|c| u32::from(c.last) < prefix);
    Ok(COUNTRIES
        .get(i)
        .filter(|c| prefix >= u32::from(c.first))
        .map(|c| c.id.to_owned())
        .unwrap_or_default())
}

/// Add-on — то, что идёт после пробела в Plain-тексте символов EAN/UPC.
pub fn ean_add_on(text: &str, format: BarcodeFormat) -> String {
    if !format.is_gtin() {
        return String::new();
    }
    text.split_once(' ').map(|(_, a)| a.to_owned()).unwrap_or_default()
}

/// Цена из EAN-5. Первая цифра — валюта, остальные — сумма в сотых.
pub fn price(ean5_add_on: &str) -> Result<String, EngineFailure> {
    if ean5_add_on.len() != 5 {
        return Ok(String::new());
    }
    let currency = match ean5_add_on.as_bytes()[0] {
        b'0' | b'1' => "GBP £",
        b'3' => "AUD $",
        b'4' => "NZD $",
        b'5' => "USD $",
        b'6' => "CAD $",
        b'9' => match ean5_add_on {
            // нет рекомендованной цены
            "90000" => return Ok(String::new()),
            "99991" => return Ok("0.00".into()),
            "99990" => return Ok("Used".into()),
            _ => "",
        },
        _ => "",
    };
    let raw = digits_at(ean5_add_on, 1, 4)?;
    Ok(format!("{currency}{}.{:02}", raw / 100, raw % 100))
}

/// Номер выпуска из EAN-2 без ведущих нулей.
pub fn issue_nr(ean2_add_on: &str) -> Result<String, EngineFailure> {
    if ean2_add_on.len() != 2 {
        return Ok(String::new());
    }
    Ok(digits_at(ean2_add_on, 0, 2)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_disjoint() {
        for w in COUNTRIES.windows(2) {
            assert!(w[0].first <= w[0].last);
            assert!(w[0].last < w[1].first, "{} overlaps {}", w[0].id, w[1].id);
        }
    }

    #[test]
    fn countries_by_prefix() {
        assert_eq!(lookup_country_identifier("4006381333931", BarcodeFormat::Ean13).unwrap(), "DE");
        assert_eq!(lookup_country_identifier("5012345678900", BarcodeFormat::Ean13).unwrap(), "GB");
        assert_eq!(lookup_country_identifier("036000291452", BarcodeFormat::UpcA).unwrap(), "US");
        assert_eq!(lookup_country_identifier("9780201379624 12", BarcodeFormat::Ean13).unwrap(), "");
        assert_eq!(lookup_country_identifier("4600000000003", BarcodeFormat::Ean13).unwrap(), "RU");
        // GTIN-14: индикатор упаковки пропускается
        assert_eq!(lookup_country_identifier("14006381333938", BarcodeFormat::Ean13).unwrap(), "DE");
        // EAN-8
        assert_eq!(lookup_country_identifier("40123455", BarcodeFormat::Ean8).unwrap(), "DE");
        assert_eq!(lookup_country_identifier("02345673", BarcodeFormat::Ean8).unwrap(), "");
    }

    #[test]
    fn restricted_and_odd_sizes_have_no_country() {
        assert_eq!(lookup_country_identifier("0000000123457", BarcodeFormat::Ean13).unwrap(), "");
        assert_eq!(lookup_country_identifier("2012345678909", BarcodeFormat::Ean13).unwrap(), "");
        assert_eq!(lookup_country_identifier("12345", BarcodeFormat::Ean13).unwrap(), "");
        assert_eq!(lookup_country_identifier("", BarcodeFormat::UpcA).unwrap(), "");
    }

    #[test]
    fn malformed_digits_are_failures() {
        assert!(lookup_country_identifier("ABCDEFGHIJKLM", BarcodeFormat::Ean13).is_err());
        assert!(lookup_country_identifier("40063X1333931", BarcodeFormat::Ean13).is_err());
        // не-ASCII не должен ронять срез посреди символа
        assert!(lookup_country_identifier("4ÄÄÄÄ000", BarcodeFormat::Ean13).is_err());
        assert!(price("5ab00").is_err());
        assert!(issue_nr("1x").is_err());
    }

    #[test]
    fn add_on_price_and_issue() {
        assert_eq!(ean_add_on("9780201379624 51999", BarcodeFormat::Ean13), "51999");
        assert_eq!(ean_add_on("9780201379624", BarcodeFormat::Ean13), "");
        assert_eq!(ean_add_on("HELLO WORLD", BarcodeFormat::Code128), "");

        assert_eq!(price("51999").unwrap(), "USD $19.99");
        assert_eq!(price("00100").unwrap(), "GBP £1.00");
        assert_eq!(price("60575").unwrap(), "CAD $5.75");
        assert_eq!(price("21234").unwrap(), "12.34");
        assert_eq!(price("90000").unwrap(), "");
        assert_eq!(price("99991").unwrap(), "0.00");
        assert_eq!(price("99990").unwrap(), "Used");
        assert_eq!(price("12").unwrap(), "");

        assert_eq!(issue_nr("07").unwrap(), "7");
        assert_eq!(issue_nr("51999").unwrap(), "");
    }
}
