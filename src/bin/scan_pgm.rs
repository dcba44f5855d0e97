use std::{
    env, fs,
    io::{self, Read},
};

use tracing::{error, info};
use ultracode_bridge::{logger, Bridge, CropRect, ReaderHints};

fn main() {
    logger::init();

    let mut path: Option<String> = None;
    let mut crop: Option<CropRect> = None;
    let mut rotation = 0i32;
    let mut hints = ReaderHints::default();

    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--crop" => {
                crop = args.next().and_then(|v| parse_crop(&v));
                if crop.is_none() {
                    usage_error("--crop ждёт left,top,width,height");
                }
            }
            "--rotate" => {
                rotation = args.next().and_then(|v| v.parse().ok()).unwrap_or(0);
            }
            "--formats" => {
                if let Some(v) = args.next() {
                    hints.formats = v.split(',').map(str::to_owned).collect();
                }
            }
            "--binarizer" => {
                if let Some(v) = args.next() {
                    hints.binarizer = v;
                }
            }
            "--text-mode" => {
                if let Some(v) = args.next() {
                    hints.text_mode = v;
                }
            }
            "--min-lines" => {
                if let Some(v) = args.next() {
                    hints.min_line_count = v.parse().unwrap_or(hints.min_line_count);
                }
            }
            "--fast" => hints.try_harder = false,
            "--pure" => hints.is_pure = true,
            "--no-rotate" => hints.try_rotate = false,
            "--no-invert" => hints.try_invert = false,
            "--errors" => hints.return_errors = true,
            "--help" | "-h" => {
                print_help();
                return;
            }
            other => {
                if path.is_none() {
                    path = Some(other.to_string());
                } else {
                    usage_error(&format!("Лишний аргумент: {other}"));
                }
            }
        }
    }

    let Some(path) = path else {
        print_help();
        std::process::exit(2);
    };

    let (width, height, data) = match read_pgm_p5(&path) {
        Ok(t) => t,
        Err(e) => {
            error!("Не удалось прочитать PGM: {e}");
            std::process::exit(1);
        }
    };
    info!(%path, width, height, "PGM loaded");

    let crop = crop.unwrap_or_else(|| CropRect::new(0, 0, to_i32(width), to_i32(height)));
    let bridge = Bridge::new();
    match bridge.read_plane(&data, width, crop, rotation, &hints) {
        Ok(Some(results)) => {
            for b in results {
                let gtin = b.gtin.as_ref().map(|g| format!("  GTIN country={}", g.country)).unwrap_or_default();
                let err = b.error.as_ref().map(|e| format!("  error={e}")).unwrap_or_default();
                println!(
                    "{}: {}  [{}]  lines={} angle={}°{gtin}{err}",
                    b.format, b.text, b.position, b.line_count, b.orientation
                );
            }
        }
        Ok(None) => println!("Ничего не распознано."),
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            std::process::exit(1);
        }
    }
}

fn parse_crop(s: &str) -> Option<CropRect> {
    let v: Vec<i32> = s.split(',').map(|p| p.trim().parse().ok()).collect::<Option<_>>()?;
    match v[..] {
        [left, top, width, height] => Some(CropRect::new(left, top, width, height)),
        _ => None,
    }
}

fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn usage_error(msg: &str) -> ! {
    eprintln!("{msg}");
    print_help();
    std::process::exit(2);
}

fn print_help() {
    eprintln!(
        r#"Использование:
  cargo run --bin scan_pgm -- <path.pgm> [опции]

Опции:
  --crop L,T,W,H        обрезка до поворота (по умолчанию — весь кадр)
  --rotate 0|90|180|270 поворот по часовой
  --formats A,B         например CODE_128,EAN_13 (по умолчанию — все)
  --binarizer NAME      LOCAL_AVERAGE | GLOBAL_HISTOGRAM | FIXED_THRESHOLD | BOOL_CAST
  --text-mode NAME      PLAIN | ECI | HRI | HEX | ESCAPED
  --min-lines N         минимум линий на символ
  --fast --pure --no-rotate --no-invert --errors

Требуется PGM P5 (8-бит, maxval=255). Подробный лог: RUST_LOG=debug.
Примеры:
  cargo run --bin scan_pgm -- ./test.pgm
  cargo run --bin scan_pgm -- ./test.pgm --crop 0,100,640,80 --formats CODE_128
"#
    );
}

// Минимальный парсер PGM (P5, 8-бит)
fn read_pgm_p5(path: &str) -> io::Result<(usize, usize, Vec<u8>)> {
    let mut file = fs::File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    // читаем ascii-хедер "P5\n<width> <height>\n<maxval>\n"
    let mut i = 0usize;

    fn read_token(buf: &[u8], i: &mut usize) -> Option<String> {
        while *i < buf.len() {
            let c = buf[*i];
            if c == b'#' {
                while *i < buf.len() && buf[*i] != b'\n' {
                    *i += 1;
                }
            } else if c.is_ascii_whitespace() {
                *i += 1;
            } else {
                break;
            }
        }
        if *i >= buf.len() {
            return None;
        }
        let start = *i;
        while *i < buf.len() && !buf[*i].is_ascii_whitespace() {
            *i += 1;
        }
        Some(String::from_utf8_lossy(&buf[start..*i]).to_string())
    }

    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, format!("PGM: {msg}"));
    if read_token(&buf, &mut i).as_deref() != Some("P5") {
        return Err(invalid("поддерживается только P5 (binary)"));
    }

    let mut number = |what: &str| -> io::Result<usize> {
        read_token(&buf, &mut i)
            .ok_or_else(|| invalid(&format!("нет {what}")))?
            .parse()
            .map_err(|_| invalid(&format!("неверный {what}")))
    };
    let width = number("width")?;
    let height = number("height")?;
    if number("maxval")? != 255 {
        return Err(invalid("поддерживается только maxval=255"));
    }

    // ровно один пробельный символ после maxval
    i += 1;
    let expected = width
        .checked_mul(height)
        .ok_or_else(|| invalid("переполнение размера"))?;
    if buf.len() < i || buf.len() - i < expected {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "PGM: мало байтов данных"));
    }
    Ok((width, height, buf[i..i + expected].to_vec()))
}
