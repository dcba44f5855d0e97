use std::env;

use tracing::{error, info};
use ultracode_bridge::{logger, BarcodeFormat, BitMatrix, Bridge, CropRect, ReaderHints};

fn main() {
    logger::init();

    let mut text = String::from("HELLO-128");
    let mut format = String::from("CODE_128");
    let mut width = 0i32;
    let mut height = 64i32;
    let mut margin = -1i32;
    let mut ecc = -1i32;
    let mut svg = false;
    let mut scan = true;
    let mut write_pgm: Option<String> = None;

    // --text "HELLO-128"  --format CODE_128  --width 0  --height 64  --margin -1  --ecc -1
    // --svg  --no-scan  --write-pgm out.pgm
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--text" => {
                if let Some(v) = args.next() {
                    text = v;
                }
            }
            "--format" => {
                if let Some(v) = args.next() {
                    format = v;
                }
            }
            "--width" => width = int_arg(args.next(), width),
            "--height" => height = int_arg(args.next(), height),
            "--margin" => margin = int_arg(args.next(), margin),
            "--ecc" => ecc = int_arg(args.next(), ecc),
            "--svg" => svg = true,
            "--no-scan" => scan = false,
            "--write-pgm" => write_pgm = args.next(),
            "--help" | "-h" => {
                print_help();
                return;
            }
            other => {
                eprintln!("Неизвестный аргумент: {other}");
                print_help();
                std::process::exit(2);
            }
        }
    }

    let bridge = Bridge::new();
    let matrix = match bridge.encode_text(&text, &format, width, height, margin, ecc) {
        Ok(m) => m,
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            std::process::exit(1);
        }
    };
    info!(width = matrix.width(), height = matrix.height(), "encoded");

    if svg {
        println!("{}", matrix.to_svg());
    } else {
        print!("{}", matrix.to_text(false));
    }

    let (width, height) = (matrix.width(), matrix.height());
    let luma = to_luma(matrix);
    if let Some(path) = write_pgm {
        if let Err(e) = write_pgm_p5(&path, width, height, &luma) {
            error!("Ошибка записи PGM: {e}");
        } else {
            info!(%path, "PGM сохранён");
        }
    }

    // встроенный движок читает только линейные коды
    let linear = format.parse::<BarcodeFormat>().is_ok_and(BarcodeFormat::is_linear);
    if scan && !linear {
        info!(%format, "2D-символ не читается встроенным движком, проверка пропущена");
    } else if scan {
        let crop = CropRect::new(0, 0, to_i32(width), to_i32(height));
        match bridge.read_plane(&luma, width, crop, 0, &ReaderHints::default()) {
            Ok(Some(results)) => {
                for b in results {
                    println!("{}: {}  [{}]", b.format, b.text, b.position);
                }
            }
            Ok(None) => println!("Ничего не распознано :("),
            Err(e) => error!(kind = ?e.kind(), "{e}"),
        }
    }
}

/// Тёмный модуль — чёрный пиксель.
fn to_luma(matrix: BitMatrix) -> Vec<u8> {
    matrix
        .into_data()
        .into_iter()
        .map(|m| if m == BitMatrix::DARK { 0 } else { 255 })
        .collect()
}

fn int_arg(v: Option<String>, fallback: i32) -> i32 {
    v.and_then(|s| s.parse().ok()).unwrap_or(fallback)
}

fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn print_help() {
    eprintln!(
        r#"Использование:
  cargo run --bin encode_scan -- [--text <TEXT>] [--format <NAME>] [--width <px>] [--height <px>]
                                 [--margin <modules>] [--ecc 0..8] [--svg] [--no-scan] [--write-pgm <file.pgm>]

По умолчанию рисуется Code128 "HELLO-128" высотой 64 и сразу читается обратно
(2D-форматы встроенный движок только рисует, проверка для них пропускается).

Примеры:
  cargo run --bin encode_scan --
  cargo run --bin encode_scan -- --text 4006381333931 --format EAN_13
  cargo run --bin encode_scan -- --text HELLO --format QR_CODE --width 200 --height 200 --svg --no-scan
"#
    );
}

// Простая запись PGM (P5, 8-бит)
fn write_pgm_p5(path: &str, width: usize, height: usize, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    let mut f = std::fs::File::create(path)?;
    write!(f, "P5\n{width} {height}\n255\n")?;
    f.write_all(data)?;
    Ok(())
}
