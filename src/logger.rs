//! Подписчик `tracing` для бинарников. Библиотека сама его никогда не ставит.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    EnvFilter,
};

/// `RUST_LOG` (по умолчанию `info`), время от старта процесса. На уровне debug видны закрытия span'ов.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let is_debug = env_filter.to_string().contains("debug") || env_filter.to_string().contains("trace");

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug { FmtSpan::CLOSE } else { FmtSpan::NONE });

    // повторная установка (например, из тестов) не должна ронять процесс
    let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
}
