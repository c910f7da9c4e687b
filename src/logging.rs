// logging.rs - `log` backend
//
// Browser console on wasm32, stderr everywhere else.

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(target_arch = "wasm32")]
mod console {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = console)]
        pub fn log(s: &str);
        #[wasm_bindgen(js_namespace = console)]
        pub fn warn(s: &str);
        #[wasm_bindgen(js_namespace = console)]
        pub fn error(s: &str);
    }
}

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) { return; }

        let line = format!("[fx] {} {}: {}", record.level(), record.target(), record.args());
        write(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write(level: Level, line: &str) {
    match level {
        Level::Error => console::error(line),
        Level::Warn => console::warn(line),
        _ => console::log(line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// Install the logger. Later calls only change the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Parse a level name, falling back to `Info`
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }

    #[test]
    fn init_twice_is_fine() {
        init(LevelFilter::Warn);
        init(LevelFilter::Debug);
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
