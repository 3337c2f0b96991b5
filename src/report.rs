use std::{env, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Colour is on unless `NO_COLOR` is set to anything non-empty.
pub fn color_enabled() -> bool {
    env::var_os("NO_COLOR").is_none_or(|v| v.is_empty())
}

/// End-of-run tally in the form `✓ 12 ✗ 1`.
pub fn tally(ok: usize, failed: usize, color: bool) -> String {
    let ok = format!("✓ {ok}");
    let failed = format!("✗ {failed}");
    if color {
        format!("{} {}", ok.green(), failed.red())
    } else {
        format!("{ok} {failed}")
    }
}

pub fn print_tally(ok: usize, failed: usize) {
    eprintln!("{}", tally(ok, failed, color_enabled()));
}

/// Progress bar on stderr. indicatif draws nothing when stderr is not a terminal.
pub fn progress(len: u64, what: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix(what.to_string());
    bar.enable_steady_tick(Duration::from_millis(200));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tally() {
        assert_eq!(tally(3, 0, false), "✓ 3 ✗ 0");
    }

    #[test]
    fn coloured_tally_strips_to_plain() {
        proptest::proptest!(|(ok in 0usize..10_000, failed in 0usize..10_000)| {
            let coloured = tally(ok, failed, true);
            let stripped = String::from_utf8(strip_ansi_escapes::strip(coloured.as_bytes())).unwrap();
            proptest::prop_assert_eq!(stripped, tally(ok, failed, false));
        })
    }
}
