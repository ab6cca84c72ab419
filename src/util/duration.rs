use std::sync::LazyLock;

use regex::Regex;

static UNITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+)\s*h(?:rs?|ours?)?)?\s*(?:(\d+)\s*m(?:ins?|inutes?)?)?\s*(?:(\d+)\s*s(?:ecs?|econds?)?)?$",
    )
    .expect("valid duration regex")
});

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):([0-5]\d)$").expect("valid clock regex"));

/// Parse a timer duration into seconds.
///
/// A bare number is minutes. Also accepts unit forms (`90s`, `25m`, `1h`,
/// `1hr`, `1h30m`, `1h 30m`) and clock form `mm:ss`.
pub fn parse_duration(input: &str) -> Result<u32, String> {
    let s = input.trim().to_ascii_lowercase();
    let invalid = || format!("invalid duration: {:?} (try 25, 90s, 25m, 1h30m or 12:30)", input);

    if s.is_empty() {
        return Err(invalid());
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        let minutes: u32 = s.parse().map_err(|_| invalid())?;
        return minutes.checked_mul(60).ok_or_else(invalid);
    }
    if let Some(caps) = CLOCK.captures(&s) {
        let minutes: u32 = caps[1].parse().map_err(|_| invalid())?;
        let seconds: u32 = caps[2].parse().map_err(|_| invalid())?;
        return minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .ok_or_else(invalid);
    }
    let caps = UNITS.captures(&s).ok_or_else(invalid)?;
    let mut total: u32 = 0;
    for (group, scale) in [(1, 3600u32), (2, 60), (3, 1)] {
        if let Some(m) = caps.get(group) {
            let n: u32 = m.as_str().parse().map_err(|_| invalid())?;
            total = n
                .checked_mul(scale)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(invalid)?;
        }
    }
    if caps.iter().skip(1).all(|m| m.is_none()) {
        return Err(invalid());
    }
    Ok(total)
}

/// `mm:ss`, with minutes running past 59 for long timers
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
