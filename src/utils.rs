use crate::config::AXIS_LIMIT;
use std::collections::VecDeque;

/// Clamp a command or axis value to [-127, 127]
pub fn clamp_axis(value: i32) -> i32 {
    value.clamp(-AXIS_LIMIT, AXIS_LIMIT)
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed shortest-path error from `current` to `target`, in [-180, 180]
pub fn shortest_heading_error(target: f64, current: f64) -> f64 {
    let mut error = target - current;
    if error > 180.0 {
        error -= 360.0;
    } else if error < -180.0 {
        error += 360.0;
    }
    error
}

/// Proportional heading correction, truncated toward zero like the firmware does
pub fn heading_turn_command(error: f64, gain: f64, limit: f64) -> i32 {
    (error * gain).clamp(-limit, limit) as i32
}

/// Push onto a bounded FIFO, evicting the oldest entries past `cap`
pub fn push_capped<T>(buffer: &mut VecDeque<T>, value: T, cap: usize) {
    buffer.push_back(value);
    while buffer.len() > cap {
        buffer.pop_front();
    }
}

/// Quote a CSV field if it contains a delimiter, quote or newline
pub fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Wall-clock stamp used in generated file names
pub fn timestamp_for_file_name() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_degrees() {
        assert_approx_eq!(normalize_degrees(370.0), 10.0);
        assert_approx_eq!(normalize_degrees(-90.0), 270.0);
        assert_approx_eq!(normalize_degrees(360.0), 0.0);
        let tiny = normalize_degrees(-1e-17);
        assert!((0.0..360.0).contains(&tiny), "got {}", tiny);
    }

    #[test]
    fn test_shortest_heading_error() {
        assert_approx_eq!(shortest_heading_error(90.0, 0.0), 90.0);
        assert_approx_eq!(shortest_heading_error(10.0, 350.0), 20.0);
        assert_approx_eq!(shortest_heading_error(350.0, 10.0), -20.0);
        assert_approx_eq!(shortest_heading_error(270.0, 0.0), -90.0);
    }

    #[test]
    fn test_heading_turn_command() {
        assert_eq!(heading_turn_command(90.0, 1.2, 60.0), 60);
        assert_eq!(heading_turn_command(-10.0, 1.2, 60.0), -12);
        assert_eq!(heading_turn_command(0.5, 1.2, 60.0), 0);
    }

    #[test]
    fn test_push_capped() {
        let mut buf = VecDeque::new();
        for i in 0..5 {
            push_capped(&mut buf, i, 3);
        }
        assert_eq!(buf, VecDeque::from(vec![2, 3, 4]));
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("GPS"), "GPS");
        assert_eq!(csv_escape("DRIVE_MS 80,500"), "\"DRIVE_MS 80,500\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_clamp_axis() {
        assert_eq!(clamp_axis(200), 127);
        assert_eq!(clamp_axis(-200), -127);
        assert_eq!(clamp_axis(5), 5);
    }
}
