//! Chaos hooks (feature: `failpoints`).
//!
//! The macro expands to nothing unless the feature is enabled. When enabled,
//! it panics if `OLAPQ_FAILPOINTS` (comma separated) lists either the point
//! name or `name:detail`, e.g. `evaluate_step:c`.

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($name:expr, $detail:expr) => {{
        if let Ok(points) = std::env::var("OLAPQ_FAILPOINTS") {
            let qualified = format!("{}:{}", $name, $detail);
            if points.split(',').any(|p| p == $name || p == qualified) {
                panic!("failpoint triggered: {}", qualified);
            }
        }
    }};
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($name:expr, $detail:expr) => {
        let _ = (&$name, &$detail);
    };
}
