use std::time::Duration;

/// Calls `check` up to `attempts` times, sleeping `interval` between tries.
///
/// A `check` error counts as a miss and is logged; polling keeps going. Returns
/// `None` once the attempts are used up.
pub fn poll<T>(
    what: &str,
    attempts: u32,
    interval: Duration,
    mut check: impl FnMut() -> anyhow::Result<Option<T>>,
) -> Option<T> {
    for attempt in 1..=attempts {
        match check() {
            Ok(Some(v)) => {
                tracing::info!(what, attempt, "poll satisfied");
                return Some(v);
            }
            Ok(None) => tracing::info!(what, attempt, attempts, "still waiting"),
            Err(e) => tracing::warn!(what, attempt, error = %e, "poll attempt failed"),
        }
        if attempt < attempts && !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::poll;
    use std::time::Duration;

    #[test]
    fn stops_at_first_success() {
        let mut calls = 0;
        let got = poll("thing", 5, Duration::ZERO, || {
            calls += 1;
            Ok(if calls == 3 { Some(calls) } else { None })
        });
        assert_eq!(got, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_attempts_and_tolerates_errors() {
        let mut calls = 0;
        let got: Option<()> = poll("thing", 4, Duration::ZERO, || {
            calls += 1;
            if calls % 2 == 0 {
                anyhow::bail!("transient")
            }
            Ok(None)
        });
        assert_eq!(got, None);
        assert_eq!(calls, 4);
    }
}
