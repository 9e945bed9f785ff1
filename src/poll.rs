use crate::logging::Logger;
use std::time::Duration;

/// Bounded readiness poll: a fixed number of attempts with a fixed sleep
/// between them.
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts < 1 {
            return Err(format!(
                "max-attempts must be >= 1, got {}",
                self.max_attempts
            ));
        }
        Ok(())
    }
}

/// Polls `check` until it reports ready or the attempt budget runs out.
/// Returns the final readiness; exhausting the budget is not an error, the
/// caller proceeds either way.
pub fn poll_ready<F>(log: &Logger, name: &str, cfg: &PollConfig, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 0..cfg.max_attempts {
        log.info(
            "checking readiness",
            &[
                ("component", name),
                ("attempt", &format!("{}/{}", attempt + 1, cfg.max_attempts)),
            ],
        );
        if check() {
            log.info("component is ready", &[("component", name)]);
            return true;
        }
        if attempt + 1 < cfg.max_attempts {
            std::thread::sleep(cfg.interval);
        }
    }
    log.warn(
        "component not ready after all attempts, proceeding anyway",
        &[("component", name)],
    );
    false
}
