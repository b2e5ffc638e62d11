use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Polls `path`'s size at `poll_interval`, requiring `required_stable_polls`
/// consecutive unchanged reads before considering the file done being
/// written (`spec.md` §4.7 steady state). Returns `Ok(true)` once stable,
/// `Ok(false)` if the file disappears mid-poll or `stop` is cancelled first.
pub fn wait_until_stable(
    path: &Path,
    poll_interval: Duration,
    required_stable_polls: u32,
    stop: &CancellationToken,
) -> std::io::Result<bool> {
    let mut last_size: Option<u64> = None;
    let mut stable_count = 0;

    loop {
        if stop.is_cancelled() {
            return Ok(false);
        }

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(error) => return Err(error),
        };
        let size = metadata.len();

        if Some(size) == last_size {
            stable_count += 1;
            if stable_count >= required_stable_polls {
                return Ok(true);
            }
        } else {
            stable_count = 1;
            last_size = Some(size);
        }

        std::thread::sleep(poll_interval);
    }
}
