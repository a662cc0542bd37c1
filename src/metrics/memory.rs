//! Process memory sampling.

/// Resident set size of this process in MiB, when the platform exposes it.
#[cfg(target_os = "linux")]
pub fn resident_memory_mb() -> Option<f64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let rss_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // SAFETY: sysconf has no preconditions and only reads a constant.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(rss_pages as f64 * page_size as f64 / (1024.0 * 1024.0))
}

#[cfg(not(target_os = "linux"))]
pub fn resident_memory_mb() -> Option<f64> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn reports_positive_rss() {
        let mb = resident_memory_mb().expect("statm readable");
        assert!(mb > 0.0);
    }
}
