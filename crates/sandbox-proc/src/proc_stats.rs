//! Best-effort usage sampling from `/proc/<pid>/stat`.

use sandbox::UsageSample;

/// Sample resident memory and CPU time for a live process.
///
/// Returns `None` when the stat file is gone (process already exited) or
/// does not parse.
pub(crate) fn sample(pid: u32) -> Option<UsageSample> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    parse_stat(&stat)
}

/// Parse the utime, stime, and rss fields out of a stat line.
///
/// The comm field (2) may contain spaces, so fields are counted from the
/// closing paren: state is post-paren index 0, making utime 11, stime 12,
/// and rss 21.
fn parse_stat(stat: &str) -> Option<UsageSample> {
    let (_, rest) = stat.rsplit_once(')')?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let rss_pages: u64 = fields.get(21)?.parse().ok()?;

    let clk_tck = sysconf_or(nix::unistd::SysconfVar::CLK_TCK, 100);
    let page_size = sysconf_or(nix::unistd::SysconfVar::PAGE_SIZE, 4096);

    Some(UsageSample {
        memory_mb: (rss_pages * page_size) as f64 / (1024.0 * 1024.0),
        cpu_secs: (utime + stime) as f64 / clk_tck as f64,
    })
}

fn sysconf_or(var: nix::unistd::SysconfVar, fallback: u64) -> u64 {
    match nix::unistd::sysconf(var) {
        Ok(Some(v)) if v > 0 => v as u64,
        _ => fallback,
    }
}
