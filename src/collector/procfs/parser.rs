//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of `/proc` files into
//! structured data. They are designed to be easily testable with string inputs.

use crate::collector::lifecycle::CollectError;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

/// CPU line from `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    /// `None` for the aggregate `cpu` line.
    pub cpu_id: Option<u32>,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Ticks spent idle or waiting for I/O.
    pub fn idle_ticks(&self) -> u64 {
        self.idle + self.iowait
    }

    /// All accounted ticks. Guest time is already part of `user`/`nice`.
    pub fn total_ticks(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }
}

/// Parsed data from `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct GlobalStat {
    pub cpus: Vec<CpuStat>,
    pub ctxt: u64,
    pub processes: u64,
    pub procs_running: u32,
    pub procs_blocked: u32,
}

impl GlobalStat {
    /// The aggregate `cpu` line, if present.
    pub fn total_cpu(&self) -> Option<&CpuStat> {
        self.cpus.iter().find(|c| c.cpu_id.is_none())
    }

    /// Per-core `cpuN` lines.
    pub fn per_cpu(&self) -> impl Iterator<Item = &CpuStat> {
        self.cpus.iter().filter(|c| c.cpu_id.is_some())
    }
}

/// Parses `/proc/stat` content.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if parts[0].starts_with("cpu") {
            let cpu_id = if parts[0] == "cpu" {
                None
            } else {
                Some(
                    parts[0]
                        .strip_prefix("cpu")
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| ParseError::new(format!("invalid cpu label '{}'", parts[0])))?,
                )
            };
            if parts.len() < 5 {
                return Err(ParseError::new(format!("truncated cpu line '{}'", line)));
            }

            let get_val =
                |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

            stat.cpus.push(CpuStat {
                cpu_id,
                user: get_val(1),
                nice: get_val(2),
                system: get_val(3),
                idle: get_val(4),
                iowait: get_val(5),
                irq: get_val(6),
                softirq: get_val(7),
                steal: get_val(8),
            });
        } else if parts[0] == "ctxt" {
            stat.ctxt = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "processes" {
            stat.processes = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "procs_running" {
            stat.procs_running = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "procs_blocked" {
            stat.procs_blocked = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        }
    }

    if stat.cpus.is_empty() {
        return Err(ParseError::new("no cpu lines in stat"));
    }

    Ok(stat)
}

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub running: u32,
    pub total: u32,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    // Format: running/total
    let (running, total) = if let Some((r, t)) = parts[3].split_once('/') {
        (r.parse().unwrap_or(0), t.parse().unwrap_or(0))
    } else {
        (0, 0)
    };

    Ok(LoadAvg {
        load1,
        load5,
        load15,
        running,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 5000 250 1500 40000 500 100 50 0 0 0
cpu1 5000 250 1500 40000 500 100 50 0 0 0
intr 1000000 50 0 0
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 1
";

    #[test]
    fn test_parse_global_stat() {
        let stat = parse_global_stat(STAT).unwrap();
        assert_eq!(stat.cpus.len(), 3);
        assert_eq!(stat.ctxt, 500000);
        assert_eq!(stat.processes, 10000);
        assert_eq!(stat.procs_running, 2);
        assert_eq!(stat.procs_blocked, 1);

        let total = stat.total_cpu().unwrap();
        assert_eq!(total.user, 10000);
        assert_eq!(total.total_ticks(), 94800);
        assert_eq!(total.idle_ticks(), 81000);

        let ids: Vec<_> = stat.per_cpu().map(|c| c.cpu_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_parse_global_stat_short_cpu_line() {
        // Old kernels report fewer columns.
        let stat = parse_global_stat("cpu 1 2 3 4\n").unwrap();
        assert_eq!(stat.cpus[0].iowait, 0);
        assert_eq!(stat.cpus[0].total_ticks(), 10);
    }

    #[test]
    fn test_parse_global_stat_errors() {
        assert!(parse_global_stat("").is_err());
        assert!(parse_global_stat("ctxt 5\n").is_err());
        assert!(parse_global_stat("cpu 1 2\n").is_err());
        assert!(parse_global_stat("cpuX 1 2 3 4\n").is_err());
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.15 0.10 0.05 1/150 1234\n").unwrap();
        assert_eq!(load.load1, 0.15);
        assert_eq!(load.load5, 0.10);
        assert_eq!(load.load15, 0.05);
        assert_eq!(load.running, 1);
        assert_eq!(load.total, 150);
    }

    #[test]
    fn test_parse_loadavg_errors() {
        assert!(parse_loadavg("0.15 0.10").is_err());
        assert!(parse_loadavg("x 0.10 0.05 1/150 1234").is_err());
    }

    #[test]
    fn test_parse_error_into_collect_error() {
        let err: CollectError = parse_loadavg("0.15 0.10").unwrap_err().into();
        assert!(matches!(err, CollectError::Parse(_)));
        assert!(err.to_string().starts_with("parse error: "));
    }
}
