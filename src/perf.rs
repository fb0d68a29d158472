// ==========================================
// Space Stowage - Operation timing
// ==========================================
// PerfGuard: one `perf` event per API operation (elapsed + SQL counts).
// SQL counting uses the rusqlite trace/profile hooks of the audit DB.
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default threshold above which an operation logs at warn.
pub const DEFAULT_SLOW_OP_MS: u64 = 200;

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);
static SLOW_OP_THRESHOLD_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_OP_MS);

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
    static SLOW_SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.trim().replace('\n', " ");
    if s.len() <= max_len {
        return s;
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &s[..cut])
}

/// Read `SPACE_STOWAGE_SLOW_OP_MS` (default 200).
pub fn configure_from_env() {
    let slow_ms = std::env::var("SPACE_STOWAGE_SLOW_OP_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_SLOW_OP_MS);
    SLOW_OP_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);
}

pub fn slow_op_threshold_ms() -> u64 {
    SLOW_OP_THRESHOLD_MS.load(Ordering::Relaxed)
}

/// Install statement trace/profile hooks (SQL count + slow SQL log).
///
/// Switches:
/// - on by default in debug builds, off in release
/// - `SPACE_STOWAGE_PERF_SQL=1` forces it on
/// - `SPACE_STOWAGE_SLOW_SQL_MS=50` sets the slow statement threshold (ms)
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var("SPACE_STOWAGE_PERF_SQL") {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };

    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("SPACE_STOWAGE_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(sql_trace_callback));
    conn.profile(Some(sql_profile_callback));
}

fn sql_trace_callback(_sql: &str) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if !active {
        return;
    }
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %truncate_sql(sql, 420),
            "slow sql"
        );
        let active = PERF_DEPTH.with(|d| d.get() > 0);
        if active {
            SLOW_SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
        }
    }
}

/// Timing guard, logs on drop.
///
/// ```ignore
/// let _perf = space_stowage::perf::PerfGuard::new("placement");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let sql_start = SQL_COUNT.with(|c| c.get());
        let slow_sql_start = SLOW_SQL_COUNT.with(|c| c.get());
        Self {
            op,
            start: Instant::now(),
            sql_start,
            slow_sql_start,
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start);
        let slow_sql_count = SLOW_SQL_COUNT
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_start);

        if elapsed_ms >= slow_op_threshold_ms() {
            tracing::warn!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                sql_count,
                slow_sql_count,
                "slow operation"
            );
        } else {
            tracing::info!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                sql_count,
                slow_sql_count,
                "done"
            );
        }

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
