use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// Issues `INV-<millis>` numbers that strictly increase, even when several
/// are requested within the same millisecond.
///
/// The counter lives in this process only. Two instances can hand out the
/// same number, and the `invoices_number_key` unique index then rejects the
/// second write. The service runs as a single instance.
#[derive(Debug, Default)]
pub struct InvoiceNumbers {
    last: AtomicI64,
}

impl InvoiceNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        self.next_after(now)
    }

    fn next_after(&self, now_ms: i64) -> String {
        let bump = |prev: i64| now_ms.max(prev + 1);
        // fetch_update only fails when the closure returns None
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| Some(bump(p)))
            .unwrap_or_else(|p| p);
        format!("INV-{}", bump(prev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc};

    fn millis(number: &str) -> i64 {
        number.trim_start_matches("INV-").parse().unwrap()
    }

    #[test]
    fn same_tick_still_increases() {
        let gen = InvoiceNumbers::new();
        let a = gen.next_after(1_700_000_000_000);
        let b = gen.next_after(1_700_000_000_000);
        let c = gen.next_after(1_700_000_000_000);
        assert_eq!(a, "INV-1700000000000");
        assert_eq!(b, "INV-1700000000001");
        assert_eq!(c, "INV-1700000000002");
    }

    #[test]
    fn clock_going_backwards_does_not_repeat() {
        let gen = InvoiceNumbers::new();
        let a = millis(&gen.next_after(5_000));
        let b = millis(&gen.next_after(4_000));
        assert!(b > a);
    }

    #[test]
    fn unique_across_threads() {
        let gen = Arc::new(InvoiceNumbers::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = gen.clone();
                std::thread::spawn(move || (0..250).map(|_| gen.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for n in h.join().unwrap() {
                assert!(seen.insert(n));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
