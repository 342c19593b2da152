//! Event sinks
//!
//! A sink receives schema-checked records in emission order. Transport,
//! buffering and persistence of the stream belong to the sink's owner.

use crate::events::EventRecord;
use std::io::{self, Write};

/// Log target used by [`LogSink`]
pub const EVENT_LOG_TARGET: &str = "token_ledger::events";

/// Destination for emitted events
pub trait EventSink {
    fn publish(&mut self, record: &EventRecord);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, record: &EventRecord) {
        (**self).publish(record)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, record: &EventRecord) {
        (**self).publish(record)
    }
}

/// Collects records in memory
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Vec<EventRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Most recent record
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Drain all collected records
    pub fn take(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, record: &EventRecord) {
        self.records.push(record.clone());
    }
}

/// Forwards each record as a JSON line through the `log` facade
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&mut self, record: &EventRecord) {
        match record.to_json() {
            Ok(line) => log::info!(target: EVENT_LOG_TARGET, "{}", line),
            Err(e) => log::error!(target: EVENT_LOG_TARGET, "Failed to encode {} event: {}", record.event, e),
        }
    }
}

/// Prints each record as a JSON line on stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn publish(&mut self, record: &EventRecord) {
        let stdout = io::stdout();
        if let Err(e) = write_line(&mut stdout.lock(), record) {
            log::error!("Failed to write {} event: {}", record.event, e);
        }
    }
}

/// Write `record` to `out` as one JSON line
pub fn write_line<W: Write>(out: &mut W, record: &EventRecord) -> io::Result<()> {
    let line = record.to_json()?;
    writeln!(out, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventRegistry, FieldValue};
    use std::collections::BTreeMap;
    use std::sync::{Mutex, Once};

    static CAPTURED: Mutex<Vec<(String, log::Level, String)>> = Mutex::new(Vec::new());

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            CAPTURED.lock().unwrap().push((
                record.target().to_string(),
                record.level(),
                record.args().to_string(),
            ));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    fn capture_logs() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
    }

    fn sample(registry: &mut EventRegistry, amount: i128) -> EventRecord {
        let handle = registry.register("mint", ["amount"]);
        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), FieldValue::Amount(amount));
        registry.record(&handle, fields).unwrap()
    }

    #[test]
    fn test_memory_sink_preserves_order() {
        let mut registry = EventRegistry::new();
        let mut sink = MemorySink::new();

        for amount in 1..=3 {
            let record = sample(&mut registry, amount);
            sink.publish(&record);
        }

        let amounts: Vec<_> = sink
            .records()
            .iter()
            .filter_map(|r| r.amount("amount"))
            .collect();
        assert_eq!(amounts, vec![1, 2, 3]);
        assert_eq!(sink.take().len(), 3);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_borrowed_sink() {
        let mut registry = EventRegistry::new();
        let mut inner = MemorySink::new();

        fn forward<S: EventSink>(mut sink: S, record: &EventRecord) {
            sink.publish(record);
        }
        forward(&mut inner, &sample(&mut registry, 5));

        let mut boxed: Box<dyn EventSink> = Box::new(MemorySink::new());
        boxed.publish(&sample(&mut registry, 6));

        assert_eq!(inner.len(), 1);
        assert_eq!(inner.last().and_then(|r| r.amount("amount")), Some(5));
    }

    #[test]
    fn test_log_sink_forwards_json_line() {
        capture_logs();
        let mut registry = EventRegistry::new();
        let record = sample(&mut registry, 424_242);

        let mut sink: Box<dyn EventSink> = Box::new(LogSink);
        sink.publish(&record);

        let captured = CAPTURED.lock().unwrap();
        let lines: Vec<_> = captured
            .iter()
            .filter(|(_, _, message)| message.contains("424242"))
            .collect();
        assert_eq!(lines.len(), 1);

        let (target, level, message) = lines[0];
        assert_eq!(target, EVENT_LOG_TARGET);
        assert_eq!(*level, log::Level::Info);
        let json: serde_json::Value = serde_json::from_str(message).unwrap();
        assert_eq!(json["event"], "mint");
        assert_eq!(json["amount"], 424_242);
    }

    #[test]
    fn test_write_line() {
        let mut registry = EventRegistry::new();
        let mut out = Vec::new();

        write_line(&mut out, &sample(&mut registry, 1)).unwrap();
        write_line(&mut out, &sample(&mut registry, 2)).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "mint");
        assert_eq!(first["amount"], 1);
        assert!(first["ts"].is_string());
    }
}
