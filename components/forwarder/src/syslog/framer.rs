//! Syslog Framer
//!
//! Turns a raw stdin line into the bytes written to the network sink when
//! Syslog mode is on:
//!
//! ```text
//! <22>1 2016-06-18T09:56:21Z sendername programname - - - the log message\n
//! ```
//!
//! Two modes, selected by [`SyslogConfig::attach_header_per_line`]:
//! - header per line: every line gets a freshly stamped RFC-5424 header. The
//!   accumulation buffer is not touched.
//! - no header: the line is appended to the accumulation buffer and the
//!   *whole* buffer is the payload. The buffer is only cleared by
//!   [`SyslogFramer::commit`] after a successful write, so a write that never
//!   happens leaves its line in the buffer to be re-sent with the next one.

// Local crates
use crate::helpers::load_config::SyslogConfig;

// External crates
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};

/// RFC-5424 VERSION field.
const SYSLOG_VERSION: u8 = 1;
/// PROCID, MSGID and STRUCTURED-DATA are always NILVALUE.
const NIL_FIELDS: &str = "- - -";

/// Build the RFC-5424 header (including the trailing space) for `now`.
pub fn header(config: &SyslogConfig, now: DateTime<Utc>) -> String {
    format!(
        "<{}>{} {} {} {} {} ",
        config.priority,
        SYSLOG_VERSION,
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        config.hostname,
        config.app_name,
        NIL_FIELDS,
    )
}

/// Frame one line. `buffer` is the accumulation buffer carried between calls.
pub fn frame(
    config: &SyslogConfig,
    buffer: &mut BytesMut,
    line: &[u8],
    now: DateTime<Utc>,
) -> Bytes {
    if config.attach_header_per_line {
        let header = header(config, now);
        let mut out = BytesMut::with_capacity(header.len() + line.len());
        out.put_slice(header.as_bytes());
        out.put_slice(line);
        return out.freeze();
    }

    buffer.put_slice(line);
    Bytes::copy_from_slice(&buffer[..])
}

/// Per-connection framer state, owned by the network sink task.
#[derive(Debug)]
pub struct SyslogFramer {
    config: SyslogConfig,
    buffer: BytesMut,
}

impl SyslogFramer {
    pub fn new(config: SyslogConfig) -> Self {
        Self {
            config,
            buffer: BytesMut::new(),
        }
    }

    /// Frame `line`, stamping the header with the current UTC time.
    pub fn frame(&mut self, line: &[u8]) -> Bytes {
        self.frame_at(line, Utc::now())
    }

    pub fn frame_at(&mut self, line: &[u8], now: DateTime<Utc>) -> Bytes {
        frame(&self.config, &mut self.buffer, line, now)
    }

    /// Reset the accumulation buffer. Called after every successful write.
    pub fn commit(&mut self) {
        self.buffer.clear();
    }

    /// Bytes currently held in the accumulation buffer.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(attach: bool) -> SyslogConfig {
        SyslogConfig {
            hostname: "sendername".into(),
            app_name: "programname".into(),
            priority: 22,
            attach_header_per_line: attach,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, 18, 9, 56, 21).unwrap()
    }

    #[test]
    fn header_matches_rfc5424_layout() {
        assert_eq!(
            header(&config(true), fixed_time()),
            "<22>1 2016-06-18T09:56:21Z sendername programname - - - "
        );
    }

    #[test]
    fn attach_mode_prefixes_every_line() {
        let mut framer = SyslogFramer::new(config(true));

        let first = framer.frame_at(b"the log message\n", fixed_time());
        assert_eq!(
            &first[..],
            b"<22>1 2016-06-18T09:56:21Z sendername programname - - - the log message\n"
        );

        // No commit in between: header mode never accumulates.
        let second = framer.frame_at(b"next\n", fixed_time());
        assert_eq!(
            &second[..],
            b"<22>1 2016-06-18T09:56:21Z sendername programname - - - next\n"
        );
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn priority_is_carried_verbatim() {
        let mut cfg = config(true);
        cfg.priority = 9999;
        assert!(header(&cfg, fixed_time()).starts_with("<9999>1 "));
        cfg.priority = -3;
        assert!(header(&cfg, fixed_time()).starts_with("<-3>1 "));
    }

    #[test]
    fn buffer_mode_resets_after_each_commit() {
        let mut framer = SyslogFramer::new(config(false));

        let a = framer.frame(b"a\n");
        assert_eq!(&a[..], b"a\n");
        framer.commit();

        let b = framer.frame(b"b\n");
        assert_eq!(&b[..], b"b\n");
        framer.commit();
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn buffer_mode_resends_uncommitted_lines() {
        let mut framer = SyslogFramer::new(config(false));

        let _ = framer.frame(b"a\n");
        // write of "a\n" skipped, nothing committed
        let both = framer.frame(b"b\n");
        assert_eq!(&both[..], b"a\nb\n");
    }

    #[test]
    fn timestamp_is_utc_seconds() {
        let mut framer = SyslogFramer::new(config(true));
        let out = framer.frame(b"x\n");
        let text = std::str::from_utf8(&out).unwrap();
        let stamp = text.split(' ').nth(1).unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
