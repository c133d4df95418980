//! In-flight request callbacks keyed by message code.

use std::fmt;
use std::time::Instant;

use mspwire_schema::{FcState, MspCode};

/// What a callback is told about the reply it was waiting for.
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    pub code: MspCode,
    /// Raw reply payload; empty on timeout.
    pub data: &'a [u8],
    /// The reply failed its checksum and was not decoded.
    pub crc_error: bool,
    /// The device answered that it does not support the code.
    pub unsupported: bool,
    /// No reply arrived before the deadline.
    pub timed_out: bool,
}

impl Response<'_> {
    /// True when the reply was received intact and decoded.
    pub fn is_ok(&self) -> bool {
        !self.crc_error && !self.timed_out && !self.unsupported
    }
}

pub type Callback = Box<dyn FnOnce(&Response<'_>, &FcState)>;

pub(crate) struct Entry {
    pub(crate) code: MspCode,
    pub(crate) callback: Callback,
    pub(crate) on_error: bool,
    pub(crate) deadline: Option<Instant>,
}

impl Entry {
    /// Invoke the callback if this reply is one it asked to see.
    pub(crate) fn fire(self, response: &Response<'_>, state: &FcState) {
        let failed = response.crc_error || response.timed_out;
        if !failed || self.on_error {
            (self.callback)(response, state);
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("code", &self.code)
            .field("on_error", &self.on_error)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Correlator {
    entries: Vec<Entry>,
}

impl Correlator {
    pub(crate) fn register(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Remove every entry for `code`, newest first.
    pub(crate) fn take(&mut self, code: MspCode) -> Vec<Entry> {
        self.remove_where(|entry| entry.code == code)
    }

    /// Remove every entry whose deadline is at or before `now`, newest first.
    pub(crate) fn take_expired(&mut self, now: Instant) -> Vec<Entry> {
        self.remove_where(|entry| entry.deadline.is_some_and(|deadline| deadline <= now))
    }

    /// Whether any entry for `code` wants to hear about failed replies.
    pub(crate) fn wants_errors(&self, code: MspCode) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.code == code && entry.on_error)
    }

    /// Push every deadline for `code` out to `deadline`.
    pub(crate) fn rearm(&mut self, code: MspCode, deadline: Option<Instant>) {
        for entry in self.entries.iter_mut().filter(|entry| entry.code == code) {
            entry.deadline = deadline;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count(&self, code: MspCode) -> usize {
        self.entries.iter().filter(|entry| entry.code == code).count()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn remove_where(&mut self, matches: impl Fn(&Entry) -> bool) -> Vec<Entry> {
        let mut removed = Vec::new();
        for index in (0..self.entries.len()).rev() {
            if matches(&self.entries[index]) {
                removed.push(self.entries.remove(index));
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn entry(code: MspCode, log: &Rc<RefCell<Vec<usize>>>, tag: usize, on_error: bool) -> Entry {
        let log = Rc::clone(log);
        Entry {
            code,
            callback: Box::new(move |_, _| log.borrow_mut().push(tag)),
            on_error,
            deadline: None,
        }
    }

    fn response(code: MspCode, crc_error: bool) -> Response<'static> {
        Response {
            code,
            data: &[],
            crc_error,
            unsupported: false,
            timed_out: false,
        }
    }

    #[test]
    fn take_removes_all_matches_newest_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut correlator = Correlator::default();
        correlator.register(entry(MspCode::Status, &log, 1, false));
        correlator.register(entry(MspCode::RawImu, &log, 2, false));
        correlator.register(entry(MspCode::Status, &log, 3, false));

        let taken = correlator.take(MspCode::Status);
        assert_eq!(taken.len(), 2);
        assert_eq!(correlator.len(), 1);

        let state = FcState::default();
        for e in taken {
            e.fire(&response(MspCode::Status, false), &state);
        }
        assert_eq!(*log.borrow(), vec![3, 1]);
    }

    #[test]
    fn crc_errors_reach_only_error_aware_entries() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let state = FcState::default();
        entry(MspCode::Pid, &log, 1, false).fire(&response(MspCode::Pid, true), &state);
        entry(MspCode::Pid, &log, 2, true).fire(&response(MspCode::Pid, true), &state);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn expiry_uses_deadline() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let now = Instant::now();
        let mut correlator = Correlator::default();

        let mut soon = entry(MspCode::Attitude, &log, 1, true);
        soon.deadline = Some(now);
        let mut later = entry(MspCode::Attitude, &log, 2, true);
        later.deadline = Some(now + Duration::from_secs(5));
        correlator.register(soon);
        correlator.register(later);
        correlator.register(entry(MspCode::Attitude, &log, 3, true));

        assert_eq!(correlator.take_expired(now).len(), 1);
        assert_eq!(correlator.count(MspCode::Attitude), 2);
        assert!(correlator.wants_errors(MspCode::Attitude));

        correlator.rearm(MspCode::Attitude, Some(now));
        assert_eq!(correlator.take_expired(now).len(), 2);
        assert_eq!(correlator.len(), 0);
    }
}
