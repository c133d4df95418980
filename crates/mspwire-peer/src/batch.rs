//! `MSP_MULTIPLE_MSP`: several query codes answered in one round trip.
//!
//! The request payload is one byte per code. The reply is a run of
//! `len:u8 payload` sub-frames in request order; a zero length means the
//! device ran out of room and declined that code this round.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use mspwire_schema::{FieldReader, MspCode};
use tracing::{debug, warn};

/// Where the scheduler stands between `queue` and the final reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Nothing queued, nothing awaited.
    Idle,
    /// Codes queued but not yet sent.
    Filling,
    /// At least one batch request awaits its reply.
    Sent,
}

/// Sub-frames recovered from one reply.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReply<'a> {
    /// Answered codes with their payloads, in request order.
    pub answered: Vec<(MspCode, &'a [u8])>,
    /// Declined and unreached codes, in request order, to send again.
    pub retry: Vec<MspCode>,
}

#[derive(Debug)]
struct InFlight {
    codes: Vec<MspCode>,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct BatchScheduler {
    queue: Vec<MspCode>,
    in_flight: VecDeque<InFlight>,
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append codes to the next batch.
    pub fn queue(&mut self, codes: impl IntoIterator<Item = MspCode>) {
        self.queue.extend(codes);
    }

    pub fn state(&self) -> BatchState {
        if !self.in_flight.is_empty() {
            BatchState::Sent
        } else if !self.queue.is_empty() {
            BatchState::Filling
        } else {
            BatchState::Idle
        }
    }

    /// Codes queued for the next batch.
    pub fn queued(&self) -> &[MspCode] {
        &self.queue
    }

    /// Drain the queue into a request payload, or `None` if nothing is queued.
    ///
    /// A batch still unanswered at `deadline` is given up by [`BatchScheduler::expire`].
    pub fn take_request(&mut self, deadline: Option<Instant>) -> Option<Bytes> {
        if self.queue.is_empty() {
            return None;
        }
        let codes = std::mem::take(&mut self.queue);
        Some(self.dispatch(codes, deadline))
    }

    /// Payload for a follow-up batch of codes the last reply did not answer.
    pub fn follow_up(&mut self, codes: Vec<MspCode>, deadline: Option<Instant>) -> Bytes {
        self.dispatch(codes, deadline)
    }

    fn dispatch(&mut self, codes: Vec<MspCode>, deadline: Option<Instant>) -> Bytes {
        let payload: Vec<u8> = codes.iter().map(|code| code.value() as u8).collect();
        debug!(count = codes.len(), "batch request");
        self.in_flight.push_back(InFlight { codes, deadline });
        Bytes::from(payload)
    }

    /// Give up on the oldest batch; its reply was lost or rejected.
    ///
    /// Returns the codes it carried so the caller may queue them again.
    pub fn discard_oldest(&mut self) -> Option<Vec<MspCode>> {
        let dropped = self.in_flight.pop_front()?;
        warn!(count = dropped.codes.len(), "batch reply lost; releasing its slot");
        Some(dropped.codes)
    }

    /// Give up on every batch whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.in_flight.len();
        self.in_flight
            .retain(|batch| batch.deadline.is_none_or(|deadline| deadline > now));
        let expired = before - self.in_flight.len();
        if expired > 0 {
            warn!(expired, "batch request timed out");
        }
        expired
    }

    /// Walk a reply against the oldest batch still awaiting one.
    ///
    /// A reply that answers nothing abandons its batch rather than retrying it.
    /// That includes a reply whose sub-frames are all zero-length: every code
    /// was declined, and asking again would only repeat the exchange.
    pub fn on_reply<'a>(&mut self, payload: &'a [u8]) -> BatchReply<'a> {
        let Some(awaiting) = self.in_flight.pop_front() else {
            warn!(len = payload.len(), "batch reply with no batch awaiting");
            return BatchReply::default();
        };

        let mut reply = BatchReply::default();
        let mut codes = awaiting.codes.into_iter();
        let mut r = FieldReader::new(payload);

        while r.remaining() > 0 {
            let Some(code) = codes.next() else {
                warn!(extra = r.remaining(), "batch reply has more sub-frames than requested codes");
                break;
            };
            let body = r.read_u8().and_then(|len| r.read_bytes(len as usize));
            match body {
                Ok([]) => reply.retry.push(code),
                Ok(body) => reply.answered.push((code, body)),
                Err(err) => {
                    warn!(%code, error = %err, "batch sub-frame truncated");
                    reply.retry.push(code);
                    break;
                }
            }
        }
        reply.retry.extend(codes);

        if reply.answered.is_empty() {
            if !reply.retry.is_empty() {
                warn!(abandoned = reply.retry.len(), "batch reply answered nothing; abandoning");
            }
            reply.retry.clear();
        }
        reply
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sub(body: &[u8]) -> Vec<u8> {
        let mut out = vec![body.len() as u8];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn request_is_one_byte_per_code() {
        let mut batch = BatchScheduler::new();
        assert_eq!(batch.state(), BatchState::Idle);
        batch.queue([MspCode::Status, MspCode::RawImu, MspCode::Attitude]);
        assert_eq!(batch.state(), BatchState::Filling);

        let payload = batch.take_request(None).unwrap();
        assert_eq!(&payload[..], &[101, 102, 108]);
        assert_eq!(batch.state(), BatchState::Sent);
        assert!(batch.take_request(None).is_none());
    }

    #[test]
    fn unreached_codes_are_retried_in_order() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog, MspCode::Rc, MspCode::Attitude]);
        batch.take_request(None);

        let mut payload = sub(&[1, 2]);
        payload.extend(sub(&[3]));
        let reply = batch.on_reply(&payload);

        assert_eq!(
            reply.answered,
            vec![(MspCode::Analog, &[1u8, 2][..]), (MspCode::Rc, &[3u8][..])]
        );
        assert_eq!(reply.retry, vec![MspCode::Attitude]);
        assert_eq!(batch.state(), BatchState::Idle);
    }

    #[test]
    fn declined_codes_keep_their_place() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog, MspCode::Rc, MspCode::Attitude, MspCode::Altitude]);
        batch.take_request(None);

        let mut payload = sub(&[1]);
        payload.extend(sub(&[]));
        let reply = batch.on_reply(&payload);
        assert_eq!(reply.answered.len(), 1);
        assert_eq!(
            reply.retry,
            vec![MspCode::Rc, MspCode::Attitude, MspCode::Altitude]
        );
    }

    #[test]
    fn empty_answer_abandons_the_batch() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog, MspCode::Rc]);
        batch.take_request(None);

        let reply = batch.on_reply(&[0, 0]);
        assert!(reply.answered.is_empty());
        assert!(reply.retry.is_empty());
        assert_eq!(batch.state(), BatchState::Idle);
    }

    #[test]
    fn stray_sub_frames_are_ignored() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog]);
        batch.take_request(None);

        let mut payload = sub(&[9]);
        payload.extend(sub(&[8]));
        let reply = batch.on_reply(&payload);
        assert_eq!(reply.answered.len(), 1);
        assert!(reply.retry.is_empty());

        assert_eq!(batch.on_reply(&payload), BatchReply::default());
    }

    #[test]
    fn replies_pair_with_batches_in_send_order() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog]);
        batch.take_request(None);
        batch.queue([MspCode::Rc]);
        batch.take_request(None);

        assert_eq!(batch.on_reply(&sub(&[1])).answered[0].0, MspCode::Analog);
        assert_eq!(batch.on_reply(&sub(&[2])).answered[0].0, MspCode::Rc);
    }

    #[test]
    fn discarding_a_lost_batch_keeps_later_replies_aligned() {
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::LoopTime]);
        batch.take_request(None);
        batch.queue([MspCode::PidController]);
        batch.take_request(None);

        assert_eq!(batch.discard_oldest(), Some(vec![MspCode::LoopTime]));
        let frame = sub(&[3]);
        let reply = batch.on_reply(&frame);
        assert_eq!(reply.answered, vec![(MspCode::PidController, &[3u8][..])]);
        assert_eq!(batch.state(), BatchState::Idle);
        assert_eq!(batch.discard_oldest(), None);
    }

    #[test]
    fn expired_batches_release_their_slot() {
        let now = Instant::now();
        let mut batch = BatchScheduler::new();
        batch.queue([MspCode::Analog]);
        batch.take_request(Some(now));
        batch.queue([MspCode::Rc]);
        batch.take_request(Some(now + Duration::from_secs(5)));
        batch.queue([MspCode::Attitude]);
        batch.take_request(None);

        assert_eq!(batch.expire(now), 1);
        assert_eq!(batch.on_reply(&sub(&[2])).answered[0].0, MspCode::Rc);
        assert_eq!(batch.expire(now + Duration::from_secs(60)), 0);
        assert_eq!(batch.state(), BatchState::Sent);
    }
}
