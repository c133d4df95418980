//! The request/response engine.
//!
//! Single-threaded and callback driven: the transport hands every received
//! frame to [`Engine::on_frame`], and the caller drives timeouts with
//! [`Engine::expire`]. Nothing here blocks or spawns.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use mspwire_frame::Frame;
use mspwire_schema::chunk::{self, Chunk};
use mspwire_schema::upload::{self, UploadKind};
use mspwire_schema::{messages, ApiVersion, FcState, FieldWriter, MspCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::{BatchScheduler, BatchState};
use crate::config::EngineConfig;
use crate::correlator::{Callback, Correlator, Entry, Response};
use crate::error::{EngineError, Result};
use crate::sink::FrameSink;

/// One outbound request.
///
/// Without a callback nothing is tracked: the reply is still decoded into
/// state, but no entry waits for it and no timeout applies.
pub struct Request {
    code: MspCode,
    payload: Bytes,
    response_code: Option<MspCode>,
    callback: Option<Callback>,
    callback_on_error: bool,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(code: MspCode) -> Self {
        Self {
            code,
            payload: Bytes::new(),
            response_code: None,
            callback: None,
            callback_on_error: false,
            timeout: None,
        }
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Wait for a reply carrying a different code than the request.
    pub fn expect(mut self, code: MspCode) -> Self {
        self.response_code = Some(code);
        self
    }

    pub fn on_response(mut self, callback: impl FnOnce(&Response<'_>, &FcState) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Also call back on checksum failures and timeouts.
    pub fn on_error(mut self, enabled: bool) -> Self {
        self.callback_on_error = enabled;
        self
    }

    /// Override [`EngineConfig::default_timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("code", &self.code)
            .field("payload", &self.payload)
            .field("response_code", &self.response_code)
            .field("callback", &self.callback.is_some())
            .field("callback_on_error", &self.callback_on_error)
            .field("timeout", &self.timeout)
            .finish()
    }
}

type CompleteFn = Box<dyn FnOnce(&FcState)>;

struct UploadRun {
    kind: UploadKind,
    code: MspCode,
    frames: Vec<Bytes>,
    next: usize,
    on_complete: Option<CompleteFn>,
}

/// Correlates requests with replies and keeps the flight controller state.
pub struct Engine<S> {
    sink: S,
    config: EngineConfig,
    state: FcState,
    correlator: Correlator,
    batch: BatchScheduler,
    uploads: Vec<UploadRun>,
    reboot_failed: Option<Box<dyn FnMut(&FcState)>>,
}

impl<S: FrameSink> Engine<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, EngineConfig::default())
    }

    pub fn with_config(sink: S, config: EngineConfig) -> Self {
        Self {
            sink,
            config,
            state: FcState::default(),
            correlator: Correlator::default(),
            batch: BatchScheduler::new(),
            uploads: Vec::new(),
            reboot_failed: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &FcState {
        &self.state
    }

    /// Edit state ahead of a SET request.
    pub fn state_mut(&mut self) -> &mut FcState {
        &mut self.state
    }

    /// JSON snapshot of one state domain.
    pub fn read_state(&self, domain: &str) -> Option<Value> {
        self.state.domain(domain)
    }

    pub fn api_version(&self) -> ApiVersion {
        self.state.api_version()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Called when the device refuses `MSP_SET_REBOOT` as unsupported.
    pub fn set_reboot_failed_hook(&mut self, hook: impl FnMut(&FcState) + 'static) {
        self.reboot_failed = Some(Box::new(hook));
    }

    /// Send a request and, if it has a callback, wait for its reply.
    pub fn send(&mut self, request: Request) -> Result<()> {
        self.sink.send_frame(request.code.value(), &request.payload)?;
        debug!(code = %request.code, len = request.payload.len(), "request sent");

        if let Some(callback) = request.callback {
            let deadline = self.deadline(request.timeout);
            self.correlator.register(Entry {
                code: request.response_code.unwrap_or(request.code),
                callback,
                on_error: request.callback_on_error,
                deadline,
            });
        }
        Ok(())
    }

    fn deadline(&self, timeout: Option<Duration>) -> Option<Instant> {
        timeout
            .or(self.config.default_timeout)
            .map(|t| Instant::now() + t)
    }

    /// Query `code` with an empty payload.
    pub fn request(
        &mut self,
        code: MspCode,
        callback: impl FnOnce(&Response<'_>, &FcState) + 'static,
    ) -> Result<()> {
        self.send(Request::new(code).on_response(callback))
    }

    /// Encode `code` from current state and send it.
    pub fn send_set(&mut self, code: MspCode, callback: Option<Callback>) -> Result<()> {
        let payload = messages::encode(code, &self.state).ok_or(EngineError::NoEncoder(code))?;
        let mut request = Request::new(code).payload(payload);
        request.callback = callback;
        self.send(request)
    }

    /// Queue codes for the next `MSP_MULTIPLE_MSP` request.
    pub fn queue_batch(&mut self, codes: &[MspCode]) -> Result<()> {
        if let Some(&code) = codes.iter().find(|code| !code.fits_v1()) {
            return Err(EngineError::NotBatchable(code));
        }
        self.batch.queue(codes.iter().copied());
        Ok(())
    }

    /// Send every queued code as one batch. Returns false when nothing was queued.
    ///
    /// The callback fires once the whole batch, including any follow-ups, is answered.
    pub fn send_batch(&mut self, callback: Option<Callback>) -> Result<bool> {
        let deadline = self.deadline(None);
        let Some(payload) = self.batch.take_request(deadline) else {
            return Ok(false);
        };
        let mut request = Request::new(MspCode::MultipleMsp).payload(payload);
        request.callback = callback;
        self.send(request)?;
        Ok(true)
    }

    pub fn batch_state(&self) -> BatchState {
        self.batch.state()
    }

    /// Request one dataflash chunk. `on_chunk` gets `None` when it must be requested again.
    pub fn read_chunk(
        &mut self,
        address: u32,
        block_size: u16,
        on_chunk: impl FnOnce(u32, Option<Chunk>) + 'static,
    ) -> Result<()> {
        let payload = chunk::request_payload(
            address,
            block_size,
            self.config.allow_compression,
            self.api_version(),
        );
        let table = self.config.huffman_table.clone();
        let request = Request::new(MspCode::DataflashRead)
            .payload(payload)
            .on_error(true)
            .on_response(move |response, state| {
                if response.crc_error || response.timed_out {
                    warn!(address, "dataflash chunk lost; retry needed");
                    on_chunk(address, None);
                    return;
                }
                let parsed = chunk::parse_response(response.data, address, state.api_version(), &table);
                on_chunk(address, parsed);
            });
        self.send(request)
    }

    /// Write a multi-item record one frame at a time, each after the previous acknowledgement.
    ///
    /// A checksum failure on an acknowledgement stalls the upload until [`Engine::reset`].
    pub fn upload(&mut self, kind: UploadKind, on_complete: impl FnOnce(&FcState) + 'static) -> Result<()> {
        let plan = upload::plan(kind, &self.state);
        let Some(first) = plan.frames.first() else {
            on_complete(&self.state);
            return Ok(());
        };

        if self.uploads.iter().any(|run| run.code == plan.code) {
            warn!(?kind, "replacing an upload already in progress");
            self.uploads.retain(|run| run.code != plan.code);
        }
        self.sink.send_frame(plan.code.value(), first)?;
        debug!(?kind, frames = plan.frames.len(), "upload started");
        self.uploads.push(UploadRun {
            kind,
            code: plan.code,
            frames: plan.frames,
            next: 1,
            on_complete: Some(Box::new(on_complete)),
        });
        Ok(())
    }

    /// `MSP_SET_RAW_RC` with one `u16` per channel; no reply is tracked.
    pub fn set_raw_rc(&mut self, channels: &[u16]) -> Result<()> {
        let mut w = FieldWriter::new();
        for &channel in channels {
            w.write_u16(channel);
        }
        self.send(Request::new(MspCode::SetRawRc).payload(w.into_bytes()))
    }

    /// Toggle the host arming block. Firmware before API 1.37 has none, and an
    /// unchanged request completes without traffic.
    pub fn set_arming_enabled(
        &mut self,
        enable: bool,
        disable_runaway_takeoff_prevention: bool,
        on_complete: impl FnOnce(&FcState) + 'static,
    ) -> Result<()> {
        let config = &self.state.config;
        let changed = config.arming_disabled == enable
            || config.runaway_takeoff_prevention_disabled != disable_runaway_takeoff_prevention;
        if self.api_version().less_than(ApiVersion::V1_37) || !changed {
            on_complete(&self.state);
            return Ok(());
        }

        self.state.config.arming_disabled = !enable;
        self.state.config.runaway_takeoff_prevention_disabled = disable_runaway_takeoff_prevention;
        self.send_set(
            MspCode::ArmingDisable,
            Some(Box::new(move |_: &Response<'_>, state: &FcState| on_complete(state))),
        )
    }

    fn serial_codes(&self) -> (MspCode, MspCode) {
        if self.api_version().at_least(ApiVersion::V1_43) {
            (MspCode::CommonSerialConfig, MspCode::CommonSetSerialConfig)
        } else {
            (MspCode::CfSerialConfig, MspCode::SetCfSerialConfig)
        }
    }

    /// Read serial port configuration with whichever code the firmware speaks.
    pub fn load_serial_config(&mut self, on_complete: impl FnOnce(&FcState) + 'static) -> Result<()> {
        let (query, _) = self.serial_codes();
        self.request(query, move |_, state| on_complete(state))
    }

    /// Write serial port configuration with whichever code the firmware speaks.
    pub fn send_serial_config(&mut self, on_complete: impl FnOnce(&FcState) + 'static) -> Result<()> {
        let (_, set) = self.serial_codes();
        self.send_set(
            set,
            Some(Box::new(move |_: &Response<'_>, state: &FcState| on_complete(state))),
        )
    }

    /// Outstanding callback entries.
    pub fn outstanding(&self) -> usize {
        self.correlator.len()
    }

    pub fn outstanding_for(&self, code: MspCode) -> usize {
        self.correlator.count(code)
    }

    /// Uploads still waiting on acknowledgements.
    pub fn uploads_in_progress(&self) -> Vec<UploadKind> {
        self.uploads.iter().map(|run| run.kind).collect()
    }

    /// Drop every entry and batch past its deadline. Error-aware callbacks are told it timed out.
    ///
    /// Returns the number of entries removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        self.batch.expire(now);
        let expired = self.correlator.take_expired(now);
        let count = expired.len();
        for entry in expired {
            warn!(code = %entry.code, "request timed out");
            let response = Response {
                code: entry.code,
                data: &[],
                crc_error: false,
                unsupported: false,
                timed_out: true,
            };
            entry.fire(&response, &self.state);
        }
        count
    }

    /// Forget everything tied to the current connection.
    pub fn reset(&mut self) {
        let dropped = self.correlator.len();
        self.correlator.clear();
        self.batch.clear();
        self.uploads.clear();
        self.state = FcState::default();
        debug!(dropped, "engine reset");
    }

    /// Ingress for every frame the transport receives.
    ///
    /// Only a malformed payload is an error; checksum failures, unknown and
    /// unsupported codes are reported through logs and callbacks.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<()> {
        let Some(code) = MspCode::from_value(frame.code) else {
            warn!(code = frame.code, "unknown message code");
            return Ok(());
        };
        let data = &frame.payload[..];

        if code == MspCode::MultipleMsp && (!frame.crc_valid || !frame.supported()) {
            self.batch.discard_oldest();
        }

        if !frame.crc_valid {
            if !self.correlator.wants_errors(code) {
                warn!(%code, "checksum failed; no error-aware request waiting, dropping");
            }
            self.finish(code, data, true, true);
            return Ok(());
        }

        if !frame.supported() {
            warn!(%code, "device reports code unsupported");
            if code == MspCode::SetReboot {
                if let Some(hook) = self.reboot_failed.as_mut() {
                    hook(&self.state);
                }
            }
            self.advance_upload(code)?;
            self.finish(code, data, false, false);
            return Ok(());
        }

        match code {
            MspCode::MultipleMsp => {
                if self.on_batch_reply(data)? {
                    // Callbacks wait for the follow-up.
                    return Ok(());
                }
            }
            MspCode::DataflashRead => {}
            _ => self.decode(code, data)?,
        }

        self.advance_upload(code)?;
        self.finish(code, data, false, true);
        Ok(())
    }

    fn decode(&mut self, code: MspCode, data: &[u8]) -> Result<()> {
        let decode_err = |source| EngineError::Decode { code, source };
        if self.config.strict_length {
            messages::decode(code, data, &mut self.state).map_err(decode_err)?;
        } else {
            let trailing =
                messages::decode_lenient(code, data, &mut self.state).map_err(decode_err)?;
            if trailing > 0 {
                warn!(%code, trailing, "reply longer than its schema");
            }
        }
        debug!(%code, len = data.len(), "decoded");
        Ok(())
    }

    /// Decode the answered sub-frames and send a follow-up for the rest.
    ///
    /// Returns true when a follow-up batch went out.
    fn on_batch_reply(&mut self, data: &[u8]) -> Result<bool> {
        let reply = self.batch.on_reply(data);
        for (code, body) in reply.answered {
            if let Err(err) = self.decode(code, body) {
                warn!(error = %err, "skipping malformed batch sub-frame");
            }
        }
        if reply.retry.is_empty() {
            return Ok(false);
        }

        debug!(remaining = reply.retry.len(), "batch under-delivered; sending follow-up");
        let deadline = self.deadline(None);
        let payload = self.batch.follow_up(reply.retry, deadline);
        self.sink.send_frame(MspCode::MultipleMsp.value(), &payload)?;
        self.correlator.rearm(MspCode::MultipleMsp, deadline);
        Ok(true)
    }

    fn advance_upload(&mut self, code: MspCode) -> Result<()> {
        let Some(index) = self.uploads.iter().position(|run| run.code == code) else {
            return Ok(());
        };

        let run = &mut self.uploads[index];
        if let Some(frame) = run.frames.get(run.next) {
            self.sink.send_frame(code.value(), frame)?;
            run.next += 1;
            return Ok(());
        }

        let mut run = self.uploads.remove(index);
        debug!(kind = ?run.kind, "upload complete");
        if let Some(on_complete) = run.on_complete.take() {
            on_complete(&self.state);
        }
        Ok(())
    }

    fn finish(&mut self, code: MspCode, data: &[u8], crc_error: bool, supported: bool) {
        let response = Response {
            code,
            data,
            crc_error,
            unsupported: !supported,
            timed_out: false,
        };
        for entry in self.correlator.take(code) {
            entry.fire(&response, &self.state);
        }
    }
}

impl<S> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("api_version", &self.state.api_version())
            .field("outstanding", &self.correlator.len())
            .field("batch", &self.batch)
            .field("uploads", &self.uploads.len())
            .finish_non_exhaustive()
    }
}
