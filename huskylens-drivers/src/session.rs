//! HuskyLens session
//!
//! A session owns one transport and one delay provider. Every public
//! operation runs a complete request/response cycle before returning:
//!
//! ```text
//! request ─► encode ─► discard stale ─► write ─► settle ─► poll/decode ─► check reply
//!                                                             ▲               │
//!                                                             └── retry once ◄┘
//! ```
//!
//! The hardware revision is learned by the first successful probe and kept
//! for the life of the session.

use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use log::{debug, trace, warn};

use huskylens_core::record::{Arrow, Block, MAX_RECORDS};
use huskylens_core::{
    decode_record, record_count, DecodeError, Detections, RecordFilter, SessionConfig,
    SessionEvent, SessionState,
};
use huskylens_hal::Transport;
use huskylens_protocol::commands::MAX_MULTI_ALGORITHMS;
use huskylens_protocol::{decode_frame, Algorithm, Color, Frame, HardwareRevision, Request};

use crate::error::Error;
use crate::link::LinkSource;

/// Maximum stored length of the firmware version string
pub const MAX_VERSION_LEN: usize = 32;

/// Firmware version text reported by V1 hardware
pub type FirmwareVersion = String<MAX_VERSION_LEN>;

/// Algorithm a fresh session assumes is active
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::ObjectRecognition;

/// Revisions tried, in order, on a link that does not fix the revision
const SERIAL_PROBE_ORDER: [HardwareRevision; 2] = [HardwareRevision::V2, HardwareRevision::V1];

/// Driver session for one HuskyLens sensor
///
/// Not safe to share: at most one request may be in flight, which `&mut
/// self` on every operation already enforces.
pub struct HuskyLens<T, D> {
    link: T,
    delay: D,
    config: SessionConfig,
    state: SessionState,
    /// Revision seen by the first successful probe
    revision: Option<HardwareRevision>,
    algorithms: Vec<Algorithm, MAX_MULTI_ALGORITHMS>,
}

impl<T, D> HuskyLens<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Create a session over an open transport
    ///
    /// Nothing is sent until the first operation.
    pub fn new(link: T, delay: D, config: SessionConfig) -> Self {
        let mut algorithms = Vec::new();
        let _ = algorithms.push(DEFAULT_ALGORITHM);
        Self {
            link,
            delay,
            config,
            state: SessionState::Unprobed,
            revision: None,
            algorithms,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Revision of a probed session
    pub fn revision(&self) -> Option<HardwareRevision> {
        self.revision
    }

    /// Algorithms believed active on the sensor
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Log raw frame bytes at trace level
    pub fn set_trace(&mut self, trace: bool) {
        self.config.trace = trace;
    }

    /// End the session, giving back the transport and delay
    pub fn release(self) -> (T, D) {
        (self.link, self.delay)
    }

    /// Probe the sensor
    ///
    /// On success the session is ready and the revision is known. On
    /// failure the session is left `Failed`; the next operation probes
    /// again.
    pub fn knock(&mut self) -> Result<HardwareRevision, Error> {
        self.apply(SessionEvent::ProbeStarted);

        let result = match self.revision.or(self.link.revision()) {
            Some(revision) => self.probe(revision),
            None => self.probe_any(),
        };

        match result {
            Ok(revision) => {
                self.revision = Some(revision);
                self.apply(SessionEvent::ProbeAnswered(revision));
                Ok(revision)
            }
            Err(e) => {
                self.apply(SessionEvent::ProbeFailed);
                Err(e)
            }
        }
    }

    /// Switch the sensor to a single algorithm
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        if !algorithm.supported_on(revision) {
            return Err(Error::UnsupportedOnRevision);
        }
        if revision == HardwareRevision::V2 && self.algorithms.as_slice() == [algorithm] {
            debug!("huskylens: {:?} already active", algorithm);
            return Ok(());
        }

        self.exchange(revision, &Request::SetAlgorithm(algorithm))?;
        self.algorithms.clear();
        let _ = self.algorithms.push(algorithm);
        debug!("huskylens: algorithm set to {:?}", algorithm);
        Ok(())
    }

    /// Run 2 to 5 algorithms at once (V2)
    pub fn set_multi_algorithm(&mut self, algorithms: &[Algorithm]) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        // Encoding rejects V1 and out-of-range counts
        self.exchange(revision, &Request::SetMultiAlgorithm(algorithms))?;
        self.algorithms.clear();
        for &algorithm in algorithms {
            let _ = self.algorithms.push(algorithm);
        }
        debug!("huskylens: algorithms set to {:?}", algorithms);
        Ok(())
    }

    /// Firmware version string (V1)
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, Error> {
        let revision = self.ensure_ready()?;
        let reply = self.exchange(revision, &Request::FirmwareVersion)?;
        let text = core::str::from_utf8(&reply.payload).map_err(|_| DecodeError::InvalidUtf8)?;

        let mut end = text.len().min(MAX_VERSION_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut version = FirmwareVersion::new();
        let _ = version.push_str(&text[..end]);
        Ok(version)
    }

    /// Fetch every current detection matching `filter`, in sensor order
    ///
    /// Without an algorithm in the filter, every active algorithm is
    /// queried (V2 multi-algorithm mode) or the single active one.
    pub fn query(&mut self, filter: RecordFilter) -> Result<Detections, Error> {
        let revision = self.ensure_ready()?;

        let mut targets: Vec<Algorithm, MAX_MULTI_ALGORITHMS> = Vec::new();
        match (revision, filter.algorithm) {
            (HardwareRevision::V2, Some(algorithm)) => {
                let _ = targets.push(algorithm);
            }
            (HardwareRevision::V2, None) => targets.clone_from(&self.algorithms),
            // V1 always answers for whatever runs on the sensor
            (HardwareRevision::V1, _) => {
                let _ = targets.push(self.algorithms.first().copied().unwrap_or(DEFAULT_ALGORITHM));
            }
        }

        let mut all = Detections::new();
        for algorithm in targets {
            let request = Request::Query {
                algorithm,
                scope: filter.scope(),
            };
            let found = self.with_retry(|lens| lens.fetch(revision, &request, algorithm))?;
            for record in found {
                if all.push(record).is_err() {
                    warn!("huskylens: more than {} records, extra dropped", MAX_RECORDS);
                    break;
                }
            }
        }

        Ok(filter.apply(&all))
    }

    /// Plain blocks matching `filter`
    pub fn blocks(&mut self, filter: RecordFilter) -> Result<Vec<Block, MAX_RECORDS>, Error> {
        let detections = self.query(filter)?;
        Ok(detections.blocks().cloned().collect())
    }

    /// Arrows matching `filter`
    pub fn arrows(&mut self, filter: RecordFilter) -> Result<Vec<Arrow, MAX_RECORDS>, Error> {
        let detections = self.query(filter)?;
        Ok(detections.arrows().copied().collect())
    }

    /// Show text on the sensor screen
    ///
    /// `color` is ignored by V1 hardware.
    pub fn draw_text(&mut self, text: &str, x: u16, y: u16, color: Color) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        self.exchange(revision, &Request::DrawText { text, x, y, color })?;
        Ok(())
    }

    pub fn clear_text(&mut self) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        self.exchange(revision, &Request::ClearText)?;
        Ok(())
    }

    /// Draw a rectangle outline (V2)
    pub fn draw_rect(
        &mut self,
        x1: i16,
        y1: i16,
        x2: i16,
        y2: i16,
        color: Color,
    ) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        self.exchange(revision, &Request::DrawRect { x1, y1, x2, y2, color })?;
        Ok(())
    }

    /// Remove all rectangles (V2)
    pub fn clear_rect(&mut self) -> Result<(), Error> {
        let revision = self.ensure_ready()?;
        self.exchange(revision, &Request::ClearRect)?;
        Ok(())
    }

    fn apply(&mut self, event: SessionEvent) {
        let next = self.state.transition(event);
        if next != self.state {
            debug!("huskylens: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Revision of a ready session, probing first if needed
    fn ensure_ready(&mut self) -> Result<HardwareRevision, Error> {
        match self.state {
            SessionState::Ready(revision) => Ok(revision),
            _ => self.knock(),
        }
    }

    fn probe_any(&mut self) -> Result<HardwareRevision, Error> {
        let mut last = Error::NotConnected;
        for revision in SERIAL_PROBE_ORDER {
            match self.probe(revision) {
                Ok(revision) => return Ok(revision),
                Err(e @ Error::LinkUnavailable(_)) => return Err(e),
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    /// Send probes in `revision` framing until any valid frame answers
    fn probe(&mut self, revision: HardwareRevision) -> Result<HardwareRevision, Error> {
        let policy = self.config.knock_policy(revision);
        let frame = Request::Knock.to_frame(revision)?;
        let ack = Request::Knock.reply_code(revision);

        for attempt in 1..=policy.attempts {
            match self.send(revision, &frame).and_then(|_| self.receive(revision)) {
                Ok(reply) => {
                    if reply.command != ack {
                        debug!(
                            "huskylens: probe answered with {:#04x}, expected {:#04x}",
                            reply.command, ack
                        );
                    }
                    debug!("huskylens: {:?} answered probe {}", revision, attempt);
                    return Ok(revision);
                }
                Err(e @ Error::LinkUnavailable(_)) => return Err(e),
                Err(e) => {
                    debug!("huskylens: {:?} probe {} failed: {}", revision, attempt, e);
                    self.delay.delay_ms(policy.retry_delay_ms);
                }
            }
        }
        Err(Error::NotConnected)
    }

    /// Run `op`, repeating it on retryable errors up to the configured count
    fn with_retry<R>(
        &mut self,
        mut op: impl FnMut(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut retries = 0;
        loop {
            match op(self) {
                Err(e) if e.is_retryable() && retries < self.config.exchange_retries => {
                    retries += 1;
                    warn!("huskylens: {}, retrying ({})", e, retries);
                }
                result => return result,
            }
        }
    }

    /// One request answered by one frame with the expected command code
    fn exchange(&mut self, revision: HardwareRevision, request: &Request<'_>) -> Result<Frame, Error> {
        let frame = request.to_frame(revision)?;
        let expected = request.reply_code(revision);
        self.with_retry(|lens| {
            lens.send(revision, &frame)?;
            let reply = lens.receive(revision)?;
            if reply.command != expected {
                return Err(Error::UnexpectedReply {
                    expected,
                    actual: reply.command,
                });
            }
            Ok(reply)
        })
    }

    /// Info frame plus the record frames it announces
    fn fetch(
        &mut self,
        revision: HardwareRevision,
        request: &Request<'_>,
        algorithm: Algorithm,
    ) -> Result<Detections, Error> {
        let frame = request.to_frame(revision)?;
        let expected = request.reply_code(revision);
        self.send(revision, &frame)?;
        if revision == HardwareRevision::V2 {
            self.delay.delay_ms(self.config.first_result_delay_ms);
        }

        let info = self.receive(revision)?;
        if info.command != expected {
            return Err(Error::UnexpectedReply {
                expected,
                actual: info.command,
            });
        }
        let count = record_count(revision, &info.payload)?;
        debug!("huskylens: {:?} reports {} records", algorithm, count);

        let mut detections = Detections::new();
        let mut dropped: u16 = 0;
        // Announced frames are read to the end even after a bad one
        let mut failure: Option<Error> = None;
        for _ in 0..count {
            if revision == HardwareRevision::V2 {
                self.delay.delay_ms(self.config.between_results_delay_ms);
            }
            let frame = match self.receive(revision) {
                Ok(frame) => frame,
                Err(e @ Error::ChecksumMismatch) => {
                    failure.get_or_insert(e);
                    continue;
                }
                Err(e) => return Err(failure.unwrap_or(e)),
            };
            if failure.is_some() {
                continue;
            }
            // V2 stamps each result with its algorithm channel
            let source = match revision {
                HardwareRevision::V1 => algorithm,
                HardwareRevision::V2 => Algorithm::from_byte(frame.address).unwrap_or(algorithm),
            };
            match decode_record(revision, frame.command, &frame.payload, source) {
                Ok(record) => {
                    if detections.push(record).is_err() {
                        dropped += 1;
                    }
                }
                Err(e) => failure = Some(e.into()),
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }
        if dropped > 0 {
            warn!("huskylens: {} records over capacity dropped", dropped);
        }
        Ok(detections)
    }

    fn send(&mut self, revision: HardwareRevision, frame: &Frame) -> Result<(), Error> {
        let bytes = frame.encode_to_vec(revision.layout())?;
        if revision.needs_flush() {
            self.link.discard_stale(revision)?;
        }
        if self.config.trace {
            trace!("huskylens: tx {:02x?}", bytes.as_slice());
        }
        self.link.write(&bytes)?;
        self.delay.delay_ms(self.config.write_settle_ms);
        Ok(())
    }

    fn receive(&mut self, revision: HardwareRevision) -> Result<Frame, Error> {
        let mut source = LinkSource {
            link: &mut self.link,
            delay: &mut self.delay,
            poll_interval_us: self.config.poll_interval_us,
        };
        let frame = decode_frame(&mut source, revision.layout(), self.config.frame_budget())?;
        if self.config.trace {
            trace!(
                "huskylens: rx addr={:#04x} cmd={:#04x} {:02x?}",
                frame.address,
                frame.command,
                frame.payload.as_slice()
            );
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, CountingDelay, ScriptedLink};
    use huskylens_core::DetectionRecord;
    use huskylens_hal::LinkError;
    use huskylens_protocol::commands::{v1, v2};
    use huskylens_protocol::revision::V1_ADDRESS;

    const V1: HardwareRevision = HardwareRevision::V1;
    const V2: HardwareRevision = HardwareRevision::V2;

    fn config() -> SessionConfig {
        SessionConfig::default()
            .without_delays()
            .with_max_idle_polls(3)
    }

    fn session(link: ScriptedLink) -> HuskyLens<ScriptedLink, CountingDelay> {
        HuskyLens::new(link, CountingDelay::default(), config())
    }

    fn v1_ok() -> std::vec::Vec<u8> {
        reply(V1, V1_ADDRESS, v1::RETURN_OK, &[])
    }

    fn v2_ok() -> std::vec::Vec<u8> {
        reply(V2, 0, v2::RETURN_OK, &[])
    }

    fn i16s(values: &[i16]) -> std::vec::Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Info plus record frames, delivered as one reply
    fn v1_results(records: &[(u8, [i16; 5])]) -> std::vec::Vec<u8> {
        let mut bytes = reply(V1, V1_ADDRESS, v1::RETURN_INFO, &i16s(&[records.len() as i16, 0, 0, 0, 0]));
        for (command, values) in records {
            bytes.extend(reply(V1, V1_ADDRESS, *command, &i16s(values)));
        }
        bytes
    }

    fn v2_results(algorithm: Algorithm, records: &[(u8, std::vec::Vec<u8>)]) -> std::vec::Vec<u8> {
        let channel = algorithm.to_byte();
        let mut bytes = reply(V2, channel, v2::RETURN_INFO, &i16s(&[0, records.len() as i16, 0, 0, 0]));
        for (command, payload) in records {
            bytes.extend(reply(V2, channel, *command, payload));
        }
        bytes
    }

    fn v2_block(id: i8, x: i16) -> std::vec::Vec<u8> {
        let mut p = std::vec![id as u8, 90];
        p.extend(i16s(&[x, 10, 20, 20]));
        p
    }

    #[test]
    fn test_knock_v1_register_link() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        assert_eq!(lens.knock(), Ok(V1));
        assert_eq!(lens.state(), SessionState::Ready(V1));
        assert_eq!(lens.revision(), Some(V1));
    }

    #[test]
    fn test_knock_unanswered_fails_then_reprobes() {
        let mut lens = session(ScriptedLink::with_revision(V1));
        assert_eq!(lens.knock(), Err(Error::NotConnected));
        assert_eq!(lens.state(), SessionState::Failed);
        // 10 V1 probe attempts
        assert_eq!(lens.link.writes.len(), 10);

        assert_eq!(lens.clear_text(), Err(Error::NotConnected));
        lens.link.writes.clear();
        lens.link.then(v1_ok()).then(v1_ok());
        assert_eq!(lens.clear_text(), Ok(()));
        assert_eq!(
            lens.link.sent_commands(V1),
            [v1::REQUEST_KNOCK, v1::REQUEST_CLEAR_TEXT]
        );
    }

    #[test]
    fn test_serial_probes_v2_first() {
        let mut link = ScriptedLink::new();
        // Five silent V2 probes, then V1 answers
        for _ in 0..5 {
            link.then_silence();
        }
        link.then(v1_ok());
        let mut lens = session(link);
        assert_eq!(lens.knock(), Ok(V1));
        assert_eq!(lens.link.writes.len(), 6);
        assert_eq!(lens.link.writes[0][2], v2::KNOCK);
        assert_eq!(lens.link.writes[5][4], v1::REQUEST_KNOCK);
    }

    #[test]
    fn test_link_failure_not_retried() {
        let mut link = ScriptedLink::with_revision(V2);
        link.fail = Some(LinkError::Serial(embedded_io::ErrorKind::BrokenPipe));
        let mut lens = session(link);
        assert!(matches!(lens.knock(), Err(Error::LinkUnavailable(_))));
        assert_eq!(lens.state(), SessionState::Failed);
    }

    #[test]
    fn test_set_algorithm_implicit_knock() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok()).then(v1_ok());
        let mut lens = session(link);
        lens.set_algorithm(Algorithm::ColorRecognition).unwrap();
        assert_eq!(lens.algorithms(), [Algorithm::ColorRecognition]);
        let set = &lens.link.writes[1];
        assert_eq!(set[4], v1::REQUEST_ALGORITHM);
        // V1 wire index is id - 1
        assert_eq!(&set[5..7], &[4, 0]);
    }

    #[test]
    fn test_set_algorithm_v2_only_rejected_on_v1() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        assert_eq!(
            lens.set_algorithm(Algorithm::HandRecognition),
            Err(Error::UnsupportedOnRevision)
        );
        assert_eq!(lens.link.writes.len(), 1);
    }

    #[test]
    fn test_set_same_algorithm_is_noop_on_v2() {
        let mut link = ScriptedLink::with_revision(V2);
        link.then(v2_ok());
        let mut lens = session(link);
        lens.set_algorithm(DEFAULT_ALGORITHM).unwrap();
        assert_eq!(lens.link.writes.len(), 1);
    }

    #[test]
    fn test_multi_algorithm_gating() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        for algorithms in [
            &[Algorithm::FaceRecognition, Algorithm::ObjectTracking][..],
            &[Algorithm::FaceRecognition][..],
            &[][..],
        ] {
            assert_eq!(
                lens.set_multi_algorithm(algorithms),
                Err(Error::UnsupportedOnRevision)
            );
        }

        let mut link = ScriptedLink::with_revision(V2);
        link.then(v2_ok()).then(v2_ok());
        let mut lens = session(link);
        assert_eq!(
            lens.set_multi_algorithm(&[Algorithm::Ocr; 6]),
            Err(Error::UnsupportedOnRevision)
        );
        let pair = [Algorithm::FaceRecognition, Algorithm::HandRecognition];
        lens.set_multi_algorithm(&pair).unwrap();
        assert_eq!(lens.algorithms(), pair);
    }

    #[test]
    fn test_unexpected_reply_retried_once() {
        let mut link = ScriptedLink::with_revision(V1);
        let wrong = reply(V1, V1_ADDRESS, v1::RETURN_INFO, &[0, 0]);
        link.then(v1_ok()).then(wrong.clone()).then(wrong);
        let mut lens = session(link);
        assert_eq!(
            lens.clear_text(),
            Err(Error::UnexpectedReply {
                expected: v1::RETURN_OK,
                actual: v1::RETURN_INFO
            })
        );
        // probe + first try + one retry
        assert_eq!(lens.link.writes.len(), 3);
    }

    #[test]
    fn test_checksum_error_recovers_on_retry() {
        let mut link = ScriptedLink::with_revision(V1);
        let mut corrupt = v1_ok();
        *corrupt.last_mut().unwrap() ^= 0x01;
        link.then(v1_ok()).then(corrupt).then(v1_ok());
        let mut lens = session(link);
        assert_eq!(lens.clear_text(), Ok(()));
    }

    #[test]
    fn test_firmware_version() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok())
            .then(reply(V1, V1_ADDRESS, v1::REQUEST_FIRMWARE_VERSION, b"0.5.1Norm"));
        let mut lens = session(link);
        assert_eq!(lens.firmware_version().unwrap().as_str(), "0.5.1Norm");

        let mut link = ScriptedLink::with_revision(V2);
        link.then(v2_ok());
        let mut lens = session(link);
        assert_eq!(lens.firmware_version(), Err(Error::UnsupportedOnRevision));
    }

    #[test]
    fn test_v1_query_learned_only() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok()).then(v1_results(&[
            (v1::RETURN_BLOCK, [10, 10, 5, 5, 0]),
            (v1::RETURN_BLOCK, [20, 20, 5, 5, 2]),
            (v1::RETURN_ARROW, [0, 0, 10, 10, 1]),
        ]));
        let mut lens = session(link);
        let found = lens.query(RecordFilter::new().learned()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(0).unwrap().id(), 2);
        assert!(matches!(found.get(1), Some(DetectionRecord::Arrow(_))));
        assert_eq!(lens.link.writes[1][4], v1::REQUEST_LEARNED);
    }

    #[test]
    fn test_v1_query_by_id_request() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok()).then(v1_results(&[(v1::RETURN_BLOCK, [1, 2, 3, 4, 7])]));
        let mut lens = session(link);
        let blocks = lens.blocks(RecordFilter::new().id(7)).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].algorithm, DEFAULT_ALGORITHM);
        let request = &lens.link.writes[1];
        assert_eq!(request[4], v1::REQUEST_BY_ID);
        assert_eq!(&request[5..7], &[7, 0]);
    }

    #[test]
    fn test_v2_query_faces() {
        let mut link = ScriptedLink::with_revision(V2);
        let mut face = v2_block(1, 100);
        face.extend([0, 0]);
        face.extend(i16s(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        link.then(v2_ok())
            .then(v2_ok())
            .then(v2_results(
                Algorithm::FaceRecognition,
                &[(v2::RETURN_BLOCK, face), (v2::RETURN_BLOCK, v2_block(0, 50))],
            ));
        let mut lens = session(link);
        lens.set_algorithm(Algorithm::FaceRecognition).unwrap();
        let found = lens.query(RecordFilter::default()).unwrap();
        assert_eq!(found.faces().count(), 2);
        let first = found.faces().next().unwrap();
        assert_eq!(
            first.keypoint(huskylens_core::record::FaceLandmark::Nose),
            Some(huskylens_core::Point::new(5, 6))
        );
        assert!(found.faces().nth(1).unwrap().keypoints.all_missing());
        // Query is addressed to the algorithm channel
        let request = lens.link.writes.last().unwrap();
        assert_eq!(request[2], v2::GET_RESULT);
        assert_eq!(request[3], Algorithm::FaceRecognition.to_byte());
        // Every V2 request drains first
        assert_eq!(lens.link.discards, 3);
    }

    #[test]
    fn test_v2_multi_query_concatenates() {
        let mut link = ScriptedLink::with_revision(V2);
        link.then(v2_ok())
            .then(v2_ok())
            .then(v2_results(
                Algorithm::ObjectTracking,
                &[(v2::RETURN_BLOCK, v2_block(1, 1))],
            ))
            .then(v2_results(
                Algorithm::ColorRecognition,
                &[(v2::RETURN_BLOCK, v2_block(2, 2))],
            ));
        let mut lens = session(link);
        lens.set_multi_algorithm(&[Algorithm::ObjectTracking, Algorithm::ColorRecognition])
            .unwrap();
        let found = lens.query(RecordFilter::default()).unwrap();
        let algorithms: std::vec::Vec<Algorithm> = found.iter().map(|r| r.algorithm()).collect();
        assert_eq!(algorithms, [Algorithm::ObjectTracking, Algorithm::ColorRecognition]);

        let only = RecordFilter::new().algorithm(Algorithm::ColorRecognition);
        assert!(only.apply(&found).iter().all(|r| r.id() == 2));
    }

    #[test]
    fn test_malformed_record_surfaces_after_retry() {
        let mut link = ScriptedLink::with_revision(V1);
        let bad = {
            let mut b = reply(V1, V1_ADDRESS, v1::RETURN_INFO, &i16s(&[1, 0, 0, 0, 0]));
            b.extend(reply(V1, V1_ADDRESS, v1::RETURN_BLOCK, &[1, 2, 3]));
            b
        };
        link.then(v1_ok()).then(bad.clone()).then(bad);
        let mut lens = session(link);
        assert!(matches!(
            lens.query(RecordFilter::default()),
            Err(Error::MalformedPayload(DecodeError::WrongLength { .. }))
        ));
    }

    #[test]
    fn test_bad_record_mid_stream_recovers_on_retry() {
        let mut link = ScriptedLink::with_revision(V1);
        let mut first = reply(V1, V1_ADDRESS, v1::RETURN_INFO, &i16s(&[2, 0, 0, 0, 0]));
        first.extend(reply(V1, V1_ADDRESS, v1::RETURN_BLOCK, &[1, 2, 3]));
        first.extend(reply(V1, V1_ADDRESS, v1::RETURN_BLOCK, &i16s(&[9, 9, 9, 9, 0])));
        link.then(v1_ok()).then(first).then(v1_results(&[
            (v1::RETURN_BLOCK, [10, 20, 5, 5, 0]),
            (v1::RETURN_BLOCK, [30, 40, 5, 5, 1]),
        ]));
        let mut lens = session(link);

        let blocks = lens.blocks(RecordFilter::default()).unwrap();
        let xs: std::vec::Vec<i16> = blocks.iter().map(|b| b.x).collect();
        assert_eq!(xs, [10, 30]);
        assert_eq!(
            lens.link.sent_commands(V1),
            [v1::REQUEST_KNOCK, v1::REQUEST, v1::REQUEST]
        );
        assert!(lens.link.rx.is_empty());
    }

    #[test]
    fn test_corrupt_record_mid_stream_recovers_on_retry() {
        let mut link = ScriptedLink::with_revision(V1);
        let mut corrupt = reply(V1, V1_ADDRESS, v1::RETURN_BLOCK, &i16s(&[1, 1, 1, 1, 0]));
        *corrupt.last_mut().unwrap() ^= 0x01;
        let mut first = reply(V1, V1_ADDRESS, v1::RETURN_INFO, &i16s(&[2, 0, 0, 0, 0]));
        first.extend(corrupt);
        first.extend(reply(V1, V1_ADDRESS, v1::RETURN_BLOCK, &i16s(&[2, 2, 2, 2, 0])));
        link.then(v1_ok())
            .then(first)
            .then(v1_results(&[(v1::RETURN_BLOCK, [7, 7, 7, 7, 0])]));
        let mut lens = session(link);

        let blocks = lens.blocks(RecordFilter::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].x, 7);
    }

    #[test]
    fn test_silent_exchange_written_twice() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        lens.knock().unwrap();
        lens.link.writes.clear();

        assert_eq!(lens.clear_text(), Err(Error::Timeout));
        assert_eq!(
            lens.link.sent_commands(V1),
            [v1::REQUEST_CLEAR_TEXT, v1::REQUEST_CLEAR_TEXT]
        );
        // A timeout is not a failed probe
        assert_eq!(lens.state(), SessionState::Ready(V1));
    }

    #[test]
    fn test_draw_rect_only_on_v2() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        assert_eq!(
            lens.draw_rect(0, 0, 10, 10, Color::Red),
            Err(Error::UnsupportedOnRevision)
        );
        assert_eq!(lens.clear_rect(), Err(Error::UnsupportedOnRevision));

        let mut link = ScriptedLink::with_revision(V2);
        link.then(v2_ok()).then(v2_ok()).then(v2_ok());
        let mut lens = session(link);
        lens.draw_rect(0, 0, 10, 10, Color::Red).unwrap();
        lens.draw_text("hi", 10, 20, Color::Green).unwrap();
        assert_eq!(
            lens.link.sent_commands(V2),
            [v2::KNOCK, v2::DRAW_RECT, v2::DRAW_TEXT]
        );
    }

    #[test]
    fn test_draw_text_too_long() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = session(link);
        let long = "a".repeat(300);
        assert_eq!(
            lens.draw_text(&long, 0, 0, Color::White),
            Err(Error::InvalidArgument)
        );
    }

    proptest::proptest! {
        #[test]
        fn v1_query_preserves_sensor_order(
            ids in proptest::collection::vec(-3i16..4, 0..MAX_RECORDS)
        ) {
            let records: std::vec::Vec<(u8, [i16; 5])> = ids
                .iter()
                .enumerate()
                .map(|(i, &id)| (v1::RETURN_BLOCK, [i as i16, 0, 1, 1, id]))
                .collect();
            let mut link = ScriptedLink::with_revision(V1);
            link.then(v1_ok()).then(v1_results(&records));
            let mut lens = session(link);

            let found = lens.query(RecordFilter::default()).unwrap();
            let xs: std::vec::Vec<i16> = found.blocks().map(|b| b.x).collect();
            let expected: std::vec::Vec<i16> = (0..ids.len() as i16).collect();
            proptest::prop_assert_eq!(xs, expected);
        }
    }

    #[test]
    fn test_delays_follow_config() {
        let mut link = ScriptedLink::with_revision(V1);
        link.then(v1_ok());
        let mut lens = HuskyLens::new(link, CountingDelay::default(), SessionConfig::default());
        lens.knock().unwrap();
        let (_, delay) = lens.release();
        // One write settle, no empty polls
        assert_eq!(delay.total_ns, 5_000_000);
    }
}
