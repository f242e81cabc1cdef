//! Scripted transport and delay for unit tests

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use huskylens_hal::{LinkError, LinkKind, Transport};
use huskylens_protocol::{Frame, HardwareRevision};

/// Encode a reply frame the way the sensor would send it
pub fn reply(revision: HardwareRevision, address: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    Frame::new(address, command, payload)
        .unwrap()
        .encode_to_vec(revision.layout())
        .unwrap()
        .to_vec()
}

/// Transport that answers each write with the next scripted reply
pub struct ScriptedLink {
    pub revision: Option<HardwareRevision>,
    pub replies: VecDeque<Vec<u8>>,
    pub rx: VecDeque<u8>,
    pub writes: Vec<Vec<u8>>,
    pub discards: usize,
    pub fail: Option<LinkError>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            revision: None,
            replies: VecDeque::new(),
            rx: VecDeque::new(),
            writes: Vec::new(),
            discards: 0,
            fail: None,
        }
    }

    pub fn with_revision(revision: HardwareRevision) -> Self {
        Self {
            revision: Some(revision),
            ..Self::new()
        }
    }

    /// Queue bytes delivered after the next write
    pub fn then(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.replies.push_back(bytes);
        self
    }

    /// Queue a write that gets no answer
    pub fn then_silence(&mut self) -> &mut Self {
        self.then(Vec::new())
    }

    /// Make bytes readable right now
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Command byte of every frame written, in order
    pub fn sent_commands(&self, revision: HardwareRevision) -> Vec<u8> {
        let at = match revision {
            HardwareRevision::V1 => 4,
            HardwareRevision::V2 => 2,
        };
        self.writes.iter().map(|w| w[at]).collect()
    }
}

impl Transport for ScriptedLink {
    fn kind(&self) -> LinkKind {
        LinkKind::Serial
    }

    fn revision(&self) -> Option<HardwareRevision> {
        self.revision
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.writes.push(bytes.to_vec());
        if let Some(next) = self.replies.pop_front() {
            self.rx.extend(next);
        }
        Ok(())
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn discard_stale(&mut self, revision: HardwareRevision) -> Result<(), LinkError> {
        if revision.needs_flush() {
            self.discards += 1;
            self.rx.clear();
        }
        Ok(())
    }
}

/// Delay that only adds up what it was asked to wait
#[derive(Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
