//! Polling bridge from a transport to the frame decoder

use embedded_hal::delay::DelayNs;
use huskylens_hal::{LinkError, Transport};
use huskylens_protocol::ByteSource;

/// Feeds [`huskylens_protocol::decode_frame`] from a transport
///
/// An empty poll sleeps for the poll interval, so the decoder's idle budget
/// bounds the wall-clock wait.
pub(crate) struct LinkSource<'a, T, D> {
    pub link: &'a mut T,
    pub delay: &'a mut D,
    pub poll_interval_us: u32,
}

impl<T: Transport, D: DelayNs> ByteSource for LinkSource<'_, T, D> {
    type Error = LinkError;

    fn poll_read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let available = self.link.read_available()?;
        let n = if available == 0 {
            0
        } else {
            let want = buf.len().min(available);
            self.link.read(&mut buf[..want])?
        };
        if n == 0 {
            self.delay.delay_us(self.poll_interval_us);
        }
        Ok(n)
    }
}
