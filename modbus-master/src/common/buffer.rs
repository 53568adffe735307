use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::phys::PhysDisplay;
use crate::decode::PhysDecodeLevel;
use crate::error::DataError;

/// Fixed capacity buffer that accumulates stream bytes until a frame is complete
pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// unconsumed bytes
    pub(crate) fn peek(&self) -> &[u8] {
        &self.buffer[self.begin..self.end]
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], DataError> {
        if self.len() < count {
            return Err(DataError::InsufficientBytes);
        }

        match self.buffer.get(self.begin..(self.begin + count)) {
            Some(ret) => {
                self.begin += count;
                Ok(ret)
            }
            None => Err(DataError::InsufficientBytes),
        }
    }

    /// drop everything buffered
    pub(crate) fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
    }

    pub(crate) async fn read_some<T: AsyncRead + Unpin>(
        &mut self,
        io: &mut T,
        level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        // reset the indices when empty so that the biggest read is possible
        if self.is_empty() {
            self.clear();
        }

        // shift unconsumed bytes to the front once the tail is reached
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        // full buffer that still doesn't frame, make room by dropping it
        if self.end == self.buffer.len() {
            tracing::warn!("discarding {} unframed bytes", self.len());
            self.clear();
        }

        let count = io.read(&mut self.buffer[self.end..]).await?;

        if count == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }

        if level.enabled() {
            if let Some(data) = self.buffer.get(self.end..self.end + count) {
                tracing::info!("PHYS RX - {}", PhysDisplay::new(level, data));
            }
        }

        self.end += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn errors_when_reading_too_many_bytes() {
        let mut buffer = ReadBuffer::new(10);
        assert_eq!(buffer.read(1), Err(DataError::InsufficientBytes));
    }

    #[tokio::test]
    async fn shifts_contents_when_buffer_at_capacity() {
        let mut buffer = ReadBuffer::new(3);
        let mut io = Builder::new()
            .read(&[0x01, 0x02, 0x03])
            .read(&[0x04, 0x05])
            .build();

        assert_eq!(
            buffer
                .read_some(&mut io, PhysDecodeLevel::Nothing)
                .await
                .unwrap(),
            3
        );
        assert_eq!(buffer.read(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(
            buffer
                .read_some(&mut io, PhysDecodeLevel::Nothing)
                .await
                .unwrap(),
            2
        );
        assert_eq!(buffer.peek(), &[0x03, 0x04, 0x05]);
    }

    #[tokio::test]
    async fn discards_full_buffer_to_make_progress() {
        let mut buffer = ReadBuffer::new(2);
        let mut io = Builder::new().read(&[0x01, 0x02]).read(&[0x03]).build();

        buffer
            .read_some(&mut io, PhysDecodeLevel::Nothing)
            .await
            .unwrap();
        buffer
            .read_some(&mut io, PhysDecodeLevel::Nothing)
            .await
            .unwrap();
        assert_eq!(buffer.peek(), &[0x03]);
    }

    #[tokio::test]
    async fn end_of_stream_is_an_error() {
        let mut buffer = ReadBuffer::new(4);
        let mut io = Builder::new().build();
        let err = buffer
            .read_some(&mut io, PhysDecodeLevel::Nothing)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
