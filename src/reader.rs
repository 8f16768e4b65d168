use std::io::{self, ErrorKind, Read};

/// Default size of a raw block.
pub const BLOCK_SIZE: usize = 256 * 1024;

/// Reads a byte source front to back in fixed-size blocks.
///
/// Every yielded block holds exactly the bytes returned by one successful
/// read, so the last block is usually shorter than `block_size`. The iterator
/// is fused: after end of input or the first error it only yields `None`.
pub struct ChunkReader<R> {
    source: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R, block_size: usize) -> Self {
        Self {
            source,
            buf: vec![0; block_size.max(1)],
            done: false,
        }
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.source.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => return Some(Ok(self.buf[..n].to_vec())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky {
        calls: usize,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => Err(io::Error::new(ErrorKind::Interrupted, "signal")),
                2 => {
                    buf[..3].copy_from_slice(b"a;1");
                    Ok(3)
                }
                _ => Err(io::Error::new(ErrorKind::Other, "disk on fire")),
            }
        }
    }

    #[test]
    fn blocks_hold_only_bytes_read() {
        let data = b"Hamburg;12.0\nBerlin;-3.5\n".to_vec();
        let blocks = ChunkReader::new(&data[..], 10)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(blocks.iter().map(Vec::len).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(blocks.concat(), data);
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert_eq!(ChunkReader::new(&b""[..], 16).count(), 0);
    }

    #[test]
    fn retries_interrupted_and_stops_after_error() {
        let mut reader = ChunkReader::new(Flaky { calls: 0 }, 8);
        assert_eq!(reader.next().unwrap().unwrap(), b"a;1");
        assert_eq!(reader.next().unwrap().unwrap_err().kind(), ErrorKind::Other);
        assert!(reader.next().is_none());
    }
}
