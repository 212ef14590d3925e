//! Replay of persisted raw output logs.
//!
//! A session layer may keep the raw bytes it read from the PTY; feeding
//! them back through a parser reconstructs the screen state at startup.
//! While replaying, the scrollback store's replay flag is held set so
//! the lines already on disk are not appended a second time.

use std::io::{self, ErrorKind, Read};

use anko_core::ScrollbackStore;

use crate::parser::Feed;

/// Drive a persisted byte log through `sink` with `store` in replay
/// mode. The flag is cleared before returning, also on error. Returns
/// the number of bytes replayed.
pub fn replay<R: Read, F: Feed>(
    mut reader: R,
    sink: &mut F,
    store: &ScrollbackStore,
) -> io::Result<u64> {
    store.set_replay(true);
    let mut buf = [0u8; 4096];
    let mut total = 0u64;
    let result = loop {
        match reader.read(&mut buf) {
            Ok(0) => break Ok(total),
            Ok(n) => {
                sink.feed(&buf[..n]);
                total += n as u64;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => break Err(err),
        }
    };
    store.set_replay(false);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use anko_core::{Line, Screen};
    use std::sync::Arc;

    #[test]
    fn test_replay_reconstructs_screen_without_duplicating_history() {
        let store = Arc::new(ScrollbackStore::new_in_memory());
        store.push(&[Line::new(10)]);

        let mut parser = Parser::new(Screen::new(10, 3), Arc::clone(&store));
        let log: &[u8] = b"one\r\ntwo\r\nthree\r\nfour";
        let replayed = replay(log, &mut parser, &store).unwrap();

        assert_eq!(replayed, log.len() as u64);
        // Screen state is rebuilt...
        assert_eq!(parser.screen().line(2).unwrap().text_content(), "four");
        // ...but nothing was re-archived, and the flag is cleared
        assert_eq!(store.count(), 1);
        assert!(!store.is_replaying());

        parser.feed(b"\r\nfive\r\nsix");
        assert!(store.count() > 1);
    }
}
