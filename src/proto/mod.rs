// CP-mode wire protocol: sentence framing and stream chunking

pub mod chunker;
pub mod sentence;

pub use chunker::{ByteSource, LineReader, StreamError, Transport};
pub use sentence::{Sentence, SentenceError, SentenceKind};
