pub mod phrase;
pub mod punkt;
pub mod sentence;
pub mod tokenize;

pub use phrase::{matches, Phrase, Scope, SearchMethod};
pub use punkt::{PunktParameters, PunktSplitter, PunktTrainer};
pub use sentence::{split, BaseSplitter, Sentence, SentenceSplitter, SplitterKind};
pub use tokenize::{normalize, token_set, tokenize};
