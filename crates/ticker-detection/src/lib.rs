//! Recognizes which tracked tickers a cleaned news article refers to and
//! pulls the surrounding text for each mention.

pub mod context;
pub mod matcher;
pub mod reference;
pub mod text;

pub use context::{most_relevant_context, ContextExtractor};
pub use matcher::{summarize_mentions, TickerHits, TickerMatcher};
pub use reference::{NameFragment, TickerTable};
