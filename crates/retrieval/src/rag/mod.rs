//! Retrieval-augmented chat: fan-out search, grounded generation and the
//! streamed event protocol.

pub mod aggregate;
pub mod chat;
pub mod generate;
pub mod stream;
pub mod types;

pub use aggregate::{Aggregation, Aggregator};
pub use chat::ChatService;
pub use generate::{
    Answer, DeltaStream, GenerationBridge, LlmGenerator, StaticGenerator, UnavailableGenerator,
};
pub use stream::{multiplex, EventSink, Outcome, SinkClosed};
pub use types::{ChatResponse, StreamEvent, NO_RESULTS_MESSAGE};
