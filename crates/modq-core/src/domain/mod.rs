//! Domain model (ids, wire envelopes, tasks, predictions, errors, states).

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod prediction;
pub mod state;
pub mod task;

pub use self::envelope::{DeadLetterMessage, ModerationRequestMessage};
pub use self::errors::{CodecError, ErrorKind, ModerationError, PredictionError, StoreError, TransportError};
pub use self::ids::{ItemId, SellerId, TaskId};
pub use self::prediction::{Advertisement, Features, Prediction};
pub use self::state::{ProcessOutcome, ProcessingState};
pub use self::task::{ModerationResult, ModerationTask, TaskStatus, TaskUpdate};
