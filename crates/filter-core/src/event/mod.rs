// Input Filter Event Handling
// Raw records, batch filtering and the read/filter/write pump

pub mod batch;
pub mod intercept;
pub mod io;
pub mod r#loop;
pub mod raw;

pub use batch::{batch_config, EventBatch};
pub use intercept::{BatchOutcome, Interceptor};
pub use io::{read_records, write_records, ReadError};
pub use r#loop::{EventLoop, EventLoopError, EventLoopResult, EventSink, Pumped};
pub use raw::{RawEvent, RAW_EVENT_SIZE};
