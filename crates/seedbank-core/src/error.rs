pub use seedbank_types::error::{Result, SeedbankError};
