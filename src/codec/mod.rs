mod qtype;
mod query;

pub use qtype::{QType, UnknownQType};
pub use query::{encode, extract_id, CodecError};
