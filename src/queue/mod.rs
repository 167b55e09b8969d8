mod buffer;
pub mod records;
pub mod requests;

pub use records::{Collections, RecordStore};
pub use requests::{ActivePass, RequestQueue};
