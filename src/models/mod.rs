pub mod inquiry;
pub mod inquiry_message;
pub mod party;

pub use inquiry::*;
pub use inquiry_message::*;
pub use party::*;
