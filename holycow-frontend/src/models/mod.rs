pub mod flash;
pub mod response_mode;

pub use flash::{FlashLevel, FlashMessage, Flashes};
pub use response_mode::ResponseMode;
