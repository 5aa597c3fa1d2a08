pub mod like_button;

pub use like_button::{LikeButtonState, Settlement};
