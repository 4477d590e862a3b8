//! mini-login Common Types
//!
//! Wire types shared by the backend and by anything that talks to it.

pub mod envelope;
pub mod login;

pub use envelope::{ApiResponse, SUCCESS_CODE};
pub use login::{LoginData, LoginRequest, UserInfo, UserProfile};
