// Session module - Rancher login and session state
pub mod establisher;
pub mod session;

pub use establisher::{LoginOptions, SessionEstablisher, LOGIN_PATH, ME_PATH};
pub use session::{Session, CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE};
