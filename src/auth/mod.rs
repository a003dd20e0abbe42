pub mod sessions;
pub mod token;

pub use sessions::{create_session, get_current_session, revoke_session, Session};
