pub mod session_guard;
pub mod timing;

pub use session_guard::{SessionGuard, SessionSubject};
pub use timing::TimingMiddleware;
