use crate::archive::Archive;
use crate::session::Session;

/// Run `sb list`: archives from least to most recent.
pub fn run(session: &Session) -> Vec<&Archive> {
    session.manager.sorted_by_time()
}
