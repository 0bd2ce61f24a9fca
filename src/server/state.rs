use crate::location::LocationResolver;

/// Shared by every handler. The resolver is immutable, so no lock.
pub struct AppState {
    pub resolver: LocationResolver,
}
