use services::PlacementServices;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: PlacementServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: PlacementServices) -> Self {
        Self { services }
    }
}
